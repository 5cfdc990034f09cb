//! Integration tests for the translation protocol codec.
//!
//! These exercise the public API end to end: registry lookups, wire framing,
//! the request builder, and the stream reader together.

use std::io::Cursor;

use translation_core::{
    decode_packet, encode_packet, encode_request, CodeTable, Packet, PacketKind, PacketReader,
    ProtocolError, RequestBuilder,
};

/// Encodes a packet and decodes it back, asserting full consumption.
fn roundtrip(packet: Packet, table: &CodeTable) -> Packet {
    let bytes = encode_packet(&packet, table).expect("encode must succeed");
    let (decoded, consumed) = decode_packet(&bytes, table).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

#[test]
fn test_roundtrip_one_packet_of_every_shape() {
    let table = CodeTable::current();
    for packet in [
        Packet::empty(PacketKind::End),                      // Empty
        Packet::text(PacketKind::Host, "www.example.com"),   // Utf8Text
        Packet::u16(PacketKind::Status, 301),                // FixedBinary(2)
        Packet::u32(PacketKind::MaxAge, 3600),               // FixedBinary(4)
        Packet::bytes(PacketKind::Session, &[0xDE, 0xAD]),   // Opaque
    ] {
        assert_eq!(roundtrip(packet.clone(), &table), packet);
    }
}

#[test]
fn test_roundtrip_every_kind_in_the_current_table() {
    // Walk the whole code space; every recognized kind must survive a
    // round-trip with a payload conforming to its shape rule.
    let table = CodeTable::current();
    let mut seen = 0;
    for code in 1..=1024u16 {
        let kind = table.decode_kind(code);
        if matches!(kind, PacketKind::Unknown(_)) {
            continue;
        }
        if table.encode_code(kind).unwrap() != code {
            continue; // alias slot; the canonical code covers this kind
        }
        let payload: Vec<u8> = match translation_core::shape_of(kind) {
            translation_core::PayloadShape::Empty => Vec::new(),
            translation_core::PayloadShape::Utf8Text => b"value".to_vec(),
            translation_core::PayloadShape::FixedBinary(width) => vec![1; width as usize],
            translation_core::PayloadShape::Opaque => vec![0xC3, 0x00, 0x7F],
        };
        let packet = Packet { kind, payload };
        assert_eq!(roundtrip(packet.clone(), &table), packet, "kind {kind:?}");
        seen += 1;
    }
    assert_eq!(seen, 165, "the current generation defines 165 fields");
}

#[test]
fn test_roundtrip_empty_text_payload() {
    let table = CodeTable::current();
    let packet = Packet::text(PacketKind::Uri, "");
    assert_eq!(roundtrip(packet.clone(), &table), packet);
}

#[test]
fn test_roundtrip_max_size_payload() {
    let table = CodeTable::current();
    let packet = Packet::bytes(PacketKind::Session, &vec![0xA5; u16::MAX as usize]);
    assert_eq!(roundtrip(packet.clone(), &table), packet);
}

// ── Generation handling ───────────────────────────────────────────────────────

#[test]
fn test_code_8_decodes_per_generation() {
    // The same frame means different fields to different generations: table
    // selection is the sole determinant.
    let frame = [8u8, 0, 1, 0, b'u'];

    let (current, _) = decode_packet(&frame, &CodeTable::current()).unwrap();
    assert_eq!(current.kind, PacketKind::Http);

    let (legacy, _) = decode_packet(&frame, &CodeTable::legacy()).unwrap();
    assert_eq!(legacy.kind, PacketKind::Proxy);
}

#[test]
fn test_retired_code_decodes_as_alias() {
    let table = CodeTable::current();
    let old = [25u8, 0, 0, 0];
    let new = [26u8, 0, 0, 0];
    assert_eq!(decode_packet(&old, &table).unwrap().0.kind, PacketKind::JailCgi);
    assert_eq!(decode_packet(&new, &table).unwrap().0.kind, PacketKind::JailCgi);

    // Encoding always picks the canonical code.
    let bytes = encode_packet(&Packet::empty(PacketKind::JailCgi), &table).unwrap();
    assert_eq!(bytes[0..2], [26, 0]);
}

#[test]
fn test_encoding_legacy_field_under_current_table_fails() {
    let packet = Packet::text(PacketKind::Proxy, "http://old.internal/");
    assert!(matches!(
        encode_packet(&packet, &CodeTable::current()),
        Err(ProtocolError::UnsupportedInVersion { .. })
    ));
    assert!(encode_packet(&packet, &CodeTable::legacy()).is_ok());
}

#[test]
fn test_unknown_code_is_not_an_error() {
    let table = CodeTable::legacy();
    // Code 105 (ExpandAppend) postdates the legacy generation.
    let frame = [105u8, 0, 2, 0, b'-', b'v'];
    let (packet, _) = decode_packet(&frame, &table).unwrap();
    assert_eq!(packet.kind, PacketKind::Unknown(105));
    assert_eq!(packet.payload, b"-v");
}

// ── Truncation ────────────────────────────────────────────────────────────────

#[test]
fn test_every_truncation_of_a_valid_frame_fails_cleanly() {
    let table = CodeTable::current();
    let bytes = encode_packet(&Packet::text(PacketKind::Host, "example.com"), &table).unwrap();
    for cut in 0..bytes.len() {
        let err = decode_packet(&bytes[..cut], &table).unwrap_err();
        match err {
            ProtocolError::TruncatedHeader { .. } => assert!(cut < 4),
            ProtocolError::TruncatedPayload { .. } => assert!(cut >= 4),
            other => panic!("unexpected error at cut {cut}: {other:?}"),
        }
    }
}

#[test]
fn test_hostile_length_field_fails_without_eager_allocation() {
    // Header declares 65535 payload bytes; the stream has 10.
    let table = CodeTable::current();
    let mut bytes = vec![12u8, 0, 0xFF, 0xFF];
    bytes.extend_from_slice(&[0u8; 10]);

    let mut reader = PacketReader::new(Cursor::new(bytes), &table);
    assert!(matches!(
        reader.next_packet(),
        Err(ProtocolError::TruncatedPayload {
            declared: 65535,
            available: 10
        })
    ));
}

// ── Request building and encoding ─────────────────────────────────────────────

#[test]
fn test_request_survives_the_wire() {
    let table = CodeTable::current();

    let mut builder = RequestBuilder::new();
    builder.host("www.example.com").unwrap();
    builder.uri("/widget/index;session=abc").unwrap();
    builder.remote_host("192.0.2.17").unwrap();
    builder.user_agent("Mozilla/5.0").unwrap();
    builder.session(&[0x01, 0x02, 0x03]).unwrap();
    let request = builder.finish().unwrap();

    let bytes = encode_request(&request, &table).unwrap();
    let mut reader = PacketReader::new(Cursor::new(bytes), &table);
    let mut decoded = Vec::new();
    while let Some(packet) = reader.next_packet().unwrap() {
        decoded.push(packet);
    }

    assert_eq!(decoded.as_slice(), request.packets());
    assert_eq!(decoded.first().map(|p| p.kind), Some(PacketKind::Begin));
    assert_eq!(decoded.last().map(|p| p.kind), Some(PacketKind::End));
}

#[test]
fn test_request_with_want_list_under_legacy_table() {
    // A `want` list is resolved through the peer's table, so asking a legacy
    // peer for a field it never defined must fail up front.
    let legacy = CodeTable::legacy();
    let mut builder = RequestBuilder::new();
    let result = builder.want(&[PacketKind::ExpandAppend], &legacy);
    assert!(matches!(
        result,
        Err(ProtocolError::UnsupportedInVersion { .. })
    ));
}
