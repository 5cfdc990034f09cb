//! Criterion benchmarks for the translation protocol codec.
//!
//! Measures per-packet framing cost and the full decode-and-assemble path
//! for a representative decision, since translation sits on the latency
//! path of every cache miss at the edge.
//!
//! Run with:
//! ```bash
//! cargo bench --package translation-core --bench codec_bench
//! ```

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use translation_core::{
    decode_packet, encode_packet, encode_request, read_response, CodeTable, Packet, PacketKind,
    RequestBuilder,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn packet_fixtures() -> Vec<(&'static str, Packet)> {
    vec![
        ("End", Packet::empty(PacketKind::End)),
        ("Host", Packet::text(PacketKind::Host, "www.example.com")),
        ("Uri", Packet::text(PacketKind::Uri, "/shop/catalog/item-42?tab=reviews")),
        ("Status", Packet::u16(PacketKind::Status, 200)),
        ("MaxAge", Packet::u32(PacketKind::MaxAge, 3600)),
        ("Session", Packet::bytes(PacketKind::Session, &[0xA5; 32])),
    ]
}

fn typical_request() -> Vec<u8> {
    let table = CodeTable::current();
    let mut builder = RequestBuilder::new();
    builder.host("www.example.com").unwrap();
    builder.uri("/shop/catalog/item-42").unwrap();
    builder.query_string("tab=reviews").unwrap();
    builder.remote_host("192.0.2.17").unwrap();
    builder.user_agent("Mozilla/5.0 (X11; Linux x86_64)").unwrap();
    builder.session(&[0xA5; 16]).unwrap();
    encode_request(&builder.finish().unwrap(), &table).unwrap()
}

fn typical_response_bytes() -> Vec<u8> {
    let table = CodeTable::current();
    let packets = [
        Packet::empty(PacketKind::Begin),
        Packet::text(PacketKind::Site, "shop"),
        Packet::text(PacketKind::Fastcgi, "/srv/shop/app.fcgi"),
        Packet::text(PacketKind::ScriptName, "/shop"),
        Packet::u32(PacketKind::MaxAge, 120),
        Packet::text(PacketKind::Setenv, "SHOP_ENV=production"),
        Packet::empty(PacketKind::Process),
        Packet::text(PacketKind::View, "raw"),
        Packet::text(PacketKind::Http, "http://raw.shop.internal/"),
        Packet::text(PacketKind::Header, "X-Site:shop"),
        Packet::empty(PacketKind::End),
    ];
    let mut bytes = Vec::new();
    for packet in &packets {
        bytes.extend_from_slice(&encode_packet(packet, &table).unwrap());
    }
    bytes
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let table = CodeTable::current();
    let mut group = c.benchmark_group("encode_packet");
    for (name, packet) in packet_fixtures() {
        group.bench_with_input(BenchmarkId::new("kind", name), &packet, |b, packet| {
            b.iter(|| encode_packet(black_box(packet), black_box(&table)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let table = CodeTable::current();
    let mut group = c.benchmark_group("decode_packet");
    for (name, packet) in packet_fixtures() {
        let bytes = encode_packet(&packet, &table).unwrap();
        group.bench_with_input(BenchmarkId::new("kind", name), &bytes, |b, bytes| {
            b.iter(|| decode_packet(black_box(bytes), black_box(&table)).unwrap())
        });
    }
    group.finish();
}

fn bench_full_paths(c: &mut Criterion) {
    let table = CodeTable::current();
    let mut group = c.benchmark_group("full_message");

    group.bench_function("encode_request", |b| b.iter(typical_request));

    let response_bytes = typical_response_bytes();
    group.bench_function("read_response", |b| {
        b.iter(|| {
            read_response(Cursor::new(black_box(&response_bytes)), &table, None).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_full_paths);
criterion_main!(benches);
