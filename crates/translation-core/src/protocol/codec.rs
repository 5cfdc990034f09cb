//! Binary codec for the translation protocol.
//!
//! Wire format, per packet:
//!
//! ```text
//! [code:2][length:2][payload:length]
//! ```
//!
//! Both header fields are **little-endian**.  There is no padding, no
//! checksum, and no outer envelope: a message is a plain sequence of frames,
//! read until an `End` packet or end of stream.  With no resynchronization
//! marker, any framing error makes the rest of the stream unusable; callers
//! drop the connection rather than retry in place.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::protocol::assembler::ResponseAssembler;
use crate::protocol::error::ProtocolError;
use crate::protocol::packet::Packet;
use crate::protocol::registry::{CodeTable, PacketKind};
use crate::protocol::request::Request;
use crate::protocol::response::Response;
use crate::protocol::validate::validate_payload;

/// Size of the fixed per-packet header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a single packet can carry (16-bit length field).
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Hard ceiling on the cumulative size of one message, bounding memory use
/// against a peer that never sends `End`.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

// ── Packet encode / decode ────────────────────────────────────────────────────

/// Encodes one packet under the given code table.
///
/// # Errors
///
/// - [`ProtocolError::PayloadTooLarge`] if the payload exceeds [`MAX_PAYLOAD`].
/// - [`ProtocolError::PayloadShapeMismatch`] if the payload does not match
///   the kind's shape rule.
/// - [`ProtocolError::UnsupportedInVersion`] if the table has no code for
///   the kind.
///
/// # Examples
///
/// ```rust
/// use translation_core::protocol::codec::{decode_packet, encode_packet};
/// use translation_core::protocol::packet::Packet;
/// use translation_core::protocol::registry::{CodeTable, PacketKind};
///
/// let table = CodeTable::current();
/// let packet = Packet::text(PacketKind::Host, "example.com");
/// let bytes = encode_packet(&packet, &table).unwrap();
/// let (decoded, consumed) = decode_packet(&bytes, &table).unwrap();
/// assert_eq!(decoded, packet);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_packet(packet: &Packet, table: &CodeTable) -> Result<Vec<u8>, ProtocolError> {
    if packet.payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            size: packet.payload.len(),
        });
    }
    validate_payload(packet.kind, &packet.payload)?;
    let code = table.encode_code(packet.kind)?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + packet.payload.len());
    buf.extend_from_slice(&code.to_le_bytes());
    buf.extend_from_slice(&(packet.payload.len() as u16).to_le_bytes());
    buf.extend_from_slice(&packet.payload);
    Ok(buf)
}

/// Decodes one packet from the beginning of `bytes`.
///
/// Returns the packet and the number of bytes consumed (header + payload) so
/// the caller can advance its cursor.  Never reads past the declared length.
///
/// # Errors
///
/// - [`ProtocolError::TruncatedHeader`] if fewer than 4 bytes are available.
/// - [`ProtocolError::TruncatedPayload`] if the declared length exceeds the
///   remaining bytes.
/// - [`ProtocolError::PayloadShapeMismatch`] if the payload fails the shape
///   rule for its (recognized) kind.
pub fn decode_packet(bytes: &[u8], table: &CodeTable) -> Result<(Packet, usize), ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::TruncatedHeader {
            available: bytes.len(),
        });
    }
    let code = u16::from_le_bytes([bytes[0], bytes[1]]);
    let length = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;

    let available = bytes.len() - HEADER_SIZE;
    if available < length {
        return Err(ProtocolError::TruncatedPayload {
            declared: length,
            available,
        });
    }

    let kind = table.decode_kind(code);
    if let PacketKind::Unknown(code) = kind {
        debug!(code, table = table.name(), "unrecognized packet code");
    }
    let payload = bytes[HEADER_SIZE..HEADER_SIZE + length].to_vec();
    validate_payload(kind, &payload)?;
    Ok((Packet { kind, payload }, HEADER_SIZE + length))
}

/// Encodes a finished request as a contiguous byte buffer.
///
/// # Errors
///
/// Propagates any [`encode_packet`] failure.
pub fn encode_request(request: &Request, table: &CodeTable) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    for packet in request.packets() {
        buf.extend_from_slice(&encode_packet(packet, table)?);
    }
    Ok(buf)
}

// ── Cancellation ──────────────────────────────────────────────────────────────

/// Cloneable cancellation signal for an in-flight decode.
///
/// The transport layer (which owns timeouts) cancels the token; the reader
/// checks it between frames and fails with [`ProtocolError::Cancelled`].
/// A cancelled stream cannot be reused; there is no way to know where the
/// peer's next frame starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ── Stream reader ─────────────────────────────────────────────────────────────

/// Frame-by-frame packet reader over a blocking byte stream.
///
/// Reads exactly one header and one payload per call, enforcing the
/// [`MAX_MESSAGE_SIZE`] ceiling across calls.  The payload buffer grows as
/// bytes actually arrive rather than being allocated at the declared size,
/// so a hostile length field cannot force a large allocation.
pub struct PacketReader<'a, R> {
    reader: R,
    table: &'a CodeTable,
    cancel: Option<CancelToken>,
    bytes_read: usize,
}

impl<'a, R: Read> PacketReader<'a, R> {
    pub fn new(reader: R, table: &'a CodeTable) -> Self {
        Self {
            reader,
            table,
            cancel: None,
            bytes_read: 0,
        }
    }

    /// Attaches a cancellation token, checked before each frame.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Total bytes consumed from the stream so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Reads the next packet, blocking until it is complete.
    ///
    /// Returns `Ok(None)` on a clean end of stream at a frame boundary; the
    /// caller decides whether that is acceptable (it is not, mid-response).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Cancelled`] if the injected token fired.
    /// - [`ProtocolError::TruncatedHeader`] / [`ProtocolError::TruncatedPayload`]
    ///   if the stream ends inside a frame.
    /// - [`ProtocolError::MessageTooLarge`] once cumulative input exceeds
    ///   [`MAX_MESSAGE_SIZE`].
    /// - [`ProtocolError::Io`] for any other transport failure.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(ProtocolError::Cancelled);
            }
        }

        let mut header = [0u8; HEADER_SIZE];
        let filled = read_up_to(&mut self.reader, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < HEADER_SIZE {
            return Err(ProtocolError::TruncatedHeader { available: filled });
        }

        let code = u16::from_le_bytes([header[0], header[1]]);
        let length = u16::from_le_bytes([header[2], header[3]]) as usize;

        if self.bytes_read + HEADER_SIZE + length > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                limit: MAX_MESSAGE_SIZE,
            });
        }

        // `take` bounds the read to the declared length; the buffer grows
        // only as bytes arrive.
        let mut payload = Vec::new();
        (&mut self.reader)
            .take(length as u64)
            .read_to_end(&mut payload)?;
        if payload.len() < length {
            return Err(ProtocolError::TruncatedPayload {
                declared: length,
                available: payload.len(),
            });
        }
        self.bytes_read += HEADER_SIZE + length;

        let kind = self.table.decode_kind(code);
        if let PacketKind::Unknown(code) = kind {
            debug!(code, table = self.table.name(), "unrecognized packet code");
        }
        validate_payload(kind, &payload)?;
        Ok(Some(Packet { kind, payload }))
    }
}

/// Fills `buf` from `reader`, stopping early only at end of stream.
/// Returns the number of bytes actually read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(filled)
}

/// Reads packets from `reader` and assembles them into one [`Response`].
///
/// This is the full decode path: framing, code resolution, shape validation,
/// and response assembly.  A clean end of stream before `End` fails with
/// [`ProtocolError::IncompleteResponse`]; cancellation via `cancel` fails
/// with [`ProtocolError::Cancelled`].
pub fn read_response<R: Read>(
    reader: R,
    table: &CodeTable,
    cancel: Option<CancelToken>,
) -> Result<Response, ProtocolError> {
    let mut packets = PacketReader::new(reader, table);
    if let Some(cancel) = cancel {
        packets = packets.with_cancel(cancel);
    }

    let mut assembler = ResponseAssembler::new();
    loop {
        match packets.next_packet()? {
            Some(packet) => {
                if let Some(response) = assembler.feed(packet)? {
                    return Ok(response);
                }
            }
            None => return Err(ProtocolError::IncompleteResponse),
        }
    }
}
