//! Error type shared by the codec, the request builder, and the assembler.

use thiserror::Error;

use crate::protocol::registry::PacketKind;

/// Errors that can occur while encoding, decoding, or assembling translation
/// protocol traffic.
///
/// Every error is surfaced to the caller; the codec never retries, because a
/// framing error in the middle of a stream leaves no resynchronization point.
/// Note that an *unknown* packet code is deliberately not on this list: it
/// decodes to [`PacketKind::Unknown`] and passes through as a no-op.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended inside a 4-byte packet header.
    #[error("truncated packet header: got {available} of 4 bytes")]
    TruncatedHeader { available: usize },

    /// The stream ended before the declared payload length was reached.
    #[error("truncated payload: header declared {declared} bytes, got {available}")]
    TruncatedPayload { declared: usize, available: usize },

    /// The payload does not fit the 16-bit length field.
    #[error("payload of {size} bytes does not fit the 16-bit length field")]
    PayloadTooLarge { size: usize },

    /// The payload does not match the shape rule for its packet kind.
    #[error("bad {kind:?} payload: {detail}")]
    PayloadShapeMismatch { kind: PacketKind, detail: String },

    /// The packet kind has no wire code in the selected table generation.
    #[error("{kind:?} has no code in the {table} protocol generation")]
    UnsupportedInVersion {
        kind: PacketKind,
        table: &'static str,
    },

    /// The cumulative size of one message exceeded the hard ceiling.
    #[error("message exceeds the {limit}-byte ceiling")]
    MessageTooLarge { limit: usize },

    /// The first packet of a response was not `Begin`.
    #[error("response does not start with a Begin packet")]
    MissingBegin,

    /// A second `Begin` arrived inside a response.
    #[error("duplicate Begin packet")]
    DuplicateBegin,

    /// Widget/container nesting was not balanced at `End`.
    #[error("unbalanced widget/container nesting")]
    UnbalancedStructure,

    /// A recognized packet arrived in a position where it cannot apply
    /// (e.g. `Append` with no executable address to append to).
    #[error("misplaced {kind:?} packet")]
    MisplacedPacket { kind: PacketKind },

    /// The stream ended cleanly before `End` completed the response.
    #[error("stream ended before the response was complete")]
    IncompleteResponse,

    /// An add-operation was invoked on an already-finished request builder.
    #[error("request builder already finished")]
    RequestAlreadyFinished,

    /// The injected cancellation signal fired while waiting for packets.
    #[error("translation cancelled")]
    Cancelled,

    /// Transport-level I/O failure (anything but end-of-stream, which maps
    /// to the truncation/incomplete variants above).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
