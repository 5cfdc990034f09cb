//! # translation-core
//!
//! Protocol core for the edge-proxy translation service: the binary wire
//! codec, the versioned packet-code registry, and the assembler that turns a
//! raw packet stream into a validated decision object.
//!
//! The edge proxy asks an out-of-process translation service what to do with
//! each incoming request.  It sends a compact fact sheet (host, URI, client
//! address, …) and receives a structured decision: which backend to address,
//! how to rewrite the path, which headers to forward, caching policy, and
//! per-view overrides.  This crate implements only the protocol between the
//! two; transport, connection pooling, backend dispatch, and HTTP handling
//! live in the consuming applications.
//!
//! This crate defines:
//!
//! - **`protocol::registry`** – The versioned code tables.  Every field has
//!   a 16-bit wire code whose meaning depends on the protocol generation;
//!   tables are explicit immutable values passed into every codec call, so
//!   several generations can coexist in one process.
//!
//! - **`protocol::codec`** – Framing: `[code:2][length:2][payload]`, both
//!   header fields little-endian.  Includes a bounded, cancellable stream
//!   reader that is safe against hostile length fields.
//!
//! - **`protocol::request`** / **`protocol::assembler`** – The two message
//!   directions.  Requests are flat fact sheets built packet by packet;
//!   responses are assembled through a strict state machine that scopes
//!   fields to views, filters, and widget containers.
//!
//! Everything here is synchronous, stateless between messages, and free of
//! shared mutable state: encode/decode functions and the lookup tables can
//! be used from any number of threads without coordination.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `translation_core::Response` instead of the full module path.
pub use protocol::assembler::{assemble_response, ResponseAssembler};
pub use protocol::codec::{
    decode_packet, encode_packet, encode_request, read_response, CancelToken, PacketReader,
};
pub use protocol::error::ProtocolError;
pub use protocol::packet::Packet;
pub use protocol::registry::{CodeTable, PacketKind};
pub use protocol::request::{Request, RequestBuilder};
pub use protocol::response::{
    CgiAddress, CgiArg, FileAddress, ForwardMode, HeaderForwardSettings, HeaderGroup, HeaderRule,
    HttpAddress, LhttpAddress, NfsAddress, Pair, ResourceAddress, Response, Transformation, View,
    WidgetNode,
};
pub use protocol::validate::{shape_of, validate_payload, PayloadShape};
