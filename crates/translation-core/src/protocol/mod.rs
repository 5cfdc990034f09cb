//! Protocol module: packet registry, wire codec, request builder, and
//! response assembler.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod packet;
pub mod registry;
pub mod request;
pub mod response;
pub mod validate;

pub use assembler::{assemble_response, ResponseAssembler};
pub use codec::{
    decode_packet, encode_packet, encode_request, read_response, CancelToken, PacketReader,
};
pub use error::ProtocolError;
pub use packet::Packet;
pub use registry::{CodeTable, PacketKind};
pub use request::{Request, RequestBuilder};
pub use response::Response;
