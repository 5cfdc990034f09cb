//! One framed unit of the protocol: a kind plus a payload.

use serde::{Deserialize, Serialize};

use crate::protocol::error::ProtocolError;
use crate::protocol::registry::PacketKind;
use crate::protocol::validate::shape_error;

/// A single protocol packet.
///
/// Payload interpretation (none / UTF-8 text / fixed-width integer / opaque
/// bytes) is determined by the kind via [`crate::protocol::validate`].
/// Packets are created by the decoder or the request builder and consumed
/// immediately; nothing holds them beyond one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub kind: PacketKind,
    pub payload: Vec<u8>,
}

impl Packet {
    /// A packet with no payload.
    pub fn empty(kind: PacketKind) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    /// A packet carrying UTF-8 text.
    pub fn text(kind: PacketKind, text: &str) -> Self {
        Self {
            kind,
            payload: text.as_bytes().to_vec(),
        }
    }

    /// A packet carrying a little-endian u16.
    pub fn u16(kind: PacketKind, value: u16) -> Self {
        Self {
            kind,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    /// A packet carrying a little-endian u32.
    pub fn u32(kind: PacketKind, value: u32) -> Self {
        Self {
            kind,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    /// A packet carrying raw bytes.
    pub fn bytes(kind: PacketKind, payload: &[u8]) -> Self {
        Self {
            kind,
            payload: payload.to_vec(),
        }
    }

    /// The payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadShapeMismatch`] if the bytes are not UTF-8.
    pub fn payload_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.payload)
            .map_err(|_| shape_error(self.kind, "payload is not valid UTF-8".into()))
    }

    /// The payload as a little-endian u16.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadShapeMismatch`] unless the payload is exactly
    /// 2 bytes.
    pub fn payload_u16(&self) -> Result<u16, ProtocolError> {
        let bytes: [u8; 2] = self.payload.as_slice().try_into().map_err(|_| {
            shape_error(
                self.kind,
                format!("expected exactly 2 bytes, got {}", self.payload.len()),
            )
        })?;
        Ok(u16::from_le_bytes(bytes))
    }

    /// The payload as a little-endian u32.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadShapeMismatch`] unless the payload is exactly
    /// 4 bytes.
    pub fn payload_u32(&self) -> Result<u32, ProtocolError> {
        let bytes: [u8; 4] = self.payload.as_slice().try_into().map_err(|_| {
            shape_error(
                self.kind,
                format!("expected exactly 4 bytes, got {}", self.payload.len()),
            )
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// The payload as a sequence of little-endian u16 values.
    ///
    /// Used for the `Vary`, `Invalidate`, and `Want` fields, whose payloads
    /// are arrays of wire codes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::PayloadShapeMismatch`] if the payload is empty or not
    /// a multiple of 2 bytes.
    pub fn payload_u16_list(&self) -> Result<Vec<u16>, ProtocolError> {
        if self.payload.is_empty() || self.payload.len() % 2 != 0 {
            return Err(shape_error(
                self.kind,
                format!(
                    "expected a non-empty multiple of 2 bytes, got {}",
                    self.payload.len()
                ),
            ));
        }
        Ok(self
            .payload
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_payload_is_little_endian() {
        let packet = Packet::u16(PacketKind::Status, 200);
        assert_eq!(packet.payload, vec![200, 0]);
        assert_eq!(packet.payload_u16().unwrap(), 200);
    }

    #[test]
    fn test_u16_list_rejects_odd_length() {
        let packet = Packet::bytes(PacketKind::Vary, &[1, 0, 2]);
        assert!(packet.payload_u16_list().is_err());
    }

    #[test]
    fn test_u16_list_rejects_empty_payload() {
        let packet = Packet::empty(PacketKind::Want);
        assert!(packet.payload_u16_list().is_err());
    }

    #[test]
    fn test_u16_list_parses_codes_in_order() {
        let packet = Packet::bytes(PacketKind::Want, &[5, 0, 34, 0]);
        assert_eq!(packet.payload_u16_list().unwrap(), vec![5, 34]);
    }
}
