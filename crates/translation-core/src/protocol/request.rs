//! Outbound translation requests.
//!
//! A request is a flat fact sheet about one client request: host, URI,
//! client address, session, and so on.  Unlike the response side there is no
//! scoping; the builder just accumulates packets in call order between the
//! implicit `Begin` and the `End` appended by [`RequestBuilder::finish`].

use serde::{Deserialize, Serialize};

use crate::protocol::codec::MAX_PAYLOAD;
use crate::protocol::error::ProtocolError;
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketKind;
use crate::protocol::validate::validate_payload;

/// A finalized, immutable packet sequence: `Begin`, the facts, `End`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    packets: Vec<Packet>,
}

impl Request {
    /// The packets in wire order.
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

/// Accumulates the fact packets of one translation request.
///
/// `Begin` is emitted implicitly by [`RequestBuilder::new`]; every
/// add-operation validates its payload shape and size immediately, so a
/// malformed fact is rejected before anything is sent.
///
/// # Examples
///
/// ```rust
/// use translation_core::protocol::request::RequestBuilder;
///
/// let mut builder = RequestBuilder::new();
/// builder.host("example.com").unwrap();
/// builder.uri("/index.html").unwrap();
/// let request = builder.finish().unwrap();
/// assert_eq!(request.len(), 4); // Begin, Host, Uri, End
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    packets: Vec<Packet>,
    finished: bool,
}

impl RequestBuilder {
    /// Starts a request; the `Begin` packet is the implicit first element.
    pub fn new() -> Self {
        Self {
            packets: vec![Packet::empty(PacketKind::Begin)],
            finished: false,
        }
    }

    /// Starts a request announcing a protocol version in the `Begin` packet.
    pub fn with_protocol_version(version: u8) -> Self {
        Self {
            packets: vec![Packet::bytes(PacketKind::Begin, &[version])],
            finished: false,
        }
    }

    /// Appends an arbitrary packet.  The typed methods below are preferred;
    /// this is the escape hatch for fields without one.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::RequestAlreadyFinished`] after [`finish`](Self::finish).
    /// - [`ProtocolError::PayloadTooLarge`] if the payload exceeds the
    ///   16-bit length field.
    /// - [`ProtocolError::PayloadShapeMismatch`] if the payload does not
    ///   match the kind's shape rule.
    pub fn packet(&mut self, kind: PacketKind, payload: &[u8]) -> Result<&mut Self, ProtocolError> {
        if self.finished {
            return Err(ProtocolError::RequestAlreadyFinished);
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
            });
        }
        validate_payload(kind, payload)?;
        self.packets.push(Packet::bytes(kind, payload));
        Ok(self)
    }

    fn text_packet(&mut self, kind: PacketKind, value: &str) -> Result<&mut Self, ProtocolError> {
        self.packet(kind, value.as_bytes())
    }

    /// The `Host` request header.
    pub fn host(&mut self, host: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Host, host)
    }

    /// The request URI (path and query).
    pub fn uri(&mut self, uri: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Uri, uri)
    }

    /// Widget argument string, if the request addresses a widget.
    pub fn args(&mut self, args: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Args, args)
    }

    /// The query string, when it is not part of the URI fact.
    pub fn query_string(&mut self, query: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::QueryString, query)
    }

    /// Type name of the widget being resolved.
    pub fn widget_type(&mut self, name: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::WidgetType, name)
    }

    /// Opaque session token previously issued by the peer.
    pub fn session(&mut self, token: &[u8]) -> Result<&mut Self, ProtocolError> {
        self.packet(PacketKind::Session, token)
    }

    /// Opaque check token from an earlier `Check` response field.
    pub fn check(&mut self, token: &[u8]) -> Result<&mut Self, ProtocolError> {
        self.packet(PacketKind::Check, token)
    }

    /// Free-form parameter for the peer.
    pub fn param(&mut self, param: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Param, param)
    }

    /// Authenticated user, if any.
    pub fn user(&mut self, user: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::User, user)
    }

    /// The client's `Accept-Language` value.
    pub fn language(&mut self, language: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Language, language)
    }

    /// The client address as text.
    pub fn remote_host(&mut self, host: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::RemoteHost, host)
    }

    /// The listener address the request arrived on, as a raw sockaddr.
    pub fn local_address(&mut self, sockaddr: &[u8]) -> Result<&mut Self, ProtocolError> {
        self.packet(PacketKind::LocalAddress, sockaddr)
    }

    /// The listener address the request arrived on, as text.
    pub fn local_address_string(&mut self, address: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::LocalAddressString, address)
    }

    /// The client's `User-Agent` value.
    pub fn user_agent(&mut self, user_agent: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::UserAgent, user_agent)
    }

    /// Pre-classified user-agent class (e.g. `"desktop"`, `"mobile"`).
    pub fn ua_class(&mut self, class: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::UaClass, class)
    }

    /// The request's `Authorization` header value.
    pub fn authorization(&mut self, value: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Authorization, value)
    }

    /// File suffix for content-type lookup requests.
    pub fn suffix(&mut self, suffix: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::Suffix, suffix)
    }

    /// Tag of the listener that accepted the connection.
    pub fn listener_tag(&mut self, tag: &str) -> Result<&mut Self, ProtocolError> {
        self.text_packet(PacketKind::ListenerTag, tag)
    }

    /// Asks the peer to include the given fields in its response, encoded as
    /// little-endian wire codes resolved through the peer's own table.
    pub fn want(
        &mut self,
        kinds: &[PacketKind],
        table: &crate::protocol::registry::CodeTable,
    ) -> Result<&mut Self, ProtocolError> {
        let mut payload = Vec::with_capacity(kinds.len() * 2);
        for &kind in kinds {
            payload.extend_from_slice(&table.encode_code(kind)?.to_le_bytes());
        }
        self.packet(PacketKind::Want, &payload)
    }

    /// Appends `End` and returns the finalized request.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::RequestAlreadyFinished`] on a second call.
    pub fn finish(&mut self) -> Result<Request, ProtocolError> {
        if self.finished {
            return Err(ProtocolError::RequestAlreadyFinished);
        }
        self.finished = true;
        let mut packets = std::mem::take(&mut self.packets);
        packets.push(Packet::empty(PacketKind::End));
        Ok(Request { packets })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::registry::CodeTable;

    #[test]
    fn test_request_is_framed_by_begin_and_end() {
        let mut builder = RequestBuilder::new();
        builder.host("example.com").unwrap();
        let request = builder.finish().unwrap();

        let kinds: Vec<_> = request.packets().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [PacketKind::Begin, PacketKind::Host, PacketKind::End]
        );
    }

    #[test]
    fn test_packets_keep_call_order() {
        let mut builder = RequestBuilder::new();
        builder.uri("/a").unwrap();
        builder.host("h").unwrap();
        builder.uri("/b").unwrap();
        let request = builder.finish().unwrap();

        let kinds: Vec<_> = request.packets().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                PacketKind::Begin,
                PacketKind::Uri,
                PacketKind::Host,
                PacketKind::Uri,
                PacketKind::End,
            ]
        );
    }

    #[test]
    fn test_add_after_finish_fails() {
        let mut builder = RequestBuilder::new();
        builder.finish().unwrap();
        assert!(matches!(
            builder.host("late.example.com"),
            Err(ProtocolError::RequestAlreadyFinished)
        ));
    }

    #[test]
    fn test_double_finish_fails() {
        let mut builder = RequestBuilder::new();
        builder.finish().unwrap();
        assert!(matches!(
            builder.finish(),
            Err(ProtocolError::RequestAlreadyFinished)
        ));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let mut builder = RequestBuilder::new();
        let huge = "x".repeat(MAX_PAYLOAD + 1);
        assert!(matches!(
            builder.host(&huge),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_shape_violation_is_rejected_before_send() {
        let mut builder = RequestBuilder::new();
        assert!(matches!(
            builder.packet(PacketKind::End, b"payload"),
            Err(ProtocolError::PayloadShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_protocol_version_rides_in_begin() {
        let builder = RequestBuilder::with_protocol_version(2);
        assert_eq!(builder.packets[0].payload, vec![2]);
    }

    #[test]
    fn test_want_encodes_codes_through_the_table() {
        let table = CodeTable::current();
        let mut builder = RequestBuilder::new();
        builder
            .want(&[PacketKind::Status, PacketKind::View], &table)
            .unwrap();
        let request = builder.finish().unwrap();
        let want = &request.packets()[1];
        assert_eq!(want.kind, PacketKind::Want);
        assert_eq!(want.payload, vec![5, 0, 34, 0]);
    }
}
