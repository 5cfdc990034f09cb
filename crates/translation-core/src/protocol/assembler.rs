//! Response assembly: turning a flat packet stream into a [`Response`].
//!
//! The assembler is a state machine (`AwaitingBegin → InBody → Done`, with a
//! terminal failed state reachable from anywhere) that owns scoping:
//! which view an address or header applies to, which transformation a filter
//! address belongs to, and where a widget nests.  One assembler serves
//! exactly one response; it is never shared between requests or threads.
//!
//! A response is all-or-nothing: the `Response` value is handed out only
//! when `End` arrives with every structure balanced.  Any failure discards
//! the partial state for good.

use tracing::{debug, trace};

use crate::protocol::error::ProtocolError;
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketKind;
use crate::protocol::response::{
    CgiAddress, CgiArg, FileAddress, ForwardMode, HeaderForwardSettings, HeaderGroup, HeaderRule,
    HttpAddress, LhttpAddress, NfsAddress, Pair, ResourceAddress, Response, Transformation, View,
    WidgetNode,
};
use crate::protocol::validate::shape_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingBegin,
    InBody,
    Done,
    Failed,
}

/// Which slot the next address packet fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddrTarget {
    /// The response-level address (default-view scope).
    Response,
    /// The current named view's override address.
    View,
    /// The pending `Filter` transformation on the current view.
    Filter,
}

/// Assembles decoded packets into one validated [`Response`].
///
/// # Examples
///
/// ```rust
/// use translation_core::protocol::assembler::ResponseAssembler;
/// use translation_core::protocol::packet::Packet;
/// use translation_core::protocol::registry::PacketKind;
///
/// let mut assembler = ResponseAssembler::new();
/// assert!(assembler
///     .feed(Packet::empty(PacketKind::Begin))
///     .unwrap()
///     .is_none());
/// let response = assembler
///     .feed(Packet::empty(PacketKind::End))
///     .unwrap()
///     .expect("End completes the response");
/// assert_eq!(response.views.len(), 1);
/// ```
#[derive(Debug)]
pub struct ResponseAssembler {
    state: State,
    response: Response,
    addr_target: AddrTarget,
    /// Open widget containers, innermost last.
    widget_stack: Vec<WidgetNode>,
    /// The most recent widget, still accepting flag packets.
    current_widget: Option<WidgetNode>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingBegin,
            response: Response::default(),
            addr_target: AddrTarget::Response,
            widget_stack: Vec::new(),
            current_widget: None,
        }
    }

    /// `true` once `End` has been consumed and the response handed out.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Feeds one packet.  Returns `Ok(Some(response))` when the packet was
    /// `End` and the response is complete, `Ok(None)` otherwise.
    ///
    /// # Errors
    ///
    /// Any of the assembly failures described in the module docs.  After an
    /// error the assembler is failed for good and must be discarded; the
    /// partially built response is dropped, never returned.  Feeding a
    /// finished or failed assembler is a caller bug reported as
    /// [`ProtocolError::MisplacedPacket`].
    pub fn feed(&mut self, packet: Packet) -> Result<Option<Response>, ProtocolError> {
        let result = self.dispatch(packet);
        if result.is_err() {
            self.state = State::Failed;
            self.response = Response::default();
            self.widget_stack.clear();
            self.current_widget = None;
        }
        result
    }

    fn dispatch(&mut self, packet: Packet) -> Result<Option<Response>, ProtocolError> {
        match self.state {
            State::AwaitingBegin => {
                if packet.kind != PacketKind::Begin {
                    return Err(ProtocolError::MissingBegin);
                }
                self.begin(&packet);
                Ok(None)
            }
            State::InBody => self.route(packet),
            State::Done | State::Failed => Err(ProtocolError::MisplacedPacket { kind: packet.kind }),
        }
    }

    fn begin(&mut self, packet: &Packet) {
        if let Some(&version) = packet.payload.first() {
            self.response.protocol_version = version;
            if packet.payload.len() > 1 {
                debug!(
                    extra = packet.payload.len() - 1,
                    "ignoring extra Begin payload bytes"
                );
            }
        }
        // The default view exists before any View packet.
        self.response.views.push(View::default());
        self.state = State::InBody;
        trace!("assembler: AwaitingBegin -> InBody");
    }

    fn route(&mut self, packet: Packet) -> Result<Option<Response>, ProtocolError> {
        let kind = packet.kind;
        match kind {
            PacketKind::Begin => return Err(ProtocolError::DuplicateBegin),
            PacketKind::End => return self.finish(),

            // ── Scalar decision fields ────────────────────────────────────
            PacketKind::Status => {
                let status = packet.payload_u16()?;
                if !(100..=599).contains(&status) {
                    return Err(shape_error(kind, format!("{status} is not an HTTP status")));
                }
                self.response.status = Some(status);
            }
            PacketKind::MaxAge => self.response.max_age = Some(packet.payload_u32()?),
            PacketKind::ExpiresRelative => {
                self.response.expires_relative = Some(packet.payload_u32()?)
            }

            PacketKind::Redirect => self.response.redirect = Some(text(&packet)?),
            PacketKind::Bounce => self.response.bounce = Some(text(&packet)?),
            PacketKind::Base => self.response.base = Some(text(&packet)?),
            PacketKind::Site => self.response.site = Some(text(&packet)?),
            PacketKind::Scheme => self.response.scheme = Some(text(&packet)?),
            PacketKind::Uri => self.response.uri = Some(text(&packet)?),
            PacketKind::TestPath => self.response.test_path = Some(text(&packet)?),
            PacketKind::Untrusted => self.response.untrusted = Some(text(&packet)?),
            PacketKind::UntrustedPrefix => self.response.untrusted_prefix = Some(text(&packet)?),
            PacketKind::UntrustedSiteSuffix => {
                self.response.untrusted_site_suffix = Some(text(&packet)?)
            }
            PacketKind::User => self.response.user = Some(text(&packet)?),
            PacketKind::Realm => self.response.realm = Some(text(&packet)?),
            PacketKind::Language => self.response.language = Some(text(&packet)?),
            PacketKind::WwwAuthenticate => self.response.www_authenticate = Some(text(&packet)?),
            PacketKind::AuthenticationInfo => {
                self.response.authentication_info = Some(text(&packet)?)
            }
            PacketKind::CookieDomain => self.response.cookie_domain = Some(text(&packet)?),
            PacketKind::CookieHost => self.response.cookie_host = Some(text(&packet)?),
            PacketKind::CookiePath => self.response.cookie_path = Some(text(&packet)?),
            PacketKind::Regex => self.response.regex = Some(text(&packet)?),
            PacketKind::InverseRegex => self.response.inverse_regex = Some(text(&packet)?),
            PacketKind::Session => self.response.session = Some(packet.payload),

            PacketKind::Vary => self.response.vary = packet.payload_u16_list()?,
            PacketKind::Invalidate => self.response.invalidate = packet.payload_u16_list()?,
            PacketKind::Want => self.response.want = packet.payload_u16_list()?,

            PacketKind::DiscardSession => self.response.discard_session = true,
            PacketKind::SecureCookie => self.response.secure_cookie = true,
            PacketKind::Stateful => self.response.stateful = true,
            PacketKind::Transparent => self.response.transparent = true,
            PacketKind::AutoBase => self.response.auto_base = true,
            PacketKind::EasyBase => self.response.easy_base = true,
            PacketKind::UnsafeBase => self.response.unsafe_base = true,
            PacketKind::RegexTail => self.response.regex_tail = true,
            PacketKind::RegexUnescape => self.response.regex_unescape = true,
            PacketKind::RedirectQueryString => self.response.redirect_query_string = true,

            // ── Addresses ─────────────────────────────────────────────────
            PacketKind::Path => {
                let address = ResourceAddress::Path(FileAddress::new(text(&packet)?));
                self.set_address(address);
            }
            // Proxy is the legacy spelling of the Http upstream field.
            PacketKind::Http | PacketKind::Proxy => {
                let address = ResourceAddress::Http(HttpAddress::new(text(&packet)?));
                self.set_address(address);
            }
            PacketKind::Ajp => {
                let address = ResourceAddress::Ajp(HttpAddress::new(text(&packet)?));
                self.set_address(address);
            }
            PacketKind::Cgi => {
                self.set_address(ResourceAddress::Cgi(CgiAddress::new(text(&packet)?)))
            }
            PacketKind::Fastcgi => {
                self.set_address(ResourceAddress::Fastcgi(CgiAddress::new(text(&packet)?)))
            }
            PacketKind::Was => {
                self.set_address(ResourceAddress::Was(CgiAddress::new(text(&packet)?)))
            }
            PacketKind::Pipe => {
                self.set_address(ResourceAddress::Pipe(CgiAddress::new(text(&packet)?)))
            }
            PacketKind::NfsServer => self.set_address(ResourceAddress::Nfs(NfsAddress {
                server: text(&packet)?,
                export: String::new(),
            })),
            PacketKind::NfsExport => {
                let value = text(&packet)?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Nfs(nfs)) => nfs.export = value,
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::LhttpPath => {
                self.set_address(ResourceAddress::Lhttp(LhttpAddress::new(text(&packet)?)))
            }
            PacketKind::LhttpUri => {
                let value = text(&packet)?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Lhttp(lhttp)) => lhttp.uri = Some(value),
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::LhttpHost => {
                let value = text(&packet)?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Lhttp(lhttp)) => lhttp.host = Some(value),
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::Concurrency => {
                let value = packet.payload_u16()?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Lhttp(lhttp)) => lhttp.concurrency = Some(value),
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }

            // ── Address attributes ────────────────────────────────────────
            PacketKind::ExpandPath => {
                let value = text(&packet)?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Path(file)) => file.expand_path = Some(value),
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::Delegate => {
                let value = text(&packet)?;
                match self.current_address_mut() {
                    Some(ResourceAddress::Path(file)) => file.delegate = Some(value),
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::ContentType => {
                // Belongs to a file address when one is in scope, otherwise
                // to the response itself.
                let mut value = Some(text(&packet)?);
                if let Some(ResourceAddress::Path(file)) = self.current_address_mut() {
                    file.content_type = value.take();
                }
                if let Some(value) = value {
                    self.response.content_type = Some(value);
                }
            }
            PacketKind::DocumentRoot => {
                let mut value = Some(text(&packet)?);
                match self.current_address_mut() {
                    Some(ResourceAddress::Path(file)) => file.document_root = value.take(),
                    Some(other) => {
                        if let Some(cgi) = other.as_cgi_mut() {
                            cgi.document_root = value.take();
                        }
                    }
                    None => {}
                }
                if let Some(value) = value {
                    self.response.document_root = Some(value);
                }
            }
            PacketKind::Append | PacketKind::ExpandAppend => {
                let arg = CgiArg {
                    value: text(&packet)?,
                    expand: kind == PacketKind::ExpandAppend,
                };
                match self
                    .current_address_mut()
                    .and_then(ResourceAddress::as_cgi_mut)
                {
                    Some(cgi) => cgi.args.push(arg),
                    None => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }
            PacketKind::Interpreter => {
                self.cgi_field(kind, text(&packet)?, |cgi, v| cgi.interpreter = Some(v))?
            }
            PacketKind::Action => {
                self.cgi_field(kind, text(&packet)?, |cgi, v| cgi.action = Some(v))?
            }
            PacketKind::ScriptName => {
                self.cgi_field(kind, text(&packet)?, |cgi, v| cgi.script_name = Some(v))?
            }
            PacketKind::PathInfo => {
                self.cgi_field(kind, text(&packet)?, |cgi, v| cgi.path_info = Some(v))?
            }
            PacketKind::QueryString => {
                self.cgi_field(kind, text(&packet)?, |cgi, v| cgi.query_string = Some(v))?
            }

            // ── Views and transformations ─────────────────────────────────
            PacketKind::View => {
                let name = text(&packet)?;
                if name.is_empty() {
                    return Err(shape_error(kind, "view name must not be empty".into()));
                }
                self.response.views.push(View::named(name));
                self.addr_target = AddrTarget::View;
                trace!(view = ?self.current_view().name, "assembler: opened view scope");
            }
            PacketKind::Filter => {
                self.current_view_mut()
                    .transformations
                    .push(Transformation::Filter { address: None });
                self.addr_target = AddrTarget::Filter;
            }
            PacketKind::Process => self
                .current_view_mut()
                .transformations
                .push(Transformation::Process),
            PacketKind::ProcessCss => self
                .current_view_mut()
                .transformations
                .push(Transformation::ProcessCss { prefix_class: None }),
            PacketKind::ProcessText => self
                .current_view_mut()
                .transformations
                .push(Transformation::ProcessText),
            PacketKind::PrefixCssClass => {
                let value = text(&packet)?;
                match self.current_view_mut().transformations.last_mut() {
                    Some(Transformation::ProcessCss { prefix_class }) => {
                        *prefix_class = Some(value)
                    }
                    _ => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }

            // ── Headers ───────────────────────────────────────────────────
            PacketKind::Header | PacketKind::ExpandHeader => {
                let (name, value) = split_header(kind, &text(&packet)?)?;
                self.current_view_mut().headers.insert(
                    name,
                    HeaderRule {
                        mode: ForwardMode::Forward,
                        value: Some(value),
                        expand: kind == PacketKind::ExpandHeader,
                    },
                );
            }
            PacketKind::RequestHeader | PacketKind::ExpandRequestHeader => {
                let (name, value) = split_header(kind, &text(&packet)?)?;
                self.response.request_headers.push(Pair {
                    name,
                    value,
                    expand: kind == PacketKind::ExpandRequestHeader,
                });
            }
            PacketKind::RequestHeaderForward => {
                let rules = parse_forward_rules(kind, &packet.payload)?;
                apply_forward_rules(&mut self.response.request_header_forward, rules);
            }
            PacketKind::ResponseHeaderForward => {
                let rules = parse_forward_rules(kind, &packet.payload)?;
                apply_forward_rules(&mut self.response.response_header_forward, rules);
            }

            // ── Pairs ─────────────────────────────────────────────────────
            PacketKind::Pair | PacketKind::ExpandPair => {
                let pair = split_pair(kind, &text(&packet)?, kind == PacketKind::ExpandPair)?;
                self.response.pairs.push(pair);
            }
            PacketKind::Setenv | PacketKind::ExpandSetenv => {
                let pair = split_pair(kind, &text(&packet)?, kind == PacketKind::ExpandSetenv)?;
                self.response.env.push(pair);
            }

            // ── Widget tree ───────────────────────────────────────────────
            PacketKind::WidgetInfo => {
                let name = text(&packet)?;
                if name.is_empty() {
                    return Err(shape_error(kind, "widget type must not be empty".into()));
                }
                self.close_current_widget();
                self.current_widget = Some(WidgetNode::new(name));
            }
            PacketKind::Container => match self.current_widget.take() {
                Some(widget) => self.widget_stack.push(widget),
                None => return Err(ProtocolError::MisplacedPacket { kind }),
            },
            PacketKind::WidgetGroup => {
                let name = text(&packet)?;
                self.close_current_widget();
                match self.widget_stack.pop() {
                    Some(mut container) => {
                        container.group = Some(name);
                        self.attach_widget(container);
                    }
                    None => return Err(ProtocolError::UnbalancedStructure),
                }
            }
            PacketKind::SelfContainer => match self.current_widget.as_mut() {
                Some(widget) => widget.self_container = true,
                None => return Err(ProtocolError::MisplacedPacket { kind }),
            },
            PacketKind::DirectAddressing => match self.current_widget.as_mut() {
                Some(widget) => widget.direct_addressing = true,
                None => return Err(ProtocolError::MisplacedPacket { kind }),
            },
            PacketKind::GroupContainer => {
                let name = text(&packet)?;
                match self.current_widget.as_mut() {
                    Some(widget) => widget.allowed_groups.push(name),
                    None => return Err(ProtocolError::MisplacedPacket { kind }),
                }
            }

            // ── Recognized, but outside the modeled decision surface ──────
            // Request-side fact fields echoed at us, backend spawn details
            // (namespaces, mounts, rlimits), and the auth/session handshake
            // are consumed by other subsystems; like unknown codes, they
            // pass through as no-ops.
            PacketKind::Host
            | PacketKind::Param
            | PacketKind::RemoteHost
            | PacketKind::WidgetType
            | PacketKind::Address
            | PacketKind::AddressString
            | PacketKind::JailCgi
            | PacketKind::Domain
            | PacketKind::UserAgent
            | PacketKind::LocalAddress
            | PacketKind::LocalAddressString
            | PacketKind::Deflated
            | PacketKind::Gzipped
            | PacketKind::Args
            | PacketKind::Authorization
            | PacketKind::Filter4xx
            | PacketKind::ErrorDocument
            | PacketKind::Check
            | PacketKind::Previous
            | PacketKind::Home
            | PacketKind::Sticky
            | PacketKind::DumpHeaders
            | PacketKind::FocusWidget
            | PacketKind::AnchorAbsolute
            | PacketKind::PrefixXmlId
            | PacketKind::ExpandPathInfo
            | PacketKind::LocalUri
            | PacketKind::UaClass
            | PacketKind::ProcessStyle
            | PacketKind::ValidateMtime
            | PacketKind::ExpandLhttpUri
            | PacketKind::WantFullUri
            | PacketKind::UserNamespace
            | PacketKind::NetworkNamespace
            | PacketKind::PidNamespace
            | PacketKind::PivotRoot
            | PacketKind::MountProc
            | PacketKind::MountHome
            | PacketKind::MountTmpTmpfs
            | PacketKind::UtsNamespace
            | PacketKind::BindMount
            | PacketKind::Rlimits
            | PacketKind::FileNotFound
            | PacketKind::ContentTypeLookup
            | PacketKind::Suffix
            | PacketKind::DirectoryIndex
            | PacketKind::ExpandRedirect
            | PacketKind::ExpandScriptName
            | PacketKind::ExpandTestPath
            | PacketKind::Enotdir
            | PacketKind::StderrPath
            | PacketKind::Auth
            | PacketKind::ExpandUri
            | PacketKind::ExpandSite
            | PacketKind::AutoGzipped
            | PacketKind::ExpandDocumentRoot
            | PacketKind::ProbePathSuffixes
            | PacketKind::ProbeSuffix
            | PacketKind::AuthFile
            | PacketKind::ExpandAuthFile
            | PacketKind::AppendAuth
            | PacketKind::ExpandAppendAuth
            | PacketKind::ListenerTag
            | PacketKind::ExpandCookieHost
            | PacketKind::ExpandBindMount
            | PacketKind::NonBlocking
            | PacketKind::ReadFile
            | PacketKind::ExpandReadFile
            | PacketKind::RegexOnHostUri
            | PacketKind::SessionSite
            | PacketKind::IpcNamespace
            | PacketKind::AutoDeflate
            | PacketKind::ExpandHome
            | PacketKind::ExpandStderrPath
            | PacketKind::RegexOnUserUri
            | PacketKind::AutoGzip
            | PacketKind::InternalRedirect
            | PacketKind::Login
            | PacketKind::UidGid
            | PacketKind::Password => {
                debug!(kind = ?kind, "ignoring packet outside the decision surface");
            }
            PacketKind::Unknown(code) => {
                trace!(code, "ignoring unknown packet");
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Result<Option<Response>, ProtocolError> {
        self.close_current_widget();
        if !self.widget_stack.is_empty() {
            return Err(ProtocolError::UnbalancedStructure);
        }
        self.state = State::Done;
        trace!("assembler: InBody -> Done");
        Ok(Some(std::mem::take(&mut self.response)))
    }

    // ── Scoping helpers ───────────────────────────────────────────────────────

    fn current_view(&self) -> &View {
        self.response
            .views
            .last()
            .expect("views is never empty in InBody")
    }

    fn current_view_mut(&mut self) -> &mut View {
        self.response
            .views
            .last_mut()
            .expect("views is never empty in InBody")
    }

    /// Stores an address in the slot selected by the current scope.
    /// A repeated address packet in the same slot is last-write-wins.
    fn set_address(&mut self, address: ResourceAddress) {
        match self.addr_target {
            AddrTarget::Response => self.response.address = Some(address),
            AddrTarget::View => self.current_view_mut().address = Some(address),
            AddrTarget::Filter => {
                if let Some(Transformation::Filter { address: slot }) =
                    self.current_view_mut().transformations.last_mut()
                {
                    *slot = Some(address);
                }
            }
        }
    }

    fn current_address_mut(&mut self) -> Option<&mut ResourceAddress> {
        match self.addr_target {
            AddrTarget::Response => self.response.address.as_mut(),
            AddrTarget::View => self.response.views.last_mut()?.address.as_mut(),
            AddrTarget::Filter => {
                match self.response.views.last_mut()?.transformations.last_mut() {
                    Some(Transformation::Filter { address }) => address.as_mut(),
                    _ => None,
                }
            }
        }
    }

    fn cgi_field(
        &mut self,
        kind: PacketKind,
        value: String,
        set: impl FnOnce(&mut CgiAddress, String),
    ) -> Result<(), ProtocolError> {
        match self
            .current_address_mut()
            .and_then(ResourceAddress::as_cgi_mut)
        {
            Some(cgi) => {
                set(cgi, value);
                Ok(())
            }
            None => Err(ProtocolError::MisplacedPacket { kind }),
        }
    }

    fn attach_widget(&mut self, widget: WidgetNode) {
        match self.widget_stack.last_mut() {
            Some(parent) => parent.children.push(widget),
            None => self.response.widgets.push(widget),
        }
    }

    fn close_current_widget(&mut self) {
        if let Some(widget) = self.current_widget.take() {
            self.attach_widget(widget);
        }
    }
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper: assembles an in-memory packet sequence.
///
/// # Errors
///
/// Any assembly failure; a sequence that runs out before `End` is
/// [`ProtocolError::IncompleteResponse`].
pub fn assemble_response(
    packets: impl IntoIterator<Item = Packet>,
) -> Result<Response, ProtocolError> {
    let mut assembler = ResponseAssembler::new();
    for packet in packets {
        if let Some(response) = assembler.feed(packet)? {
            return Ok(response);
        }
    }
    Err(ProtocolError::IncompleteResponse)
}

// ── Payload parsing helpers ──────────────────────────────────────────────────

fn text(packet: &Packet) -> Result<String, ProtocolError> {
    Ok(packet.payload_str()?.to_owned())
}

/// Splits a `Name:Value` header payload.
fn split_header(kind: PacketKind, payload: &str) -> Result<(String, String), ProtocolError> {
    match payload.split_once(':') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(shape_error(
            kind,
            "expected NAME:VALUE with a non-empty name".into(),
        )),
    }
}

/// Splits a `NAME=VALUE` pair payload.
fn split_pair(kind: PacketKind, payload: &str, expand: bool) -> Result<Pair, ProtocolError> {
    match payload.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(Pair {
            name: name.to_owned(),
            value: value.to_owned(),
            expand,
        }),
        _ => Err(shape_error(
            kind,
            "expected NAME=VALUE with a non-empty name".into(),
        )),
    }
}

/// Parses a header-forward payload: a non-empty sequence of 4-byte
/// `(group: i16, mode: i16)` entries, both little-endian.  Unknown groups
/// are skipped for forward compatibility; an invalid mode is an error.
fn parse_forward_rules(
    kind: PacketKind,
    payload: &[u8],
) -> Result<Vec<(HeaderGroup, ForwardMode)>, ProtocolError> {
    if payload.is_empty() || payload.len() % 4 != 0 {
        return Err(shape_error(
            kind,
            format!(
                "expected a non-empty multiple of 4 bytes, got {}",
                payload.len()
            ),
        ));
    }
    let mut rules = Vec::with_capacity(payload.len() / 4);
    for entry in payload.chunks_exact(4) {
        let group_raw = i16::from_le_bytes([entry[0], entry[1]]);
        let mode_raw = i16::from_le_bytes([entry[2], entry[3]]);
        let mode = ForwardMode::from_wire(mode_raw)
            .ok_or_else(|| shape_error(kind, format!("invalid forward mode {mode_raw}")))?;
        match HeaderGroup::from_wire(group_raw) {
            Some(group) => rules.push((group, mode)),
            None => debug!(group = group_raw, "skipping unknown header group"),
        }
    }
    Ok(rules)
}

fn apply_forward_rules(
    settings: &mut HeaderForwardSettings,
    rules: Vec<(HeaderGroup, ForwardMode)>,
) {
    for (group, mode) in rules {
        settings.set(group, mode);
    }
}
