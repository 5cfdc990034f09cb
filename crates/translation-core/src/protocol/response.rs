//! The assembled translation decision.
//!
//! A [`Response`] is what the edge proxy acts on: where to send the request,
//! how to rewrite it, which headers cross the proxy, per-view overrides, and
//! an optional widget/container tree for the page processor.  Instances are
//! produced exclusively by [`crate::protocol::assembler::ResponseAssembler`]
//! and are immutable once returned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Header forwarding ─────────────────────────────────────────────────────────

/// What happens to a header (or header group) crossing the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardMode {
    /// Drop the header.
    Suppress,
    /// Pass the header through unchanged.
    Forward,
    /// Rewrite the header while passing it (e.g. `Via`, `X-Forwarded-For`).
    Mangle,
    /// Forward in both directions.
    Both,
}

impl ForwardMode {
    /// Decodes a wire mode value (0–3).
    pub fn from_wire(value: i16) -> Option<Self> {
        match value {
            0 => Some(ForwardMode::Suppress),
            1 => Some(ForwardMode::Forward),
            2 => Some(ForwardMode::Mangle),
            3 => Some(ForwardMode::Both),
            _ => None,
        }
    }
}

/// Classification of headers for group-level forwarding rules.
///
/// The wire encodes groups as signed 16-bit values, with −1 meaning "all
/// groups": the wildcard that sets a default rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeaderGroup {
    /// Wildcard: applies to every group not given a specific rule.
    All,
    Identity,
    Capabilities,
    Cookie,
    Other,
    Forward,
    Cors,
    Secure,
    Transformation,
}

impl HeaderGroup {
    /// Decodes a wire group value (−1, 0–7).
    pub fn from_wire(value: i16) -> Option<Self> {
        match value {
            -1 => Some(HeaderGroup::All),
            0 => Some(HeaderGroup::Identity),
            1 => Some(HeaderGroup::Capabilities),
            2 => Some(HeaderGroup::Cookie),
            3 => Some(HeaderGroup::Other),
            4 => Some(HeaderGroup::Forward),
            5 => Some(HeaderGroup::Cors),
            6 => Some(HeaderGroup::Secure),
            7 => Some(HeaderGroup::Transformation),
            _ => None,
        }
    }
}

/// Group-level forwarding rules for one direction (request or response
/// headers).  The wildcard sets the default; a specific group rule wins over
/// it regardless of packet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderForwardSettings {
    default: Option<ForwardMode>,
    groups: BTreeMap<HeaderGroup, ForwardMode>,
}

impl HeaderForwardSettings {
    /// Records one (group, mode) rule from the wire.
    pub fn set(&mut self, group: HeaderGroup, mode: ForwardMode) {
        match group {
            HeaderGroup::All => self.default = Some(mode),
            specific => {
                self.groups.insert(specific, mode);
            }
        }
    }

    /// Effective mode for a group: the specific rule if present, else the
    /// wildcard default.
    pub fn mode_for(&self, group: HeaderGroup) -> Option<ForwardMode> {
        self.groups.get(&group).copied().or(self.default)
    }

    /// `true` if no rule of either kind has been set.
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.groups.is_empty()
    }
}

/// Per-header-name rule attached to a view by `Header` packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub mode: ForwardMode,
    /// Header value to emit, if the packet carried one.
    pub value: Option<String>,
    /// Value contains capture references to be expanded by the caller.
    pub expand: bool,
}

// ── Addresses ─────────────────────────────────────────────────────────────────

/// A static file (or directory) to serve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAddress {
    pub path: String,
    /// Path template with capture references, expanded by the caller.
    pub expand_path: Option<String>,
    pub content_type: Option<String>,
    pub document_root: Option<String>,
    /// Helper binary that opens the file on our behalf.
    pub delegate: Option<String>,
}

impl FileAddress {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// An upstream HTTP (or AJP) server, addressed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpAddress {
    pub url: String,
}

impl HttpAddress {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// An executable backend: CGI, FastCGI, WAS, or a filter pipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgiAddress {
    pub path: String,
    /// Command-line arguments, in `Append` order.
    pub args: Vec<CgiArg>,
    pub interpreter: Option<String>,
    pub action: Option<String>,
    pub script_name: Option<String>,
    pub path_info: Option<String>,
    pub query_string: Option<String>,
    pub document_root: Option<String>,
}

impl CgiAddress {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// One appended argument; `expand` marks capture references for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgiArg {
    pub value: String,
    pub expand: bool,
}

/// A file on an NFS export, assembled from `NfsServer` + `NfsExport`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfsAddress {
    pub server: String,
    pub export: String,
}

/// A local-HTTP backend: a spawned process speaking HTTP over a socket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LhttpAddress {
    pub path: String,
    pub uri: Option<String>,
    pub host: Option<String>,
    pub concurrency: Option<u16>,
}

impl LhttpAddress {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Where the request goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceAddress {
    /// Serve a local file.
    Path(FileAddress),
    /// Proxy to an upstream HTTP server.
    Http(HttpAddress),
    /// Proxy via the AJP protocol.
    Ajp(HttpAddress),
    /// Run a CGI program.
    Cgi(CgiAddress),
    /// Talk to a FastCGI backend.
    Fastcgi(CgiAddress),
    /// Talk to a WAS backend.
    Was(CgiAddress),
    /// Pipe the response body through a program.
    Pipe(CgiAddress),
    /// Serve from an NFS export.
    Nfs(NfsAddress),
    /// Spawn a local HTTP server process.
    Lhttp(LhttpAddress),
}

impl ResourceAddress {
    /// Mutable access to the executable (CGI-family) payload, if this
    /// address has one.
    pub(crate) fn as_cgi_mut(&mut self) -> Option<&mut CgiAddress> {
        match self {
            ResourceAddress::Cgi(cgi)
            | ResourceAddress::Fastcgi(cgi)
            | ResourceAddress::Was(cgi)
            | ResourceAddress::Pipe(cgi) => Some(cgi),
            _ => None,
        }
    }
}

// ── Views and transformations ─────────────────────────────────────────────────

/// A response-body transformation attached to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transformation {
    /// Run the HTML processor (widget expansion).
    Process,
    /// Run the CSS processor.
    ProcessCss { prefix_class: Option<String> },
    /// Run the plain-text processor.
    ProcessText,
    /// Pipe the body through another resource.  The address is set by the
    /// first address packet following the `Filter` packet.
    Filter { address: Option<ResourceAddress> },
}

/// A named scope overriding parts of the decision for one rendering variant.
///
/// The first view of every response is the unnamed default; view order is
/// insertion order and is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// `None` only for the default view.
    pub name: Option<String>,
    /// Address override for this view, if any.
    pub address: Option<ResourceAddress>,
    pub transformations: Vec<Transformation>,
    /// Per-header-name rules set by `Header` packets in this view's scope.
    pub headers: BTreeMap<String, HeaderRule>,
}

impl View {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// `true` for the implicitly created unnamed view.
    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }
}

// ── Pairs and widgets ─────────────────────────────────────────────────────────

/// An ordered name/value entry (environment variable or request parameter).
///
/// Duplicate names are kept: the list is additive, never last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub name: String,
    pub value: String,
    /// Value contains capture references to be expanded by the caller.
    pub expand: bool,
}

/// A node of the widget/container tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetNode {
    /// Widget type name from the `WidgetInfo` packet.
    pub type_name: String,
    /// Group label applied when the container was closed, if any.
    pub group: Option<String>,
    /// Groups whose members this widget may contain.
    pub allowed_groups: Vec<String>,
    /// The widget may embed itself recursively.
    pub self_container: bool,
    /// The widget is addressed directly, bypassing the focus chain.
    pub direct_addressing: bool,
    pub children: Vec<WidgetNode>,
}

impl WidgetNode {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// The fully assembled translation decision.
///
/// Scalar fields are last-write-wins on the wire; the lists (`pairs`, `env`,
/// `request_headers`, `views`, widget children) are additive and preserve
/// packet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version byte from the `Begin` packet, 0 if absent.
    pub protocol_version: u8,

    /// HTTP status to send, if the decision carries one.
    pub status: Option<u16>,
    /// Where to route the request.  `None` with a status set means a
    /// terminal, address-less decision.
    pub address: Option<ResourceAddress>,

    pub redirect: Option<String>,
    pub bounce: Option<String>,
    pub base: Option<String>,
    pub easy_base: bool,
    pub unsafe_base: bool,
    pub auto_base: bool,
    pub site: Option<String>,
    pub document_root: Option<String>,
    pub content_type: Option<String>,
    pub scheme: Option<String>,
    pub uri: Option<String>,
    pub test_path: Option<String>,

    pub untrusted: Option<String>,
    pub untrusted_prefix: Option<String>,
    pub untrusted_site_suffix: Option<String>,

    /// Opaque session token to attach to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Vec<u8>>,
    pub discard_session: bool,
    pub secure_cookie: bool,
    pub stateful: bool,
    pub transparent: bool,
    pub user: Option<String>,
    pub realm: Option<String>,
    pub language: Option<String>,
    pub www_authenticate: Option<String>,
    pub authentication_info: Option<String>,
    pub cookie_domain: Option<String>,
    pub cookie_host: Option<String>,
    pub cookie_path: Option<String>,

    /// Cache lifetime in seconds.
    pub max_age: Option<u32>,
    pub expires_relative: Option<u32>,
    /// Wire codes of the request fields this decision varies on.
    pub vary: Vec<u16>,
    /// Wire codes of the cache entries this decision invalidates.
    pub invalidate: Vec<u16>,
    /// Wire codes of additional request fields the peer wants resent.
    pub want: Vec<u16>,

    pub regex: Option<String>,
    pub inverse_regex: Option<String>,
    pub regex_tail: bool,
    pub regex_unescape: bool,
    pub redirect_query_string: bool,

    /// Ordered request parameters (`Pair` packets).
    pub pairs: Vec<Pair>,
    /// Ordered environment variables (`Setenv` packets).
    pub env: Vec<Pair>,
    /// Headers to add to the forwarded request (`RequestHeader` packets).
    pub request_headers: Vec<Pair>,

    pub request_header_forward: HeaderForwardSettings,
    pub response_header_forward: HeaderForwardSettings,

    /// All views, default (unnamed) first, in packet order.
    pub views: Vec<View>,

    /// Top-level widgets, in packet order; children nest via containers.
    pub widgets: Vec<WidgetNode>,
}

impl Response {
    /// The implicitly created default view.
    ///
    /// Every assembled response has at least one view, so this never panics
    /// on assembler output.
    pub fn default_view(&self) -> &View {
        &self.views[0]
    }

    /// Looks up a named view.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name.as_deref() == Some(name))
    }

    /// A terminal decision: a status with no routing address.  The caller
    /// sends the status directly instead of dispatching to a backend.
    pub fn is_terminal(&self) -> bool {
        self.status.is_some() && self.address.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_group_rule_overrides_wildcard() {
        let mut settings = HeaderForwardSettings::default();
        settings.set(HeaderGroup::All, ForwardMode::Suppress);
        settings.set(HeaderGroup::Cookie, ForwardMode::Forward);

        assert_eq!(settings.mode_for(HeaderGroup::Cookie), Some(ForwardMode::Forward));
        assert_eq!(settings.mode_for(HeaderGroup::Cors), Some(ForwardMode::Suppress));
    }

    #[test]
    fn test_wildcard_applies_regardless_of_order() {
        let mut settings = HeaderForwardSettings::default();
        settings.set(HeaderGroup::Cookie, ForwardMode::Mangle);
        settings.set(HeaderGroup::All, ForwardMode::Suppress);

        // A later wildcard does not clobber the earlier specific rule.
        assert_eq!(settings.mode_for(HeaderGroup::Cookie), Some(ForwardMode::Mangle));
        assert_eq!(settings.mode_for(HeaderGroup::Identity), Some(ForwardMode::Suppress));
    }

    #[test]
    fn test_forward_mode_from_wire_bounds() {
        assert_eq!(ForwardMode::from_wire(1), Some(ForwardMode::Forward));
        assert_eq!(ForwardMode::from_wire(4), None);
        assert_eq!(ForwardMode::from_wire(-1), None);
    }

    #[test]
    fn test_header_group_wildcard_is_minus_one() {
        assert_eq!(HeaderGroup::from_wire(-1), Some(HeaderGroup::All));
        assert_eq!(HeaderGroup::from_wire(8), None);
    }

    #[test]
    fn test_terminal_decision_requires_status_without_address() {
        let mut response = Response::default();
        assert!(!response.is_terminal());
        response.status = Some(404);
        assert!(response.is_terminal());
        response.address = Some(ResourceAddress::Path(FileAddress::new("/404.html")));
        assert!(!response.is_terminal());
    }
}
