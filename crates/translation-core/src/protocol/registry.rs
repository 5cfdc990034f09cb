//! Versioned packet-code registry.
//!
//! The translation protocol identifies every field by a 16-bit wire code.
//! Codes have been added (and occasionally renumbered) over the life of the
//! protocol, so the mapping between codes and semantic packet kinds is not
//! global: it belongs to a *generation*, represented here as an immutable
//! [`CodeTable`].  A process may hold several tables at once (one per peer
//! deployment) and passes the right one into every encode/decode call.
//!
//! Two rules keep old and new peers interoperable:
//!
//! - Decoding an unrecognized code is **not** an error.  It yields
//!   [`PacketKind::Unknown`], which carries the raw code and passes through
//!   the rest of the pipeline as an ignorable no-op.  Codes are added over
//!   time without renumbering, so an older decoder must tolerate newer
//!   fields.
//! - A retired code may live on as a decode-only *alias* of the canonical
//!   kind that replaced it.  Encoders always emit the canonical code; only
//!   decoders accept the alias.
//!
//! The two shipped generations differ at two points: code 8 carried the
//! [`PacketKind::Proxy`] upstream field in the first generation before the
//! slot was reused for [`PacketKind::Http`], and `JailCgi` moved from code
//! 25 to 26 (the current table keeps 25 as a decode-only alias, which is why
//! the current numbering has a hole there).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protocol::error::ProtocolError;

/// Semantic packet kind, independent of any particular wire code.
///
/// One variant per canonical field of the current protocol generation, plus
/// [`PacketKind::Proxy`] (a field that only exists in the legacy generation)
/// and the [`PacketKind::Unknown`] catch-all for unrecognized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Begin,
    End,
    Host,
    Uri,
    Status,
    Path,
    ContentType,
    Http,
    Redirect,
    Filter,
    Process,
    Session,
    Param,
    User,
    Language,
    RemoteHost,
    PathInfo,
    Site,
    Cgi,
    DocumentRoot,
    WidgetType,
    Container,
    Address,
    AddressString,
    JailCgi,
    Interpreter,
    Action,
    ScriptName,
    Ajp,
    Domain,
    Stateful,
    Fastcgi,
    View,
    UserAgent,
    MaxAge,
    Vary,
    QueryString,
    Pipe,
    Base,
    Delegate,
    Invalidate,
    LocalAddress,
    LocalAddressString,
    Append,
    DiscardSession,
    Scheme,
    RequestHeaderForward,
    ResponseHeaderForward,
    Deflated,
    Gzipped,
    Pair,
    Untrusted,
    Bounce,
    Args,
    WwwAuthenticate,
    AuthenticationInfo,
    Authorization,
    Header,
    UntrustedPrefix,
    SecureCookie,
    Filter4xx,
    ErrorDocument,
    Check,
    Previous,
    Was,
    Home,
    Realm,
    UntrustedSiteSuffix,
    Transparent,
    Sticky,
    DumpHeaders,
    CookieHost,
    ProcessCss,
    PrefixCssClass,
    FocusWidget,
    AnchorAbsolute,
    PrefixXmlId,
    Regex,
    InverseRegex,
    ProcessText,
    WidgetInfo,
    ExpandPathInfo,
    ExpandPath,
    CookieDomain,
    LocalUri,
    AutoBase,
    UaClass,
    ProcessStyle,
    DirectAddressing,
    SelfContainer,
    GroupContainer,
    WidgetGroup,
    ValidateMtime,
    NfsServer,
    NfsExport,
    LhttpPath,
    LhttpUri,
    ExpandLhttpUri,
    LhttpHost,
    Concurrency,
    WantFullUri,
    UserNamespace,
    NetworkNamespace,
    ExpandAppend,
    ExpandPair,
    PidNamespace,
    PivotRoot,
    MountProc,
    MountHome,
    MountTmpTmpfs,
    UtsNamespace,
    BindMount,
    Rlimits,
    Want,
    UnsafeBase,
    EasyBase,
    RegexTail,
    RegexUnescape,
    FileNotFound,
    ContentTypeLookup,
    Suffix,
    DirectoryIndex,
    ExpiresRelative,
    ExpandRedirect,
    ExpandScriptName,
    TestPath,
    ExpandTestPath,
    RedirectQueryString,
    Enotdir,
    StderrPath,
    CookiePath,
    Auth,
    Setenv,
    ExpandSetenv,
    ExpandUri,
    ExpandSite,
    RequestHeader,
    ExpandRequestHeader,
    AutoGzipped,
    ExpandDocumentRoot,
    ProbePathSuffixes,
    ProbeSuffix,
    AuthFile,
    ExpandAuthFile,
    AppendAuth,
    ExpandAppendAuth,
    ListenerTag,
    ExpandCookieHost,
    ExpandBindMount,
    NonBlocking,
    ReadFile,
    ExpandReadFile,
    ExpandHeader,
    RegexOnHostUri,
    SessionSite,
    IpcNamespace,
    AutoDeflate,
    ExpandHome,
    ExpandStderrPath,
    RegexOnUserUri,
    AutoGzip,
    InternalRedirect,
    Login,
    UidGid,
    Password,

    /// Legacy-generation upstream field ("send this request over HTTP to the
    /// given URL").  Occupied code 8 before the slot was reused by
    /// [`PacketKind::Http`]; only the legacy table can encode it.
    Proxy,

    /// A code the selected table does not recognize.  Carries the raw wire
    /// code so the packet can be passed through or re-encoded verbatim.
    Unknown(u16),
}

// ── Static generation tables ──────────────────────────────────────────────────

/// Current generation.  Code 25 is intentionally absent (see `CURRENT_ALIASES`).
const CURRENT_CODES: &[(u16, PacketKind)] = &[
    (1, PacketKind::Begin),
    (2, PacketKind::End),
    (3, PacketKind::Host),
    (4, PacketKind::Uri),
    (5, PacketKind::Status),
    (6, PacketKind::Path),
    (7, PacketKind::ContentType),
    (8, PacketKind::Http),
    (9, PacketKind::Redirect),
    (10, PacketKind::Filter),
    (11, PacketKind::Process),
    (12, PacketKind::Session),
    (13, PacketKind::Param),
    (14, PacketKind::User),
    (15, PacketKind::Language),
    (16, PacketKind::RemoteHost),
    (17, PacketKind::PathInfo),
    (18, PacketKind::Site),
    (19, PacketKind::Cgi),
    (20, PacketKind::DocumentRoot),
    (21, PacketKind::WidgetType),
    (22, PacketKind::Container),
    (23, PacketKind::Address),
    (24, PacketKind::AddressString),
    (26, PacketKind::JailCgi),
    (27, PacketKind::Interpreter),
    (28, PacketKind::Action),
    (29, PacketKind::ScriptName),
    (30, PacketKind::Ajp),
    (31, PacketKind::Domain),
    (32, PacketKind::Stateful),
    (33, PacketKind::Fastcgi),
    (34, PacketKind::View),
    (35, PacketKind::UserAgent),
    (36, PacketKind::MaxAge),
    (37, PacketKind::Vary),
    (38, PacketKind::QueryString),
    (39, PacketKind::Pipe),
    (40, PacketKind::Base),
    (41, PacketKind::Delegate),
    (42, PacketKind::Invalidate),
    (43, PacketKind::LocalAddress),
    (44, PacketKind::LocalAddressString),
    (45, PacketKind::Append),
    (46, PacketKind::DiscardSession),
    (47, PacketKind::Scheme),
    (48, PacketKind::RequestHeaderForward),
    (49, PacketKind::ResponseHeaderForward),
    (50, PacketKind::Deflated),
    (51, PacketKind::Gzipped),
    (52, PacketKind::Pair),
    (53, PacketKind::Untrusted),
    (54, PacketKind::Bounce),
    (55, PacketKind::Args),
    (56, PacketKind::WwwAuthenticate),
    (57, PacketKind::AuthenticationInfo),
    (58, PacketKind::Authorization),
    (59, PacketKind::Header),
    (60, PacketKind::UntrustedPrefix),
    (61, PacketKind::SecureCookie),
    (62, PacketKind::Filter4xx),
    (63, PacketKind::ErrorDocument),
    (64, PacketKind::Check),
    (65, PacketKind::Previous),
    (66, PacketKind::Was),
    (67, PacketKind::Home),
    (68, PacketKind::Realm),
    (69, PacketKind::UntrustedSiteSuffix),
    (70, PacketKind::Transparent),
    (71, PacketKind::Sticky),
    (72, PacketKind::DumpHeaders),
    (73, PacketKind::CookieHost),
    (74, PacketKind::ProcessCss),
    (75, PacketKind::PrefixCssClass),
    (76, PacketKind::FocusWidget),
    (77, PacketKind::AnchorAbsolute),
    (78, PacketKind::PrefixXmlId),
    (79, PacketKind::Regex),
    (80, PacketKind::InverseRegex),
    (81, PacketKind::ProcessText),
    (82, PacketKind::WidgetInfo),
    (83, PacketKind::ExpandPathInfo),
    (84, PacketKind::ExpandPath),
    (85, PacketKind::CookieDomain),
    (86, PacketKind::LocalUri),
    (87, PacketKind::AutoBase),
    (88, PacketKind::UaClass),
    (89, PacketKind::ProcessStyle),
    (90, PacketKind::DirectAddressing),
    (91, PacketKind::SelfContainer),
    (92, PacketKind::GroupContainer),
    (93, PacketKind::WidgetGroup),
    (94, PacketKind::ValidateMtime),
    (95, PacketKind::NfsServer),
    (96, PacketKind::NfsExport),
    (97, PacketKind::LhttpPath),
    (98, PacketKind::LhttpUri),
    (99, PacketKind::ExpandLhttpUri),
    (100, PacketKind::LhttpHost),
    (101, PacketKind::Concurrency),
    (102, PacketKind::WantFullUri),
    (103, PacketKind::UserNamespace),
    (104, PacketKind::NetworkNamespace),
    (105, PacketKind::ExpandAppend),
    (106, PacketKind::ExpandPair),
    (107, PacketKind::PidNamespace),
    (108, PacketKind::PivotRoot),
    (109, PacketKind::MountProc),
    (110, PacketKind::MountHome),
    (111, PacketKind::MountTmpTmpfs),
    (112, PacketKind::UtsNamespace),
    (113, PacketKind::BindMount),
    (114, PacketKind::Rlimits),
    (115, PacketKind::Want),
    (116, PacketKind::UnsafeBase),
    (117, PacketKind::EasyBase),
    (118, PacketKind::RegexTail),
    (119, PacketKind::RegexUnescape),
    (120, PacketKind::FileNotFound),
    (121, PacketKind::ContentTypeLookup),
    (122, PacketKind::Suffix),
    (123, PacketKind::DirectoryIndex),
    (124, PacketKind::ExpiresRelative),
    (125, PacketKind::ExpandRedirect),
    (126, PacketKind::ExpandScriptName),
    (127, PacketKind::TestPath),
    (128, PacketKind::ExpandTestPath),
    (129, PacketKind::RedirectQueryString),
    (130, PacketKind::Enotdir),
    (131, PacketKind::StderrPath),
    (132, PacketKind::CookiePath),
    (133, PacketKind::Auth),
    (134, PacketKind::Setenv),
    (135, PacketKind::ExpandSetenv),
    (136, PacketKind::ExpandUri),
    (137, PacketKind::ExpandSite),
    (138, PacketKind::RequestHeader),
    (139, PacketKind::ExpandRequestHeader),
    (140, PacketKind::AutoGzipped),
    (141, PacketKind::ExpandDocumentRoot),
    (142, PacketKind::ProbePathSuffixes),
    (143, PacketKind::ProbeSuffix),
    (144, PacketKind::AuthFile),
    (145, PacketKind::ExpandAuthFile),
    (146, PacketKind::AppendAuth),
    (147, PacketKind::ExpandAppendAuth),
    (148, PacketKind::ListenerTag),
    (149, PacketKind::ExpandCookieHost),
    (150, PacketKind::ExpandBindMount),
    (151, PacketKind::NonBlocking),
    (152, PacketKind::ReadFile),
    (153, PacketKind::ExpandReadFile),
    (154, PacketKind::ExpandHeader),
    (155, PacketKind::RegexOnHostUri),
    (156, PacketKind::SessionSite),
    (157, PacketKind::IpcNamespace),
    (158, PacketKind::AutoDeflate),
    (159, PacketKind::ExpandHome),
    (160, PacketKind::ExpandStderrPath),
    (161, PacketKind::RegexOnUserUri),
    (162, PacketKind::AutoGzip),
    (163, PacketKind::InternalRedirect),
    (164, PacketKind::Login),
    (165, PacketKind::UidGid),
    (166, PacketKind::Password),
];

/// Decode-only aliases of the current generation: retired codes that still
/// resolve to the canonical kind that replaced them.
const CURRENT_ALIASES: &[(u16, PacketKind)] = &[(25, PacketKind::JailCgi)];

/// First generation: the original flat code block.
const LEGACY_CODES: &[(u16, PacketKind)] = &[
    (1, PacketKind::Begin),
    (2, PacketKind::End),
    (3, PacketKind::Host),
    (4, PacketKind::Uri),
    (5, PacketKind::Status),
    (6, PacketKind::Path),
    (7, PacketKind::ContentType),
    (8, PacketKind::Proxy),
    (9, PacketKind::Redirect),
    (10, PacketKind::Filter),
    (11, PacketKind::Process),
    (12, PacketKind::Session),
    (13, PacketKind::Param),
    (14, PacketKind::User),
    (15, PacketKind::Language),
    (16, PacketKind::RemoteHost),
    (17, PacketKind::PathInfo),
    (18, PacketKind::Site),
    (19, PacketKind::Cgi),
    (20, PacketKind::DocumentRoot),
    (21, PacketKind::WidgetType),
    (22, PacketKind::Container),
    (23, PacketKind::Address),
    (24, PacketKind::AddressString),
    (25, PacketKind::JailCgi),
];

// ── CodeTable ─────────────────────────────────────────────────────────────────

/// Immutable bidirectional mapping between wire codes and [`PacketKind`]s for
/// one protocol generation.
///
/// Construct the table(s) once at process start and share them by reference;
/// all lookups are read-only.
///
/// # Examples
///
/// ```rust
/// use translation_core::protocol::registry::{CodeTable, PacketKind};
///
/// let current = CodeTable::current();
/// let legacy = CodeTable::legacy();
///
/// // The same wire code means different things to different generations.
/// assert_eq!(current.decode_kind(8), PacketKind::Http);
/// assert_eq!(legacy.decode_kind(8), PacketKind::Proxy);
/// ```
#[derive(Debug)]
pub struct CodeTable {
    name: &'static str,
    by_code: HashMap<u16, PacketKind>,
    by_kind: HashMap<PacketKind, u16>,
    aliases: HashMap<u16, PacketKind>,
}

impl CodeTable {
    fn build(
        name: &'static str,
        codes: &[(u16, PacketKind)],
        aliases: &[(u16, PacketKind)],
    ) -> Self {
        let mut by_code = HashMap::with_capacity(codes.len());
        let mut by_kind = HashMap::with_capacity(codes.len());
        for &(code, kind) in codes {
            by_code.insert(code, kind);
            by_kind.insert(kind, code);
        }
        Self {
            name,
            by_code,
            by_kind,
            aliases: aliases.iter().copied().collect(),
        }
    }

    /// The current protocol generation.
    pub fn current() -> Self {
        Self::build("current", CURRENT_CODES, CURRENT_ALIASES)
    }

    /// The first protocol generation, still spoken by old peers.
    pub fn legacy() -> Self {
        Self::build("legacy", LEGACY_CODES, &[])
    }

    /// Table name, used in error messages and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolves a wire code to its packet kind.
    ///
    /// Primary entries win over aliases; codes known to neither map decode to
    /// [`PacketKind::Unknown`].  This never fails: unrecognized codes must
    /// pass through as forward-compatible no-ops.
    pub fn decode_kind(&self, code: u16) -> PacketKind {
        if let Some(&kind) = self.by_code.get(&code) {
            return kind;
        }
        if let Some(&kind) = self.aliases.get(&code) {
            return kind;
        }
        PacketKind::Unknown(code)
    }

    /// Resolves a packet kind to the wire code this generation assigns it.
    ///
    /// Aliases are never consulted: encoding always emits the canonical code,
    /// so an encoder can never regress to a retired numbering.
    /// [`PacketKind::Unknown`] encodes to its embedded code unchanged, which
    /// lets a relay re-emit fields it does not understand.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnsupportedInVersion`] if the kind has no code in
    /// this generation.
    pub fn encode_code(&self, kind: PacketKind) -> Result<u16, ProtocolError> {
        if let PacketKind::Unknown(code) = kind {
            return Ok(code);
        }
        self.by_kind
            .get(&kind)
            .copied()
            .ok_or(ProtocolError::UnsupportedInVersion {
                kind,
                table: self.name,
            })
    }

    /// Returns `true` if this generation assigns the kind a code.
    pub fn contains(&self, kind: PacketKind) -> bool {
        self.by_kind.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_table_has_no_duplicate_codes_or_kinds() {
        let mut codes = std::collections::HashSet::new();
        let mut kinds = std::collections::HashSet::new();
        for &(code, kind) in CURRENT_CODES {
            assert!(codes.insert(code), "duplicate code {code}");
            assert!(kinds.insert(kind), "duplicate kind {kind:?}");
        }
    }

    #[test]
    fn test_legacy_table_has_no_duplicate_codes_or_kinds() {
        let mut codes = std::collections::HashSet::new();
        let mut kinds = std::collections::HashSet::new();
        for &(code, kind) in LEGACY_CODES {
            assert!(codes.insert(code), "duplicate code {code}");
            assert!(kinds.insert(kind), "duplicate kind {kind:?}");
        }
    }

    #[test]
    fn test_code_8_depends_on_generation() {
        assert_eq!(CodeTable::current().decode_kind(8), PacketKind::Http);
        assert_eq!(CodeTable::legacy().decode_kind(8), PacketKind::Proxy);
    }

    #[test]
    fn test_alias_decodes_to_canonical_kind() {
        let current = CodeTable::current();
        assert_eq!(current.decode_kind(25), PacketKind::JailCgi);
        assert_eq!(current.decode_kind(26), PacketKind::JailCgi);
    }

    #[test]
    fn test_encode_never_emits_alias_code() {
        let current = CodeTable::current();
        assert_eq!(current.encode_code(PacketKind::JailCgi).unwrap(), 26);
    }

    #[test]
    fn test_legacy_only_kind_is_unsupported_in_current() {
        let current = CodeTable::current();
        assert!(matches!(
            current.encode_code(PacketKind::Proxy),
            Err(ProtocolError::UnsupportedInVersion { .. })
        ));
        assert_eq!(CodeTable::legacy().encode_code(PacketKind::Proxy).unwrap(), 8);
    }

    #[test]
    fn test_unknown_code_decodes_to_unknown_kind() {
        let current = CodeTable::current();
        assert_eq!(current.decode_kind(999), PacketKind::Unknown(999));
    }

    #[test]
    fn test_unknown_kind_encodes_to_embedded_code() {
        let current = CodeTable::current();
        assert_eq!(current.encode_code(PacketKind::Unknown(999)).unwrap(), 999);
    }

    #[test]
    fn test_round_trip_every_current_code() {
        let current = CodeTable::current();
        for &(code, kind) in CURRENT_CODES {
            assert_eq!(current.decode_kind(code), kind);
            assert_eq!(current.encode_code(kind).unwrap(), code);
        }
    }
}
