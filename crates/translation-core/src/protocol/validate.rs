//! Per-kind payload-shape rules.
//!
//! This is the boundary where untrusted wire bytes are checked before the
//! assembler interprets them.  Each packet kind has exactly one expected
//! payload shape; the wire codec consults the table on decode and the request
//! builder on encode, so a malformed payload is rejected on whichever side of
//! the connection produced it.

use crate::protocol::error::ProtocolError;
use crate::protocol::registry::PacketKind;

/// Expected payload shape for a packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// No payload bytes allowed.
    Empty,
    /// Valid UTF-8, no embedded NUL bytes.
    Utf8Text,
    /// Exactly `width` bytes of binary data.
    FixedBinary(u16),
    /// Anything, including empty.  Kind-specific content rules, if any, are
    /// enforced by the consumer (assembler or builder).
    Opaque,
}

/// Returns the payload shape expected for `kind`.
///
/// [`PacketKind::Unknown`] is always [`PayloadShape::Opaque`]: a field we do
/// not recognize must pass through unjudged.
pub fn shape_of(kind: PacketKind) -> PayloadShape {
    use PacketKind::*;
    match kind {
        // Fixed-width numeric fields.
        Status | Concurrency => PayloadShape::FixedBinary(2),
        MaxAge | ExpiresRelative => PayloadShape::FixedBinary(4),

        // Bare flags.
        End | Process | ProcessCss | ProcessText | ProcessStyle | Container | SelfContainer
        | DirectAddressing | FocusWidget | Stateful | Sticky | Transparent | DiscardSession
        | SecureCookie | Filter | Filter4xx | Previous | AutoBase | EasyBase | UnsafeBase
        | WantFullUri | Deflated | Gzipped | AutoGzipped | AutoGzip | AutoDeflate
        | DumpHeaders | AnchorAbsolute | JailCgi | RegexTail | RegexUnescape
        | RegexOnHostUri | RegexOnUserUri | RedirectQueryString | NonBlocking | Login
        | UserNamespace | NetworkNamespace | PidNamespace | UtsNamespace | IpcNamespace
        | MountProc => PayloadShape::Empty,

        // Textual fields.
        Host | Uri | ExpandUri | Path | ExpandPath | ContentType | Http | Proxy | Redirect
        | ExpandRedirect | Param | User | Language | RemoteHost | PathInfo | ExpandPathInfo
        | Site | ExpandSite | Cgi | DocumentRoot | ExpandDocumentRoot | WidgetType
        | AddressString | Interpreter | Action | ScriptName | ExpandScriptName | Ajp
        | Domain | Fastcgi | View | UserAgent | UaClass | QueryString | Pipe | Base
        | Delegate | LocalAddressString | Append | ExpandAppend | Scheme | Pair
        | ExpandPair | Untrusted | UntrustedPrefix | UntrustedSiteSuffix | Bounce | Args
        | WwwAuthenticate | AuthenticationInfo | Authorization | Header | ExpandHeader
        | RequestHeader | ExpandRequestHeader | Was | Home | ExpandHome | Realm
        | CookieHost | ExpandCookieHost | CookieDomain | CookiePath | PrefixCssClass
        | PrefixXmlId | Regex | InverseRegex | LocalUri | GroupContainer | WidgetGroup
        | WidgetInfo | NfsServer | NfsExport | LhttpPath | LhttpUri | ExpandLhttpUri
        | LhttpHost | BindMount | ExpandBindMount | PivotRoot | MountHome | StderrPath
        | ExpandStderrPath | Setenv | ExpandSetenv | TestPath | ExpandTestPath
        | ProbeSuffix | AuthFile | ExpandAuthFile | ListenerTag | ReadFile
        | ExpandReadFile | SessionSite | Suffix | Rlimits => PayloadShape::Utf8Text,

        // Structured or free-form binary payloads, parsed by the consumer.
        Begin | Session | Address | Check | Want | Vary | Invalidate
        | RequestHeaderForward | ResponseHeaderForward | LocalAddress | ValidateMtime
        | Auth | AppendAuth | ExpandAppendAuth | UidGid | FileNotFound | DirectoryIndex
        | ContentTypeLookup | ProbePathSuffixes | Enotdir | InternalRedirect
        | ErrorDocument | MountTmpTmpfs | Password | Unknown(_) => PayloadShape::Opaque,
    }
}

/// Checks `payload` against the shape rule for `kind`.
///
/// # Errors
///
/// [`ProtocolError::PayloadShapeMismatch`] with a human-readable detail.
pub fn validate_payload(kind: PacketKind, payload: &[u8]) -> Result<(), ProtocolError> {
    match shape_of(kind) {
        PayloadShape::Empty => {
            if !payload.is_empty() {
                return Err(shape_error(
                    kind,
                    format!("expected empty payload, got {} bytes", payload.len()),
                ));
            }
        }
        PayloadShape::Utf8Text => {
            if std::str::from_utf8(payload).is_err() {
                return Err(shape_error(kind, "payload is not valid UTF-8".into()));
            }
            if payload.contains(&0) {
                return Err(shape_error(kind, "payload contains a NUL byte".into()));
            }
        }
        PayloadShape::FixedBinary(width) => {
            if payload.len() != width as usize {
                return Err(shape_error(
                    kind,
                    format!("expected exactly {width} bytes, got {}", payload.len()),
                ));
            }
        }
        PayloadShape::Opaque => {}
    }
    Ok(())
}

pub(crate) fn shape_error(kind: PacketKind, detail: String) -> ProtocolError {
    ProtocolError::PayloadShapeMismatch { kind, detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_kind_rejects_payload_bytes() {
        assert!(validate_payload(PacketKind::End, &[]).is_ok());
        assert!(matches!(
            validate_payload(PacketKind::End, b"x"),
            Err(ProtocolError::PayloadShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_text_kind_rejects_invalid_utf8() {
        assert!(validate_payload(PacketKind::Host, b"example.com").is_ok());
        assert!(matches!(
            validate_payload(PacketKind::Host, &[0xFF, 0xFE]),
            Err(ProtocolError::PayloadShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_text_kind_rejects_embedded_nul() {
        assert!(matches!(
            validate_payload(PacketKind::Path, b"/srv\0/www"),
            Err(ProtocolError::PayloadShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_fixed_width_kind_requires_exact_length() {
        assert!(validate_payload(PacketKind::Status, &[200, 0]).is_ok());
        for bad in [&[][..], &[1][..], &[1, 2, 3][..]] {
            assert!(matches!(
                validate_payload(PacketKind::Status, bad),
                Err(ProtocolError::PayloadShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_kind_is_always_opaque() {
        assert_eq!(shape_of(PacketKind::Unknown(4242)), PayloadShape::Opaque);
        assert!(validate_payload(PacketKind::Unknown(4242), &[0xFF, 0x00, 0xFF]).is_ok());
    }

    #[test]
    fn test_begin_tolerates_version_byte() {
        // Begin may carry a single protocol-version byte, or nothing.
        assert!(validate_payload(PacketKind::Begin, &[]).is_ok());
        assert!(validate_payload(PacketKind::Begin, &[1]).is_ok());
    }
}
