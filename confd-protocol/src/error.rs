//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing messages or coding payloads.
///
/// Header-level errors (`UnsupportedVersion`, `InvalidLength`, `Oversized`)
/// are framing violations: the receiver discards the packet and closes the
/// connection. Everything else is a payload defect and maps to the
/// `MalformedRequest` status in a reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported protocol version {0:#06x}")]
    UnsupportedVersion(u16),

    #[error("invalid frame length {0} (shorter than header)")]
    InvalidLength(u16),

    #[error("payload too large: {0} bytes")]
    Oversized(usize),

    #[error("truncated payload item")]
    Truncated,

    #[error("indefinite-length items are not supported")]
    IndefiniteLength,

    #[error("reserved length encoding")]
    ReservedLength,

    #[error("negative integers are not supported")]
    NegativeInteger,

    #[error("unsupported payload item (major type {0})")]
    UnsupportedType(u8),

    #[error("invalid simple value {0}")]
    InvalidSimple(u8),

    #[error("payload root must be a map")]
    NotAMap,

    #[error("map keys must be strings")]
    NonStringKey,

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("unexpected trailing bytes after payload")]
    TrailingData,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid type for field `{field}` (expected {expected})")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },
}

impl ProtocolError {
    /// Returns whether this error is a header framing violation, which
    /// requires tearing down the connection rather than replying.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnsupportedVersion(_)
                | ProtocolError::InvalidLength(_)
                | ProtocolError::Oversized(_)
        )
    }
}
