//! Stable status codes carried in reply payloads.

use std::fmt;

/// Outcome of a request, as observed by clients.
///
/// Codes are part of the protocol contract and must remain stable. They are
/// positive and therefore distinct from negated system error numbers, which
/// the client library reserves for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    /// The key exists, but its value is not of the requested type.
    TypeMismatch,
    /// Attempt to write a differently-typed value over a non-null property.
    TypeChangeDenied,
    /// No policy rule permits the caller on this key.
    AccessDenied,
    /// Key does not exist in the store.
    NotFound,
    /// The property exists with type null; distinct from `NotFound`.
    NullValue,
    /// Recognized endpoint for an operation this daemon does not serve.
    NotSupported,
    /// The payload could not be decoded, or a required field was missing.
    MalformedRequest,
    /// Backing-store failure; the caller may retry.
    StoreError,
    /// Caller passed a null key or zero-length buffer.
    InvalidArguments,
}

impl Status {
    /// Returns the wire code for this status.
    pub fn code(&self) -> u64 {
        match self {
            Status::Success => 0,
            Status::TypeMismatch => 1,
            Status::TypeChangeDenied => 2,
            Status::AccessDenied => 3,
            Status::NotFound => 4,
            Status::NullValue => 5,
            Status::NotSupported => 6,
            Status::MalformedRequest => 7,
            Status::StoreError => 8,
            Status::InvalidArguments => 9,
        }
    }

    /// Looks up a status by its wire code.
    pub fn from_code(code: u64) -> Option<Status> {
        match code {
            0 => Some(Status::Success),
            1 => Some(Status::TypeMismatch),
            2 => Some(Status::TypeChangeDenied),
            3 => Some(Status::AccessDenied),
            4 => Some(Status::NotFound),
            5 => Some(Status::NullValue),
            6 => Some(Status::NotSupported),
            7 => Some(Status::MalformedRequest),
            8 => Some(Status::StoreError),
            9 => Some(Status::InvalidArguments),
            _ => None,
        }
    }

    /// Returns whether the failed request is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Status::StoreError)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Success => "success",
            Status::TypeMismatch => "type mismatch",
            Status::TypeChangeDenied => "type change denied",
            Status::AccessDenied => "access denied",
            Status::NotFound => "key not found",
            Status::NullValue => "value is null",
            Status::NotSupported => "not supported",
            Status::MalformedRequest => "malformed request",
            Status::StoreError => "store error",
            Status::InvalidArguments => "invalid arguments",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in 0..10 {
            let status = Status::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(Status::from_code(10), None);
        assert_eq!(Status::from_code(u64::MAX), None);
    }

    #[test]
    fn test_retryable() {
        assert!(Status::StoreError.is_retryable());
        assert!(!Status::AccessDenied.is_retryable());
        assert!(!Status::TypeChangeDenied.is_retryable());
    }
}
