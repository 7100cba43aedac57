//! Client error types.

use confd_protocol::{ProtocolError, Status};
use thiserror::Error;

/// Client errors. Transport failures are separate variants; failures the
/// daemon reported (or that typed accessors derived from the reply) carry
/// the positive status code.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by daemon")]
    ConnectionClosed,

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),

    #[error("request failed: {0}")]
    Status(Status),
}

impl ClientError {
    /// The status code, if this error is one the daemon (or a typed
    /// accessor) reported.
    pub fn status(&self) -> Option<Status> {
        match self {
            ClientError::Status(status) => Some(*status),
            _ => None,
        }
    }
}
