//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header framing violation; the offending connection is closed
    /// without a reply.
    #[error("framing violation: {0}")]
    Framing(confd_protocol::ProtocolError),

    /// Failure encoding an outbound reply.
    #[error("protocol error: {0}")]
    Protocol(confd_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] confd_store::StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
