//! # confd-client
//!
//! Client library for the confd configuration daemon. Wraps one connection
//! to the daemon's local socket and exposes typed getters and setters over
//! the framed wire protocol.

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;

// Re-exported so callers can name values and status codes without a direct
// protocol dependency.
pub use confd_protocol::{Status, Value};
