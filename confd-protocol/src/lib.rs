//! # confd-protocol
//!
//! Wire protocol implementation for the confd configuration daemon.
//!
//! This crate provides:
//! - The fixed 8-byte packed message header used on the local domain socket
//! - A self-describing binary payload codec (definite-length map encoding)
//! - The property value model shared by the daemon and its clients
//! - Stable status codes carried in replies

pub mod error;
pub mod frame;
pub mod payload;
pub mod status;
pub mod value;

pub use error::ProtocolError;
pub use frame::{Endpoint, Frame, FrameFlags, HEADER_SIZE};
pub use payload::{EncodeOptions, PayloadMap};
pub use status::Status;
pub use value::Value;

/// Protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: u16 = 0x0100;

/// Default path of the daemon's listening socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/confd/rpc.sock";

/// Maximum payload size; the header length field is 16 bits and counts the
/// header itself.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - HEADER_SIZE;

/// Well-known payload field names.
pub mod fields {
    /// Property key name (requests and replies).
    pub const KEY: &str = "key";
    /// Property value (update requests, successful query replies).
    pub const VALUE: &str = "value";
    /// Query flag: encode real replies at 32-bit precision.
    pub const FORCE_FLOAT: &str = "forceFloat";
    /// Query reply status flag.
    pub const FOUND: &str = "found";
    /// Update reply status flag.
    pub const UPDATED: &str = "updated";
    /// Status code, present in replies whose outcome is not success.
    pub const STATUS: &str = "status";
}
