//! # confd-server
//!
//! The daemon side of confd: TOML configuration loading, the identity-based
//! access policy, and the Unix-socket RPC server that frames requests,
//! dispatches them against the property store, and writes replies back in
//! request order.

pub mod access;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;
pub mod watchdog;

pub use access::AccessPolicy;
pub use config::{Config, ConfigError};
pub use error::ServerError;
pub use handler::RequestHandler;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{PeerCredentials, Session};
pub use watchdog::Watchdog;
