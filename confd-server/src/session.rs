//! Per-connection session bookkeeping.

use std::time::Instant;
use tokio::net::unix::UCred;

/// The peer identity attributed to a connection by the operating system,
/// captured once at accept.
#[derive(Debug, Clone, Copy)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: Option<i32>,
}

impl From<UCred> for PeerCredentials {
    fn from(cred: UCred) -> Self {
        Self {
            uid: cred.uid(),
            gid: cred.gid(),
            pid: cred.pid(),
        }
    }
}

/// A client session.
pub struct Session {
    /// Connection id, unique within this process.
    id: u64,
    /// Peer credentials from accept time.
    peer: PeerCredentials,
    /// Session creation time.
    created_at: Instant,
    /// Requests dispatched on this connection.
    request_count: u64,
}

impl Session {
    pub fn new(id: u64, peer: PeerCredentials) -> Self {
        Self {
            id,
            peer,
            created_at: Instant::now(),
            request_count: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> PeerCredentials {
        self.peer
    }

    pub fn record_request(&mut self) {
        self.request_count += 1;
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
