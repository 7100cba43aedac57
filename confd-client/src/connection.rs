//! Connection management.
//!
//! One connection carries one request at a time; the per-connection tag
//! counter wraps and the daemon echoes endpoint and tag in every reply, so
//! a mismatched reply is a protocol violation rather than something to
//! silently skip.

use crate::error::ClientError;
use bytes::BytesMut;
use confd_protocol::{Endpoint, Frame, PayloadMap, DEFAULT_SOCKET_PATH};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Path of the daemon's listening socket.
    pub socket_path: PathBuf,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

struct Inner {
    stream: UnixStream,
    inbound: BytesMut,
}

/// A connection to the daemon.
pub struct Connection {
    config: ConnectionConfig,
    inner: Mutex<Option<Inner>>,
    next_tag: AtomicU8,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
            next_tag: AtomicU8::new(1),
        }
    }

    /// Dials the daemon socket.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!(path = %self.config.socket_path.display(), "connecting");
        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            UnixStream::connect(&self.config.socket_path),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        *self.inner.lock().await = Some(Inner {
            stream,
            inbound: BytesMut::with_capacity(8192),
        });
        Ok(())
    }

    /// Returns whether the connection is established.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Closes the connection. Closing twice is fine.
    pub async fn close(&self) {
        if let Some(mut inner) = self.inner.lock().await.take() {
            let _ = inner.stream.shutdown().await;
        }
    }

    /// Sends a request and awaits its reply. The reply must carry the same
    /// endpoint and tag with the reply flag set.
    pub async fn request(
        &self,
        endpoint: Endpoint,
        payload: PayloadMap,
    ) -> Result<PayloadMap, ClientError> {
        let mut guard = self.inner.lock().await;
        let inner = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::request(endpoint, tag, payload.encode().freeze());
        let encoded = frame.encode()?;

        tracing::trace!(endpoint = frame.endpoint, tag, bytes = encoded.len(), "request");
        inner.stream.write_all(&encoded).await?;

        let reply = tokio::time::timeout(self.config.request_timeout, Self::read_frame(inner))
            .await
            .map_err(|_| ClientError::Timeout)??;

        if !reply.flags.is_reply() {
            return Err(ClientError::InvalidResponse("reply flag not set"));
        }
        if reply.endpoint != endpoint as u8 {
            return Err(ClientError::InvalidResponse("endpoint mismatch"));
        }
        if reply.tag != tag {
            return Err(ClientError::InvalidResponse("tag mismatch"));
        }

        Ok(PayloadMap::decode(&reply.payload)?)
    }

    /// Reads until a complete frame is buffered.
    async fn read_frame(inner: &mut Inner) -> Result<Frame, ClientError> {
        let mut buf = [0u8; 8192];
        loop {
            if let Some(frame) = Frame::decode(&mut inner.inbound)? {
                return Ok(frame);
            }
            let n = inner.stream.read(&mut buf).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            inner.inbound.extend_from_slice(&buf[..n]);
        }
    }
}
