//! Unix-socket RPC server.

use crate::error::ServerError;
use crate::handler::RequestHandler;
use crate::session::{PeerCredentials, Session};
use bytes::BytesMut;
use confd_protocol::Frame;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Filesystem path of the listening socket.
    pub socket_path: PathBuf,
    /// Permission bits applied to the socket entry.
    pub socket_mode: u32,
}

impl ServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            socket_mode: 0o777,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.socket_mode = mode & 0o777;
        self
    }
}

/// Server statistics. Failures are counted here and logged; none of them
/// terminate the process.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
    pub framing_errors_total: AtomicU64,
}

/// The RPC server: owns the listening socket and one task per accepted
/// connection.
pub struct Server {
    config: ServerConfig,
    handler: Arc<RequestHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    pub fn new(config: ServerConfig, handler: RequestHandler) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            handler: Arc::new(handler),
            stats: Arc::new(ServerStats::default()),
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Runs the accept loop until shutdown. The socket file is unlinked
    /// before binding (stale entries from a previous run) and again on exit.
    pub async fn run(&self) -> Result<(), ServerError> {
        let path = &self.config.socket_path;

        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(ServerError::Io(err)),
        }

        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(self.config.socket_mode))?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            "listening on {} (mode {:04o})",
            path.display(),
            self.config.socket_mode
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => self.accept(stream),
                        Err(err) => tracing::error!(error = %err, "accept error"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        if let Err(err) = std::fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(error = %err, "failed to unlink socket");
            }
        }
        Ok(())
    }

    /// Registers an accepted connection and spawns its task.
    fn accept(&self, stream: UnixStream) {
        // Capture peer credentials once; everything the access gate sees
        // comes from this snapshot.
        let peer = match stream.peer_cred() {
            Ok(cred) => PeerCredentials::from(cred),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read peer credentials, dropping client");
                self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let id = self.stats.connections_total.fetch_add(1, Ordering::Relaxed) + 1;
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

        let session = Session::new(id, peer);
        let handler = self.handler.clone();
        let stats = self.stats.clone();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            tracing::debug!(conn = id, uid = peer.uid, gid = peer.gid, "client connected");

            let result =
                Self::handle_connection(stream, session, handler, &stats, &mut shutdown).await;
            if let Err(err) = result {
                tracing::debug!(conn = id, error = %err, "connection closed with error");
                stats.errors_total.fetch_add(1, Ordering::Relaxed);
            }

            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!(conn = id, "client disconnected");
        });
    }

    /// Services one connection: bytes accumulate until a complete frame is
    /// present, each frame is dispatched, and replies are written in request
    /// order. Framing violations and IO errors end the connection.
    async fn handle_connection(
        mut stream: UnixStream,
        mut session: Session,
        handler: Arc<RequestHandler>,
        stats: &ServerStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let mut inbound = BytesMut::with_capacity(8192);
        let mut buf = [0u8; 8192];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => return Ok(()),
                        Ok(n) => inbound.extend_from_slice(&buf[..n]),
                        Err(err) => return Err(ServerError::Io(err)),
                    }
                }
                _ = shutdown.recv() => return Ok(()),
            }

            // Drain every complete frame before reading again.
            loop {
                match Frame::decode(&mut inbound) {
                    Ok(Some(request)) => {
                        stats.requests_total.fetch_add(1, Ordering::Relaxed);
                        let reply = handler.handle(&mut session, &request);
                        let encoded = reply.encode().map_err(ServerError::Protocol)?;
                        stream.write_all(&encoded).await?;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        stats.framing_errors_total.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            conn = session.id(),
                            error = %err,
                            "framing violation, closing connection"
                        );
                        return Err(ServerError::Framing(err));
                    }
                }
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns a receiver that fires when shutdown is initiated, for
    /// background tasks that should stop with the server.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Returns whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
