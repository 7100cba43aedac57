//! Supervisor liveness notifications.
//!
//! Speaks the sd_notify datagram protocol directly: `READY=1` once the
//! server is up, `WATCHDOG=1` at half the interval the supervisor asked for,
//! and `STOPPING=1` on the way down. Inactive unless the environment carries
//! `NOTIFY_SOCKET`.

use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixDatagram;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct Watchdog {
    socket: Option<PathBuf>,
    interval: Option<Duration>,
}

impl Watchdog {
    /// Reads `NOTIFY_SOCKET` and `WATCHDOG_USEC` from the environment.
    pub fn from_env() -> Self {
        let socket = std::env::var_os("NOTIFY_SOCKET")
            .map(PathBuf::from)
            .filter(|path| {
                if path.to_string_lossy().starts_with('@') {
                    tracing::warn!("abstract notify sockets are not supported");
                    false
                } else {
                    true
                }
            });
        let interval = std::env::var("WATCHDOG_USEC")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|usec| *usec > 0)
            .map(Duration::from_micros);

        if let Some(interval) = interval {
            tracing::debug!(?interval, "watchdog enabled");
        }
        Self::new(socket, interval)
    }

    pub fn new(socket: Option<PathBuf>, interval: Option<Duration>) -> Self {
        Self { socket, interval }
    }

    pub fn is_active(&self) -> bool {
        self.socket.is_some()
    }

    pub async fn notify_ready(&self) {
        self.notify("READY=1").await;
    }

    pub async fn notify_stopping(&self) {
        self.notify("STOPPING=1").await;
    }

    async fn notify(&self, state: &str) {
        let Some(path) = &self.socket else {
            return;
        };
        let socket = match UnixDatagram::unbound() {
            Ok(socket) => socket,
            Err(err) => {
                tracing::warn!(error = %err, "failed to create notify socket");
                return;
            }
        };
        if let Err(err) = socket.send_to(state.as_bytes(), path).await {
            tracing::warn!(error = %err, state, "supervisor notification failed");
        }
    }

    /// Kicks the supervisor periodically until shutdown. Returns immediately
    /// when no watchdog interval is configured.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let Some(interval) = self.interval else {
            tracing::debug!("watchdog disabled");
            return;
        };
        if self.socket.is_none() {
            return;
        }

        // Kick at half the supervisor's interval so a single missed tick
        // does not kill the service.
        let period = (interval / 2).max(Duration::from_millis(100));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.notify("WATCHDOG=1").await,
                _ = shutdown.recv() => break,
            }
        }
    }
}
