//! confd - persistent configuration data service.
//!
//! Owns a typed key/value store on local disk and exposes it to co-located
//! processes over a local domain socket.

use clap::Parser;
use confd_server::{AccessPolicy, Config, RequestHandler, Server, ServerConfig, Watchdog};
use confd_store::PropertyStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confd")]
#[command(about = "Persistent configuration data service")]
#[command(version)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "/etc/confd/confd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %args.config.display(), error = %err, "failed to load config");
            return Err(err.into());
        }
    };

    tracing::info!("starting confd");
    tracing::info!("  socket: {}", config.rpc.listen.display());
    tracing::info!("  store: {}", config.storage.db_path().display());

    // A schema check failure here aborts startup with a nonzero exit.
    let store = match PropertyStore::open(config.storage.db_path()) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, "failed to open property store");
            return Err(err.into());
        }
    };

    let policy = AccessPolicy::from_config(&config.access);
    if policy.is_empty() {
        tracing::warn!("access allow-list is empty, all requests will be denied");
    } else {
        tracing::info!("  access rules: {}", policy.len());
    }

    let server_config =
        ServerConfig::new(config.rpc.listen.clone()).with_mode(config.rpc.socket_mode());
    let server = Arc::new(Server::new(
        server_config,
        RequestHandler::new(store, policy),
    ));

    // Termination signals break the accept loop; in-flight requests finish.
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let signals = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        );
        let (mut sigint, mut sigterm, mut sighup) = match signals {
            (Ok(a), Ok(b), Ok(c)) => (a, b, c),
            _ => {
                tracing::error!("failed to install signal handlers");
                return;
            }
        };
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
            _ = sighup.recv() => {}
        }
        tracing::info!("received termination signal, shutting down");
        shutdown_server.shutdown();
    });

    let watchdog = Watchdog::from_env();
    watchdog.notify_ready().await;
    tokio::spawn(watchdog.clone().run(server.subscribe_shutdown()));

    server.run().await?;

    watchdog.notify_stopping().await;
    tracing::info!("daemon stopped");
    Ok(())
}
