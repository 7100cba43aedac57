//! confd-cli - one-shot command-line access to the configuration daemon.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use confd_client::{Client, ConnectionConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "confd-cli")]
#[command(about = "Command-line interface for the confd configuration daemon")]
#[command(version)]
struct Cli {
    /// Daemon socket path (defaults to the system socket)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a property and print its value
    Get {
        /// Property key
        key: String,

        /// Expected value type
        #[arg(short = 't', long = "type", value_enum, default_value = "auto")]
        value_type: ValueType,
    },
    /// Write a property
    Set {
        /// Property key
        key: String,

        /// New value (blobs are given as hex)
        value: String,

        /// Value type; `auto` guesses integer, real, bool, then string
        #[arg(short = 't', long = "type", value_enum, default_value = "auto")]
        value_type: ValueType,
    },
    /// Set a property to null, keeping the key
    SetNull {
        /// Property key
        key: String,
    },
}

/// Value type selector for get/set.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    Auto,
    String,
    Blob,
    Int,
    Real,
    Bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli
        .socket
        .map(ConnectionConfig::new)
        .unwrap_or_default();
    let client = Client::connect(config).await?;

    let result = match &cli.command {
        Commands::Get { key, value_type } => commands::get(&client, key, *value_type).await,
        Commands::Set {
            key,
            value,
            value_type,
        } => commands::set(&client, key, value, *value_type).await,
        Commands::SetNull { key } => commands::set_null(&client, key).await,
    };

    client.close().await;
    result
}
