//! # Vote Listener Binary
//!
//! Runs a Votifier v1 listener and logs every vote it receives.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin vote_listener -- --config config/listener.toml
//! ```
//!
//! The listener will:
//! 1. Load configuration from the specified TOML file
//! 2. Load its key pair, generating one on first start
//! 3. Print the public key to paste into the listing site
//! 4. Accept votes until interrupted

use clap::Parser;
use log::info;
use tokio::sync::mpsc;

use votifier_relay::common::logging::init_logger;
use votifier_relay::server::{KeyStore, ListenerConfig, VoteListener};

/// Command-line arguments for the vote_listener binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the listener configuration file (TOML format); defaults apply without it
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ListenerConfig::from_file(path)?,
        None => ListenerConfig::default(),
    };

    let keys = KeyStore::load_or_create(&config.key_dir)?;
    info!("🔑 Public key ({}):\n{}", keys.dir().display(), keys.public_key_text()?);

    let listener = VoteListener::bind(&config, keys.private_key().clone()).await?;
    let (tx, mut rx) = mpsc::channel(config.channel_capacity.max(1));

    tokio::spawn(listener.run(tx));

    loop {
        tokio::select! {
            vote = rx.recv() => match vote {
                Some(vote) => info!(
                    "📨 {} voted on {} from {} at {}",
                    vote.packet.username,
                    vote.packet.service_name,
                    vote.packet.address,
                    vote.packet.timestamp
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
