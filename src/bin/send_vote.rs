//! # Send Vote Binary
//!
//! Sends one vote to a Votifier listener through the retrying dispatcher and
//! prints the outcome as JSON, the shape the listing site persists.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin send_vote -- --config config/relay.toml \
//!   --host play.example.net --port 8192 --key-file rsa/public.key \
//!   --username Alice --address 1.2.3.4
//! ```

use anyhow::Context;
use clap::Parser;
use std::sync::{Arc, Mutex};

use votifier_relay::common::config::load_config;
use votifier_relay::common::logging::init_logger;
use votifier_relay::{
    RelayConfig, RelayMetrics, VoteDispatcher, VoteRelayClient, VoteTarget, VoterIdentity,
};

/// Command-line arguments for the send_vote binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the relay configuration file (TOML format); defaults apply without it
    #[arg(short, long)]
    config: Option<String>,

    /// Vote listener host
    #[arg(long)]
    host: String,

    /// Vote listener port
    #[arg(long, default_value_t = 8192)]
    port: u16,

    /// File holding the listener's public key (PEM or base64 DER)
    #[arg(long)]
    key_file: String,

    /// Minecraft username of the voter (defaults to "Anonymous")
    #[arg(short, long)]
    username: Option<String>,

    /// Voter's IP address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Path to write metrics JSON output (optional)
    #[arg(long)]
    metrics_output: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let config: RelayConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    let key = std::fs::read(&args.key_file)
        .with_context(|| format!("failed to read key file {}", args.key_file))?;
    let target = VoteTarget::new(args.host, args.port, key);

    let voter = match args.username {
        Some(username) => VoterIdentity::new(username, args.address),
        None => VoterIdentity::anonymous(args.address),
    };

    let client = Arc::new(VoteRelayClient::new(config.clone()));
    if !client.is_configured(&target) {
        log::warn!("Target {} is not fully configured", target.label());
    }

    let mut dispatcher = VoteDispatcher::new(client, config.retry.clone());
    let metrics = if args.metrics_output.is_some() {
        let m = Arc::new(Mutex::new(RelayMetrics::new(config.service_name.clone())));
        dispatcher = dispatcher.with_metrics(m.clone());
        Some(m)
    } else {
        None
    };

    let report = dispatcher.dispatch(&target, &voter).await;

    if let (Some(metrics), Some(output_path)) = (metrics, args.metrics_output) {
        let metrics = metrics
            .lock()
            .map_err(|e| anyhow::anyhow!("metrics lock poisoned: {}", e))?;
        metrics.export_to_json(&output_path)?;
        log::info!("Metrics exported to: {}", output_path);
    }

    let json = serde_json::json!({
        "request_id": report.request_id,
        "attempts": report.attempts,
        "outcome": report.outcome,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);

    if !report.outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
