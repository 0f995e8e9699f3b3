//! # Configuration Utilities
//!
//! Relay client configuration plus a generic TOML loader shared with the
//! listener. Every field has a default so a config file only
//! needs the values it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::vote::DEFAULT_SERVICE_NAME;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Example
/// ```ignore
/// let config: RelayConfig = load_config("config/relay.toml")?;
/// ```
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: T = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Relay client settings, passed explicitly to every client instance.
///
/// # Example TOML
///
/// ```toml
/// service_name = "MinecraftServerList"
/// connect_timeout_ms = 5000
/// send_timeout_ms = 5000
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 500
/// max_jitter_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Name this listing site announces in every vote
    pub service_name: String,
    /// How long to wait for the TCP connection (milliseconds)
    pub connect_timeout_ms: u64,
    /// How long to wait for the block to be written and the socket shut down (milliseconds)
    pub send_timeout_ms: u64,
    /// Caller-side retry policy used by the dispatcher
    pub retry: RetryPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            connect_timeout_ms: 5_000,
            send_timeout_ms: 5_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl RelayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// At-most-N attempts with a linear, jittered delay between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before attempt `n` is `base_delay_ms * (n - 1)` plus jitter
    pub base_delay_ms: u64,
    /// Upper bound of the uniform random jitter (milliseconds)
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_jitter_ms: 0,
        }
    }
}
