use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::config::load_config;

/// Vote listener settings.
///
/// # Example TOML
///
/// ```toml
/// address = "0.0.0.0:8192"
/// key_dir = "rsa"
/// greeting = "VOTIFIER 1.9"
/// read_timeout_ms = 5000
/// channel_capacity = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind (e.g., "0.0.0.0:8192")
    pub address: String,
    /// Directory holding `public.key` and `private.key`
    pub key_dir: PathBuf,
    /// Line written to each connection on accept; omit to stay silent
    pub greeting: Option<String>,
    /// How long a sender has to deliver its block (milliseconds)
    pub read_timeout_ms: u64,
    /// Capacity of the channel received votes are forwarded into
    pub channel_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8192".to_string(),
            key_dir: PathBuf::from("rsa"),
            greeting: Some("VOTIFIER 1.9".to_string()),
            read_timeout_ms: 5_000,
            channel_capacity: 64,
        }
    }
}

impl ListenerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_config(path)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
