//! # Votifier Vote Relay
//!
//! Delivers vote notifications from a server-listing site to Minecraft servers
//! over the Votifier v1 protocol: one RSA-encrypted block per vote, sent over a
//! fresh TCP connection, no acknowledgment.
//!
//! - [`client`]: the relay client, the retrying dispatcher and relay metrics
//! - [`server`]: a Votifier v1 listener and its key store
//! - [`common`]: the vote data model, cryptography, transport and configuration

pub mod client;
pub mod common;
pub mod server;

pub use client::{DispatchReport, RelayMetrics, VoteDispatcher, VoteRelayClient};
pub use common::config::{RelayConfig, RetryPolicy};
pub use common::error::VoteErrorKind;
pub use common::vote::{VoteOutcome, VotePacket, VoteTarget, VoterIdentity};
pub use server::{ListenerConfig, VoteListener};
