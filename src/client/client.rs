//! # Relay Client Core
//!
//! [`VoteRelayClient`] delivers one vote notification to one Minecraft
//! server's Votifier listener and reports what happened.
//!
//! ## Responsibility
//!
//! Per call, and nothing more:
//! - Check the target is configured (host, port, 2048-bit RSA key)
//! - Build the vote packet stamped with the current time, announcing the
//!   target's service name override or else [`RelayConfig::service_name`]
//! - Encrypt it into one PKCS#1 v1.5 block
//! - Connect, write the block, close
//!
//! The client keeps no state between calls and never retries. Retries, metrics
//! and scheduling live in [`VoteDispatcher`](super::middleware::VoteDispatcher).
//!
//! ## Lifecycle of one call
//!
//! ```text
//! Idle -> Connecting -> Sending -> Closed(success)
//!            |             |
//!            +-------------+-----> Failed(kind)
//! ```
//! Encryption happens while still idle, so a vote that cannot be encrypted
//! never opens a connection.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = VoteRelayClient::new(RelayConfig::default());
//! let target = VoteTarget::new("play.example.net", 8192, public_key_text);
//! let outcome = client.send_vote(&target, &VoterIdentity::new("Alice", "1.2.3.4")).await;
//! if !outcome.success {
//!     warn!("vote not delivered: {:?}", outcome.error_kind);
//! }
//! ```

use chrono::Utc;
use log::{debug, info, warn};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::config::RelayConfig;
use crate::common::connection::{self, Connector, TcpConnector};
use crate::common::crypto;
use crate::common::error::RelayError;
use crate::common::vote::{VoteOutcome, VotePacket, VoteTarget, VoterIdentity};

/// Stateless Votifier v1 client.
///
/// Safe to share between tasks; concurrent calls each own their connection.
pub struct VoteRelayClient<C = TcpConnector> {
    config: RelayConfig,
    connector: C,
}

impl VoteRelayClient<TcpConnector> {
    /// Create a client that connects over plain TCP.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> VoteRelayClient<C> {
    /// Create a client over a custom transport.
    pub fn with_connector(config: RelayConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// True iff the target has a host, a port and a well-formed 2048-bit public key.
    ///
    /// Pure: no I/O, and malformed input is `false`, never an error.
    pub fn is_configured(&self, target: &VoteTarget) -> bool {
        target.is_configured()
    }

    /// Deliver one vote and report the outcome.
    ///
    /// `success` means the block reached the transport and the connection
    /// closed cleanly; Votifier v1 sends no acknowledgment.
    pub async fn send_vote(&self, target: &VoteTarget, voter: &VoterIdentity) -> VoteOutcome {
        self.send_vote_cancellable(target, voter, &CancellationToken::new())
            .await
    }

    /// Like [`send_vote`](Self::send_vote), but gives up with `Cancelled` as soon
    /// as `cancel` fires. The in-flight connection is dropped, which closes it.
    pub async fn send_vote_cancellable(
        &self,
        target: &VoteTarget,
        voter: &VoterIdentity,
        cancel: &CancellationToken,
    ) -> VoteOutcome {
        let attempted_at = Utc::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RelayError::Cancelled),
            result = self.relay(target, voter) => result,
        };

        match result {
            Ok(()) => {
                info!(
                    "✅ Vote from '{}' delivered to {}",
                    voter.username,
                    target.label()
                );
                VoteOutcome::delivered(attempted_at)
            }
            Err(e) => {
                warn!(
                    "❌ Vote from '{}' to {} failed ({}): {}",
                    voter.username,
                    target.label(),
                    e.kind(),
                    e
                );
                VoteOutcome::failed(attempted_at, &e)
            }
        }
    }

    async fn relay(&self, target: &VoteTarget, voter: &VoterIdentity) -> Result<(), RelayError> {
        let resolved = target.resolve()?;
        let addr = resolved.addr();

        let service_name = target
            .service_name
            .as_deref()
            .unwrap_or(&self.config.service_name);
        let packet = VotePacket::new(service_name, voter);
        let block = crypto::seal(&resolved.key, &packet.to_bytes()?)?;

        debug!("📤 Connecting to {} for vote from '{}'", addr, voter.username);
        let connect_timeout = self.config.connect_timeout();
        let mut stream = match timeout(
            connect_timeout,
            self.connector.connect(resolved.host, resolved.port),
        )
        .await
        {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(RelayError::ConnectTimeout {
                    addr,
                    timeout: connect_timeout,
                })
            }
        };

        debug!("📤 Sending {}-byte vote block to {}", block.len(), addr);
        let send_timeout = self.config.send_timeout();
        match timeout(send_timeout, connection::write_block(&mut stream, &block)).await {
            Ok(written) => written?,
            Err(_) => {
                return Err(RelayError::SendTimeout {
                    addr,
                    timeout: send_timeout,
                })
            }
        }

        Ok(())
    }
}
