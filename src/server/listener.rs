//! # Vote Listener
//!
//! A minimal Votifier v1 listener: the receiving end a Minecraft server plugin
//! runs. It exists so the relay can be exercised end to end without a game
//! server, and doubles as a development stand-in for one.
//!
//! ## Per Connection
//!
//! 1. Write the greeting line, if configured
//! 2. Read exactly one 256-byte block within the read timeout
//! 3. Decrypt it with the listener's private key
//! 4. Parse the vote and forward it into the channel
//!
//! A bad connection is logged and dropped; the accept loop keeps running.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rsa::RsaPrivateKey;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::common::connection;
use crate::common::crypto;
use crate::common::error::PacketError;
use crate::common::vote::VotePacket;
use crate::server::config::ListenerConfig;

/// A vote decoded by the listener.
#[derive(Debug, Clone)]
pub struct ReceivedVote {
    pub packet: VotePacket,
    pub peer: SocketAddr,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
enum ConnectionError {
    #[error("sender did not deliver a block within {0:?}")]
    ReadTimeout(Duration),
    #[error("sender closed before a full block arrived")]
    ShortBlock,
    #[error("block does not decrypt with this listener's key: {0}")]
    Decrypt(#[source] rsa::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct VoteListener {
    listener: TcpListener,
    private_key: Arc<RsaPrivateKey>,
    greeting: Option<String>,
    read_timeout: Duration,
}

impl VoteListener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig, private_key: RsaPrivateKey) -> Result<Self> {
        let listener = TcpListener::bind(&config.address)
            .await
            .with_context(|| format!("failed to bind to {}", config.address))?;

        Ok(Self {
            listener,
            private_key: Arc::new(private_key),
            greeting: config.greeting.clone(),
            read_timeout: config.read_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the receiving side of `votes` is dropped.
    pub async fn run(self, votes: mpsc::Sender<ReceivedVote>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("📡 Vote listener listening on {}", addr),
            Err(e) => warn!("📡 Vote listener running, local address unknown: {}", e),
        }

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = votes.closed() => {
                    info!("Vote channel closed, listener stopping");
                    return;
                }
            };

            match accepted {
                Ok((socket, peer)) => {
                    debug!("🔗 Accepted vote connection from {}", peer);

                    let key = self.private_key.clone();
                    let greeting = self.greeting.clone();
                    let read_timeout = self.read_timeout;
                    let votes = votes.clone();
                    tokio::spawn(async move {
                        match handle_connection(socket, &key, greeting.as_deref(), read_timeout).await
                        {
                            Ok(packet) => {
                                info!(
                                    "🗳️  Vote from '{}' via {} ({})",
                                    packet.username, packet.service_name, peer
                                );
                                let vote = ReceivedVote {
                                    packet,
                                    peer,
                                    received_at: Utc::now(),
                                };
                                if votes.send(vote).await.is_err() {
                                    debug!("Vote channel closed, dropping vote from {}", peer);
                                }
                            }
                            Err(e) => warn!("❌ Rejected vote connection from {}: {}", peer, e),
                        }
                    });
                }
                Err(e) => error!("❌ Accept error: {}", e),
            }
        }
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    key: &RsaPrivateKey,
    greeting: Option<&str>,
    read_timeout: Duration,
) -> Result<VotePacket, ConnectionError> {
    if let Some(greeting) = greeting {
        socket.write_all(format!("{}\n", greeting).as_bytes()).await?;
    }

    let block = tokio::time::timeout(read_timeout, connection::read_block(&mut socket))
        .await
        .map_err(|_| ConnectionError::ReadTimeout(read_timeout))??
        .ok_or(ConnectionError::ShortBlock)?;

    let plaintext = crypto::open(key, &block).map_err(ConnectionError::Decrypt)?;
    Ok(VotePacket::parse(&plaintext)?)
}
