//! # Error Types
//!
//! [`RelayError`] is what goes wrong inside a single relay attempt. It never
//! escapes the client: [`VoteRelayClient`](crate::client::VoteRelayClient)
//! folds it into a [`VoteOutcome`](crate::common::vote::VoteOutcome) using
//! [`RelayError::kind`] and its `Display` text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Public failure taxonomy reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteErrorKind {
    /// Host, port or public key missing. No connection was made.
    NotConfigured,
    /// The TCP connection was not established in time.
    ConnectTimeout,
    /// Reset, DNS failure, write failure, partial write or send timeout.
    TransportError,
    /// The target's key does not parse, is not 2048 bits, or cannot hold the
    /// vote. No connection was made.
    EncryptionError,
    /// The caller cancelled the attempt.
    Cancelled,
}

impl VoteErrorKind {
    /// Whether resending the same vote may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ConnectTimeout | Self::TransportError)
    }
}

impl fmt::Display for VoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotConfigured => "not_configured",
            Self::ConnectTimeout => "connect_timeout",
            Self::TransportError => "transport_error",
            Self::EncryptionError => "encryption_error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors raised while parsing or generating RSA keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key material is empty")]
    Empty,

    #[error("key material is not a recognised RSA key: {0}")]
    Unrecognised(String),

    #[error("expected a {expected}-bit RSA key, got {actual} bits")]
    WrongSize { expected: usize, actual: usize },

    #[error("key generation failed: {0}")]
    Generation(#[source] rsa::Error),

    #[error("key encoding failed: {0}")]
    Encoding(String),
}

/// Errors raised while parsing a decrypted vote block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("vote block is not valid UTF-8")]
    NotUtf8,

    #[error("vote block does not start with the VOTE opcode")]
    MissingOpcode,

    #[error("vote block is missing the {0} field")]
    MissingField(&'static str),

    #[error("vote timestamp {0:?} is not an integer")]
    BadTimestamp(String),

    #[error("vote field {0} contains a line break")]
    LineBreak(&'static str),
}

/// Everything that can end a relay attempt unsuccessfully.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("vote target is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid public key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("vote packet is {len} bytes, the key can encrypt at most {max}")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("malformed vote packet: {0}")]
    Packet(#[from] PacketError),

    #[error("encryption failed: {0}")]
    Encryption(#[source] rsa::Error),

    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("sending vote to {addr} timed out after {timeout:?}")]
    SendTimeout { addr: String, timeout: Duration },

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vote relay cancelled")]
    Cancelled,
}

impl RelayError {
    /// Map onto the public failure taxonomy.
    pub fn kind(&self) -> VoteErrorKind {
        match self {
            Self::NotConfigured(_) => VoteErrorKind::NotConfigured,
            Self::InvalidKey(_)
            | Self::PlaintextTooLarge { .. }
            | Self::Packet(_)
            | Self::Encryption(_) => VoteErrorKind::EncryptionError,
            Self::ConnectTimeout { .. } => VoteErrorKind::ConnectTimeout,
            Self::SendTimeout { .. } | Self::Io(_) => VoteErrorKind::TransportError,
            Self::Cancelled => VoteErrorKind::Cancelled,
        }
    }
}
