//! # Vote Data Model
//!
//! Value types passed between the surrounding application and the relay:
//! who is voting ([`VoterIdentity`]), where the vote goes ([`VoteTarget`]),
//! what goes on the wire ([`VotePacket`]) and what happened ([`VoteOutcome`]).
//!
//! ## Wire Layout
//!
//! Before encryption a vote is five newline-terminated lines:
//! ```text
//! VOTE
//! <service name>
//! <username>
//! <source address>
//! <timestamp, ms since epoch>
//! ```

use chrono::{DateTime, Utc};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use super::crypto::{self, KeyMaterial};
use super::error::{PacketError, RelayError, VoteErrorKind};

/// Service name announced to listeners when the relay config does not set one.
pub const DEFAULT_SERVICE_NAME: &str = "MinecraftServerList";

/// Username used for votes cast without a Minecraft account name.
pub const ANONYMOUS_VOTER: &str = "Anonymous";

const OPCODE: &str = "VOTE";

/// One Minecraft server's vote listener, as loaded from its stored configuration.
///
/// Host, port and key are optional because server owners may not have filled
/// them in. Use [`VoteTarget::is_configured`] before relying on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTarget {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub public_key: Option<KeyMaterial>,
    /// Overrides the relay's configured service name for this target only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// A target whose host, port and key have all been checked.
pub(crate) struct ResolvedTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub key: RsaPublicKey,
}

impl ResolvedTarget<'_> {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl VoteTarget {
    pub fn new(host: impl Into<String>, port: u16, public_key: impl Into<KeyMaterial>) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            public_key: Some(public_key.into()),
            service_name: None,
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// True iff host, port and a 2048-bit RSA public key are all present and well-formed.
    ///
    /// A missing part sends as `NotConfigured`; a key that is present but
    /// unusable sends as `EncryptionError`. Both make this `false`.
    pub fn is_configured(&self) -> bool {
        self.resolve().is_ok()
    }

    /// `host:port` for logging, with placeholders for missing parts.
    pub fn label(&self) -> String {
        let host = self.host.as_deref().unwrap_or("?");
        match self.port {
            Some(port) => format!("{}:{}", host, port),
            None => format!("{}:?", host),
        }
    }

    pub(crate) fn resolve(&self) -> Result<ResolvedTarget<'_>, RelayError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(RelayError::NotConfigured("missing host"))?;
        let port = self
            .port
            .filter(|&p| p != 0)
            .ok_or(RelayError::NotConfigured("missing port"))?;
        let material = self
            .public_key
            .as_ref()
            .ok_or(RelayError::NotConfigured("missing public key"))?;
        let key = crypto::parse_votifier_key(material)?;

        Ok(ResolvedTarget { host, port, key })
    }
}

/// Who is voting. The username is validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterIdentity {
    pub username: String,
    /// Voter's IP address; informational only.
    pub source_address: String,
}

impl VoterIdentity {
    pub fn new(username: impl Into<String>, source_address: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            source_address: source_address.into(),
        }
    }

    pub fn anonymous(source_address: impl Into<String>) -> Self {
        Self::new(ANONYMOUS_VOTER, source_address)
    }
}

/// The plaintext record encrypted into one vote block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePacket {
    pub service_name: String,
    pub username: String,
    pub address: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl VotePacket {
    /// Build a packet stamped with the current time.
    pub fn new(service_name: &str, voter: &VoterIdentity) -> Self {
        Self::with_timestamp(service_name, voter, Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(service_name: &str, voter: &VoterIdentity, timestamp: i64) -> Self {
        Self {
            service_name: service_name.to_string(),
            username: voter.username.clone(),
            address: voter.source_address.clone(),
            timestamp,
        }
    }

    /// Serialize to the line layout. Fails if a field would break the layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PacketError> {
        for (name, value) in [
            ("service_name", &self.service_name),
            ("username", &self.username),
            ("address", &self.address),
        ] {
            if value.contains(['\n', '\r']) {
                return Err(PacketError::LineBreak(name));
            }
        }

        let text = format!(
            "{}\n{}\n{}\n{}\n{}\n",
            OPCODE, self.service_name, self.username, self.address, self.timestamp
        );
        Ok(text.into_bytes())
    }

    /// Parse a decrypted vote block.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(bytes).map_err(|_| PacketError::NotUtf8)?;
        let mut lines = text.split('\n');

        if lines.next() != Some(OPCODE) {
            return Err(PacketError::MissingOpcode);
        }

        let mut field = |name: &'static str| {
            lines
                .next()
                .map(|line| line.trim_end_matches('\r').to_string())
                .ok_or(PacketError::MissingField(name))
        };
        let service_name = field("service_name")?;
        let username = field("username")?;
        let address = field("address")?;
        let raw_timestamp = field("timestamp")?;

        let timestamp = raw_timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| PacketError::BadTimestamp(raw_timestamp.clone()))?;

        Ok(Self {
            service_name,
            username,
            address,
            timestamp,
        })
    }
}

/// Result of one relay attempt. The caller owns persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub success: bool,
    pub attempted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<VoteErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_message: Option<String>,
}

impl VoteOutcome {
    pub fn delivered(attempted_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            attempted_at,
            error_kind: None,
            raw_message: None,
        }
    }

    pub fn failed(attempted_at: DateTime<Utc>, error: &RelayError) -> Self {
        Self {
            success: false,
            attempted_at,
            error_kind: Some(error.kind()),
            raw_message: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::KeyError;

    fn alice() -> VoterIdentity {
        VoterIdentity::new("Alice", "1.2.3.4")
    }

    #[test]
    fn test_serialized_layout_is_stable() {
        let packet = VotePacket::with_timestamp("TestList", &alice(), 1_700_000_000_000);
        let expected = b"VOTE\nTestList\nAlice\n1.2.3.4\n1700000000000\n";

        assert_eq!(packet.to_bytes().unwrap(), expected);
        assert_eq!(packet.to_bytes().unwrap(), packet.clone().to_bytes().unwrap());
    }

    #[test]
    fn test_parse_serialized_packet() {
        let packet = VotePacket::with_timestamp("TestList", &alice(), 42);
        let parsed = VotePacket::parse(&packet.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn test_parse_rejects_malformed_blocks() {
        assert_eq!(
            VotePacket::parse(b"HELLO\nx\ny\nz\n1\n"),
            Err(PacketError::MissingOpcode)
        );
        assert_eq!(
            VotePacket::parse(b"VOTE\nTestList"),
            Err(PacketError::MissingField("username"))
        );
        assert_eq!(
            VotePacket::parse(b"VOTE\nTestList\nAlice\n1.2.3.4\nyesterday\n"),
            Err(PacketError::BadTimestamp("yesterday".to_string()))
        );
        assert_eq!(VotePacket::parse(&[0xff, 0xfe]), Err(PacketError::NotUtf8));
    }

    #[test]
    fn test_line_breaks_are_rejected() {
        let voter = VoterIdentity::new("Alice\nVOTE", "1.2.3.4");
        let packet = VotePacket::with_timestamp("TestList", &voter, 1);
        assert_eq!(packet.to_bytes(), Err(PacketError::LineBreak("username")));
    }

    #[test]
    fn test_unconfigured_targets() {
        let missing_everything = VoteTarget {
            host: None,
            port: None,
            public_key: None,
            service_name: None,
        };
        assert!(!missing_everything.is_configured());

        let blank_host = VoteTarget::new("  ", 8192, "key");
        assert!(matches!(
            blank_host.resolve(),
            Err(RelayError::NotConfigured("missing host"))
        ));

        let zero_port = VoteTarget::new("play.example.net", 0, "key");
        assert!(matches!(
            zero_port.resolve(),
            Err(RelayError::NotConfigured("missing port"))
        ));

        let bad_key = VoteTarget::new("play.example.net", 8192, "definitely not a key");
        assert!(!bad_key.is_configured());
        assert!(matches!(
            bad_key.resolve(),
            Err(RelayError::InvalidKey(KeyError::Unrecognised(_)))
        ));
        assert_eq!(
            bad_key.resolve().err().map(|e| e.kind()),
            Some(VoteErrorKind::EncryptionError)
        );
    }

    #[test]
    fn test_target_deserializes_with_defaults() {
        let target: VoteTarget =
            serde_json::from_str(r#"{ "host": "play.example.net", "port": 8192 }"#).unwrap();
        assert_eq!(target.service_name, None);
        assert_eq!(target.public_key, None);
        assert_eq!(target.label(), "play.example.net:8192");
        assert!(!target.is_configured());
    }

    #[test]
    fn test_service_name_override() {
        let target = VoteTarget::new("play.example.net", 8192, "key");
        assert_eq!(target.service_name, None);

        let target = target.with_service_name("OtherList");
        assert_eq!(target.service_name.as_deref(), Some("OtherList"));
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["service_name"], "OtherList");
    }

    #[test]
    fn test_outcome_json() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let ok = serde_json::to_value(VoteOutcome::delivered(at)).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error_kind").is_none());

        let failed = VoteOutcome::failed(at, &RelayError::Cancelled);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "cancelled");
        assert_eq!(json["raw_message"], "vote relay cancelled");
    }

    #[test]
    fn test_anonymous_voter() {
        let voter = VoterIdentity::anonymous("10.0.0.1");
        assert_eq!(voter.username, "Anonymous");
        assert_eq!(voter.source_address, "10.0.0.1");
    }
}
