//! # Vote Block Cryptography
//!
//! Votifier v1 encrypts the whole vote packet as a single RSA block using
//! PKCS#1 v1.5 padding. Listeners generate a 2048-bit key pair, so every vote
//! on the wire is exactly [`VOTE_BLOCK_SIZE`] bytes.
//!
//! Server owners paste their public key in whatever shape they have at hand,
//! so [`parse_public_key`] accepts:
//! - PEM, both `PUBLIC KEY` (X.509 SubjectPublicKeyInfo) and `RSA PUBLIC KEY` (PKCS#1)
//! - bare base64 DER, which is what Votifier writes to `rsa/public.key`
//! - raw DER bytes

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{KeyError, RelayError};

/// Modulus size of every Votifier key.
pub const VOTIFIER_KEY_BITS: usize = 2048;

/// Size of one encrypted vote on the wire.
pub const VOTE_BLOCK_SIZE: usize = VOTIFIER_KEY_BITS / 8;

/// PKCS#1 v1.5 encryption padding takes at least 11 bytes of every block.
const PKCS1_V15_OVERHEAD: usize = 11;

/// Opaque public or private key material as stored in a server's configuration.
///
/// Serializes as text. Bytes that are not valid UTF-8 (raw DER) are written
/// as base64, which [`parse_public_key`] reads back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True when the material is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(u8::is_ascii_whitespace)
    }
}

impl From<String> for KeyMaterial {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for KeyMaterial {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<KeyMaterial> for String {
    fn from(value: KeyMaterial) -> Self {
        match String::from_utf8(value.0) {
            Ok(text) => text,
            Err(e) => STANDARD.encode(e.into_bytes()),
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

/// Parse an RSA public key in any supported format.
pub fn parse_public_key(material: &KeyMaterial) -> Result<RsaPublicKey, KeyError> {
    decode_material(
        material,
        |pem| {
            RsaPublicKey::from_public_key_pem(pem)
                .ok()
                .or_else(|| RsaPublicKey::from_pkcs1_pem(pem).ok())
        },
        |der| {
            RsaPublicKey::from_public_key_der(der)
                .ok()
                .or_else(|| RsaPublicKey::from_pkcs1_der(der).ok())
        },
    )
}

/// Parse an RSA public key and check it has the Votifier modulus size.
pub fn parse_votifier_key(material: &KeyMaterial) -> Result<RsaPublicKey, KeyError> {
    let key = parse_public_key(material)?;
    let bits = key.size() * 8;
    if bits != VOTIFIER_KEY_BITS {
        return Err(KeyError::WrongSize {
            expected: VOTIFIER_KEY_BITS,
            actual: bits,
        });
    }
    Ok(key)
}

/// Parse an RSA private key (PKCS#8 or PKCS#1; PEM, base64 DER or raw DER).
pub fn parse_private_key(material: &KeyMaterial) -> Result<RsaPrivateKey, KeyError> {
    decode_material(
        material,
        |pem| {
            RsaPrivateKey::from_pkcs8_pem(pem)
                .ok()
                .or_else(|| RsaPrivateKey::from_pkcs1_pem(pem).ok())
        },
        |der| {
            RsaPrivateKey::from_pkcs8_der(der)
                .ok()
                .or_else(|| RsaPrivateKey::from_pkcs1_der(der).ok())
        },
    )
}

fn decode_material<K>(
    material: &KeyMaterial,
    from_pem: impl Fn(&str) -> Option<K>,
    from_der: impl Fn(&[u8]) -> Option<K>,
) -> Result<K, KeyError> {
    if material.is_blank() {
        return Err(KeyError::Empty);
    }

    let bytes = material.as_bytes();
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.trim();
        if text.starts_with("-----BEGIN") {
            return from_pem(text)
                .ok_or_else(|| KeyError::Unrecognised("PEM block is not an RSA key".to_string()));
        }

        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if let Ok(der) = STANDARD.decode(compact) {
            return from_der(&der)
                .ok_or_else(|| KeyError::Unrecognised("base64 DER is not an RSA key".to_string()));
        }
    }

    from_der(bytes).ok_or_else(|| KeyError::Unrecognised("DER is not an RSA key".to_string()))
}

/// Encrypt a serialized vote packet into one PKCS#1 v1.5 block.
///
/// Plaintext longer than the key allows is rejected, never truncated.
pub fn seal(key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, RelayError> {
    let max = key.size().saturating_sub(PKCS1_V15_OVERHEAD);
    if plaintext.len() > max {
        return Err(RelayError::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    let mut rng = rand::thread_rng();
    key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
        .map_err(RelayError::Encryption)
}

/// Decrypt one vote block.
pub fn open(key: &RsaPrivateKey, block: &[u8]) -> rsa::Result<Vec<u8>> {
    key.decrypt(Pkcs1v15Encrypt, block)
}

/// Generate a fresh key pair the way a Votifier listener does on first start.
pub fn generate_key_pair(bits: usize) -> Result<RsaPrivateKey, KeyError> {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, bits).map_err(KeyError::Generation)
}

/// Encode a public key as base64 X.509 DER, the `public.key` file format.
pub fn encode_public_key(key: &RsaPublicKey) -> Result<String, KeyError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Encode a private key as base64 PKCS#8 DER, the `private.key` file format.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<String, KeyError> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::LineEnding;
    use std::sync::OnceLock;

    fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| generate_key_pair(VOTIFIER_KEY_BITS).unwrap())
    }

    #[test]
    fn test_parse_base64_der() {
        let public = test_key().to_public_key();
        let encoded = encode_public_key(&public).unwrap();

        let parsed = parse_votifier_key(&KeyMaterial::from(encoded.as_str())).unwrap();
        assert_eq!(parsed, public);

        // Pasted keys often arrive wrapped over several lines
        let wrapped = encoded
            .as_bytes()
            .chunks(64)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse_votifier_key(&KeyMaterial::from(wrapped)).unwrap();
        assert_eq!(parsed, public);
    }

    #[test]
    fn test_parse_pem_variants() {
        let public = test_key().to_public_key();

        let spki = public.to_public_key_pem(LineEnding::LF).unwrap();
        assert_eq!(parse_public_key(&KeyMaterial::from(spki)).unwrap(), public);

        let pkcs1 = public.to_pkcs1_pem(LineEnding::LF).unwrap();
        assert_eq!(parse_public_key(&KeyMaterial::from(pkcs1)).unwrap(), public);
    }

    #[test]
    fn test_parse_raw_der() {
        let public = test_key().to_public_key();
        let der = public.to_public_key_der().unwrap();

        let material = KeyMaterial::from(der.as_bytes().to_vec());
        assert_eq!(parse_public_key(&material).unwrap(), public);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_public_key(&KeyMaterial::from("")),
            Err(KeyError::Empty)
        ));
        assert!(matches!(
            parse_public_key(&KeyMaterial::from("  \n ")),
            Err(KeyError::Empty)
        ));
        assert!(matches!(
            parse_public_key(&KeyMaterial::from("not a key at all")),
            Err(KeyError::Unrecognised(_))
        ));
        assert!(matches!(
            parse_public_key(&KeyMaterial::from(
                "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----"
            )),
            Err(KeyError::Unrecognised(_))
        ));
    }

    #[test]
    fn test_wrong_key_size() {
        let small = generate_key_pair(1024).unwrap();
        let encoded = encode_public_key(&small.to_public_key()).unwrap();

        match parse_votifier_key(&KeyMaterial::from(encoded)) {
            Err(KeyError::WrongSize { expected, actual }) => {
                assert_eq!(expected, 2048);
                assert_eq!(actual, 1024);
            }
            other => panic!("expected WrongSize, got {:?}", other),
        }
    }

    #[test]
    fn test_private_key_round_trip() {
        let encoded = encode_private_key(test_key()).unwrap();
        let parsed = parse_private_key(&KeyMaterial::from(encoded)).unwrap();
        assert_eq!(&parsed, test_key());
    }

    #[test]
    fn test_seal_is_randomized_but_opens_identically() {
        let public = test_key().to_public_key();
        let plaintext = b"VOTE\nTestList\nAlice\n1.2.3.4\n1700000000000\n";

        let first = seal(&public, plaintext).unwrap();
        let second = seal(&public, plaintext).unwrap();

        assert_eq!(first.len(), VOTE_BLOCK_SIZE);
        assert_eq!(second.len(), VOTE_BLOCK_SIZE);
        assert_ne!(first, second);
        assert_eq!(open(test_key(), &first).unwrap(), plaintext);
        assert_eq!(open(test_key(), &second).unwrap(), plaintext);
    }

    #[test]
    fn test_seal_rejects_oversized_plaintext() {
        let public = test_key().to_public_key();

        assert!(seal(&public, &[b'a'; 245]).is_ok());
        match seal(&public, &[b'a'; 246]) {
            Err(RelayError::PlaintextTooLarge { len, max }) => {
                assert_eq!(len, 246);
                assert_eq!(max, 245);
            }
            other => panic!("expected PlaintextTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_key_material_serde() {
        let text = KeyMaterial::from("MIIBIjAN");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"MIIBIjAN\"");

        let binary = KeyMaterial::from(vec![0x30, 0x82, 0x01]);
        let json = serde_json::to_string(&binary).unwrap();
        assert_eq!(json, format!("\"{}\"", STANDARD.encode([0x30, 0x82, 0x01])));

        let back: KeyMaterial = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back.as_bytes(), b"abc");
        assert_eq!(format!("{:?}", back), "KeyMaterial(3 bytes)");
    }
}
