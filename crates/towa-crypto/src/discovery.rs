//! Deterministic discovery keys.
//!
//! Two keys with different sensitivity:
//!
//! - [`BucketId`] binds the question to the normalized answer. It is handed
//!   back to the sealer for client-side use and never leaves the client.
//! - [`DiscoveryKey`] is derived from the recipient identity only and is what
//!   the server indexes letters under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use towa_core::defaults::{BUCKET_ID_HEX_LEN, DISCOVERY_KEY_HEX_LEN};

use crate::error::LetterError;
use crate::normalize::normalize_identity;

const IDENTITY_DOMAIN: &[u8] = b"towa/identity/v1";

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn parse_hex_key(s: &str, len: usize, what: &str) -> Result<String, LetterError> {
    if s.len() != len || !is_lower_hex(s) {
        return Err(LetterError::InvalidInput(format!(
            "{} must be {} lowercase hex characters",
            what, len
        )));
    }
    Ok(s.to_string())
}

/// Answer-bound bucket identifier (16 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketId(String);

impl BucketId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BucketId {
    type Err = LetterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_key(s, BUCKET_ID_HEX_LEN, "bucket id").map(Self)
    }
}

/// Identity discovery key (32 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryKey(String);

impl DiscoveryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiscoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DiscoveryKey {
    type Err = LetterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_key(s, DISCOVERY_KEY_HEX_LEN, "discovery key").map(Self)
    }
}

impl Serialize for DiscoveryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DiscoveryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// SHA-256 over `question ∥ answer_norm`, truncated to 16 hex characters.
///
/// `answer_norm` must already be normalized.
pub fn derive_bucket_id(question: &str, answer_norm: &str) -> BucketId {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    hasher.update(answer_norm.as_bytes());
    let digest = hex::encode(hasher.finalize());
    BucketId(digest[..BUCKET_ID_HEX_LEN].to_string())
}

/// Index key for a recipient, from their name and birth date.
///
/// Both inputs are normalized, so `"Yamada Taro", "1990-01-02"` and
/// `"yamadataro", "19900102"` give the same key.
pub fn derive_identity_key(name: &str, dob: &str) -> DiscoveryKey {
    let identity = normalize_identity(name, dob);
    let mut hasher = Sha256::new();
    hasher.update(IDENTITY_DOMAIN);
    hasher.update([0u8]);
    hasher.update(identity.as_bytes());
    let digest = hex::encode(hasher.finalize());
    DiscoveryKey(digest[..DISCOVERY_KEY_HEX_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_id_known_vector() {
        // sha256("favorite color?blue")
        let id = derive_bucket_id("favorite color?", "blue");
        assert_eq!(id.as_str(), "c846a2865247a8d9");
    }

    #[test]
    fn test_bucket_id_utf8_vector() {
        let id = derive_bucket_id("", "山田太郎199012");
        assert_eq!(id.to_string(), "b97c06ce8b5ac413");
    }

    #[test]
    fn test_bucket_id_depends_on_answer() {
        assert_ne!(
            derive_bucket_id("favorite color?", "blue"),
            derive_bucket_id("favorite color?", "red")
        );
    }

    #[test]
    fn test_identity_key_known_vector() {
        let key = derive_identity_key("Yamada Taro", "1990-01-02");
        assert_eq!(key.as_str(), "dce2e53f9657421cb94bc2b0252c55e0");
    }

    #[test]
    fn test_identity_key_normalizes_inputs() {
        assert_eq!(
            derive_identity_key("Yamada Taro", "1990-01-02"),
            derive_identity_key("  yamadataro", "19900102")
        );
    }

    #[test]
    fn test_identity_key_differs_from_plain_hash() {
        let key = derive_identity_key("", "");
        assert_eq!(key.as_str().len(), 32);
        assert_ne!(key.as_str(), &derive_bucket_id("", "").to_string());
    }

    #[test]
    fn test_parse_discovery_key() {
        let key: DiscoveryKey = "dce2e53f9657421cb94bc2b0252c55e0".parse().unwrap();
        assert_eq!(key.to_string(), "dce2e53f9657421cb94bc2b0252c55e0");
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!("abc".parse::<DiscoveryKey>().is_err());
        assert!("DCE2E53F9657421CB94BC2B0252C55E0".parse::<DiscoveryKey>().is_err());
        assert!("zce2e53f9657421cb94bc2b0252c55e0".parse::<DiscoveryKey>().is_err());
        assert!("c846a2865247a8d9".parse::<BucketId>().is_ok());
        assert!("c846a2865247a8d".parse::<BucketId>().is_err());
    }

    #[test]
    fn test_discovery_key_serde() {
        let key = derive_identity_key("a", "2000-01-01");
        let json = serde_json::to_string(&key).unwrap();
        let back: DiscoveryKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
        assert!(serde_json::from_str::<DiscoveryKey>("\"nothex\"").is_err());
    }
}
