//! Error types for cryptographic operations.
//!
//! Two layers:
//!
//! - [`CryptoError`] is what the primitives (Argon2, AES-GCM, encoding)
//!   report. It never leaves the crate's Seal/Open boundary.
//! - [`LetterError`] is the taxonomy callers see from Seal, Open and
//!   envelope decoding.

use thiserror::Error;

/// Primitive-level errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed - wrong key or tampered data.
    #[error("Authentication failed")]
    Authentication,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for primitive operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors surfaced by Seal, Open and envelope decoding.
///
/// Only [`WrongAnswer`](LetterError::WrongAnswer),
/// [`PayloadTooLarge`](LetterError::PayloadTooLarge) and
/// [`InvalidInput`](LetterError::InvalidInput) are meant for end users; the
/// rest are rendered through [`LetterError::user_message`] as a generic
/// failure with an incident reference.
#[derive(Error, Debug)]
pub enum LetterError {
    /// KDF parameters rejected by Argon2 or outside accepted bounds.
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParameters(String),

    /// Plaintext exceeds the configured ceiling.
    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The submitted answer does not open this envelope.
    #[error("Wrong answer")]
    WrongAnswer,

    /// The answer matched but an authenticated layer failed to verify.
    #[error("Envelope is corrupt")]
    CorruptEnvelope,

    /// An underlying primitive failed. The detail is for logs only.
    #[error("Internal cryptographic failure")]
    Primitive(String),

    /// Caller input rejected before any cryptographic work.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Envelope bytes do not decode to a well-formed envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// Result type for Seal/Open operations.
pub type LetterResult<T> = Result<T, LetterError>;

impl LetterError {
    /// Whether this error carries an actionable, user-facing message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            LetterError::WrongAnswer
                | LetterError::PayloadTooLarge { .. }
                | LetterError::InvalidInput(_)
        )
    }

    /// Message safe to show an end user.
    ///
    /// Non user-facing errors collapse to a generic message carrying the
    /// opaque `incident` reference.
    pub fn user_message(&self, incident: &str) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            format!("Something went wrong (reference: {})", incident)
        }
    }

    /// Detail for operator logs.
    pub fn log_detail(&self) -> String {
        match self {
            LetterError::Primitive(detail) => format!("primitive failure: {}", detail),
            other => other.to_string(),
        }
    }
}

impl From<CryptoError> for LetterError {
    fn from(err: CryptoError) -> Self {
        LetterError::Primitive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_display_has_no_detail() {
        let err = CryptoError::Authentication;
        assert_eq!(err.to_string(), "Authentication failed");
    }

    #[test]
    fn test_payload_too_large_display() {
        let err = LetterError::PayloadTooLarge {
            size: 11,
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_primitive_display_hides_detail() {
        let err = LetterError::Primitive("aes key length 7".to_string());
        assert!(!err.to_string().contains("aes"));
        assert!(err.log_detail().contains("aes key length 7"));
    }

    #[test]
    fn test_user_facing_kinds() {
        assert!(LetterError::WrongAnswer.is_user_facing());
        assert!(LetterError::PayloadTooLarge { size: 2, limit: 1 }.is_user_facing());
        assert!(!LetterError::CorruptEnvelope.is_user_facing());
        assert!(!LetterError::Primitive(String::new()).is_user_facing());
        assert!(!LetterError::InvalidKdfParameters(String::new()).is_user_facing());
    }

    #[test]
    fn test_user_message_generic_for_internal() {
        let msg = LetterError::CorruptEnvelope.user_message("inc-42");
        assert!(msg.contains("inc-42"));
        assert!(!msg.to_lowercase().contains("corrupt"));

        let msg = LetterError::WrongAnswer.user_message("inc-42");
        assert_eq!(msg, "Wrong answer");
    }

    #[test]
    fn test_crypto_error_converts_to_primitive() {
        let err: LetterError = CryptoError::KeyDerivation("boom".into()).into();
        assert!(matches!(err, LetterError::Primitive(_)));
    }
}
