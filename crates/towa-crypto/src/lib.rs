//! # towa-crypto
//!
//! Answer-gated letter envelopes.
//!
//! A sender seals a letter under the answer to a personal question. Anyone
//! holding the envelope can read the question; only someone who knows the
//! answer can read the letter. No credential is stored anywhere: the key is
//! re-derived from the answer every time the letter is opened.
//!
//! ## Cryptographic Primitives
//!
//! - **Key derivation**: Argon2id (v1.3), 32-byte output, per-envelope salt
//! - **Symmetric cipher**: AES-256-GCM (AEAD), detached 16-byte tags
//! - **Discovery keys**: SHA-256, hex-truncated
//! - **Random generation**: OS-seeded thread RNG
//!
//! ## Envelope Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Public header: version, question, salt, params  │
//! ├─────────────────────────────────────────────────┤
//! │ Wrapped message key (AES-256-GCM, answer key)   │
//! ├─────────────────────────────────────────────────┤
//! │ Answer check (16 bytes)                         │
//! ├─────────────────────────────────────────────────┤
//! │ Encrypted content (AES-256-GCM, message key)    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ### Seal and Open
//!
//! ```rust
//! use towa_crypto::{open, seal, KdfParams, LetterError, SealOptions};
//!
//! let options = SealOptions::default().with_kdf_params(KdfParams::new(1, 1024, 1));
//! let sealed = seal(b"Hello", "favorite color?", "Blue", &options).unwrap();
//!
//! assert_eq!(open(&sealed.envelope, " blue ").unwrap(), b"Hello");
//! assert!(matches!(
//!     open(&sealed.envelope, "red"),
//!     Err(LetterError::WrongAnswer)
//! ));
//! ```
//!
//! ### Find Letters for a Recipient
//!
//! ```rust
//! use towa_crypto::derive_identity_key;
//!
//! let key = derive_identity_key("Yamada Taro", "1990-01-02");
//! assert_eq!(key, derive_identity_key("yamadataro", "19900102"));
//! ```

pub mod cipher;
pub mod discovery;
pub mod envelope;
pub mod error;
pub mod format;
pub mod kdf;
pub mod letter;
pub mod normalize;
pub mod pool;

// Re-export commonly used types
pub use discovery::{derive_bucket_id, derive_identity_key, BucketId, DiscoveryKey};
pub use envelope::{open, seal, seal_with_rng, Envelope, SealOptions, SealedLetter};
pub use error::{CryptoError, CryptoResult, LetterError, LetterResult};
pub use format::{decode_envelope, encode_envelope};
pub use kdf::{derive_key, DerivedKey, KdfParams};
pub use letter::{open_letter, seal_letter, Attachment, LetterContent};
pub use normalize::{normalize_answer, normalize_identity};
pub use pool::{DerivationPool, PoolConfig};

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Full workflow: seal -> encode -> decode -> open, with discovery keys.
    #[test]
    fn test_full_letter_workflow() {
        let options = SealOptions::default().with_kdf_params(KdfParams::new(1, 1024, 1));
        let content = LetterContent::new("<p>See you in ten years</p>");

        let sealed = seal_letter(&content, "Where did we meet?", "Kyoto", &options).unwrap();
        let wire = encode_envelope(&sealed.envelope).unwrap();

        // The wire form carries neither the answer nor the plaintext.
        assert!(!wire.to_lowercase().contains("kyoto"));
        assert!(!wire.contains("ten years"));
        assert!(wire.contains("Where did we meet?"));

        let decoded = decode_envelope(wire.as_bytes()).unwrap();
        assert_eq!(open_letter(&decoded, "kyoto").unwrap(), content);
        assert_eq!(
            sealed.bucket_id,
            derive_bucket_id("Where did we meet?", &normalize_answer("Kyoto"))
        );
    }
}
