//! Letter envelope sealing and opening.
//!
//! # Envelope Flow
//!
//! 1. Normalize the answer and derive the wrapping key with Argon2id
//!    (fresh 32-byte salt).
//! 2. Generate a random 32-byte message key.
//! 3. Encrypt the content under the message key (AES-256-GCM).
//! 4. Wrap the message key under the wrapping key (AES-256-GCM).
//! 5. Commit to the wrapping key with a short answer check.
//!
//! Both AEAD layers authenticate the public header (version, question, salt
//! and KDF parameters), so none of it can be swapped without detection.
//!
//! On Open both the answer check and the key wrap are tried with the derived
//! key. Only when both reject it is the answer wrong; any other failure
//! means the envelope was altered after sealing.

use std::time::Instant;

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use towa_core::defaults::MAX_PAYLOAD_BYTES;

use crate::cipher::{self, NONCE_LEN, TAG_LEN};
use crate::discovery::{derive_bucket_id, BucketId};
use crate::error::{LetterError, LetterResult};
use crate::kdf::{derive_key, DerivedKey, KdfParams, KEY_LEN, SALT_LEN};
use crate::normalize::normalize_answer;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Answer check length in bytes.
pub const ANSWER_CHECK_LEN: usize = 16;

const HEADER_DOMAIN: &[u8] = b"towa/envelope/v1";
const ANSWER_CHECK_DOMAIN: &[u8] = b"towa/answer-check/v1";
const LAYER_WRAP: u8 = 0x01;
const LAYER_CONTENT: u8 = 0x02;

/// A sealed letter. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u32,
    /// Security question, stored in the clear.
    pub question: String,
    pub salt: [u8; SALT_LEN],
    pub kdf_params: KdfParams,
    pub wrapped_message_key: [u8; KEY_LEN],
    pub wrap_iv: [u8; NONCE_LEN],
    pub wrap_tag: [u8; TAG_LEN],
    pub answer_check: [u8; ANSWER_CHECK_LEN],
    pub encrypted_content: Vec<u8>,
    pub content_iv: [u8; NONCE_LEN],
    pub content_tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Associated data for one AEAD layer.
    fn associated_data(&self, layer: u8) -> Vec<u8> {
        header_aad(
            self.version,
            &self.question,
            &self.salt,
            &self.kdf_params,
            layer,
        )
    }
}

/// Options for [`seal`].
#[derive(Debug, Clone)]
pub struct SealOptions {
    pub kdf_params: KdfParams,
    /// Largest plaintext accepted, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            kdf_params: KdfParams::default(),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

impl SealOptions {
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }
}

/// Output of [`seal`].
#[derive(Debug, Clone)]
pub struct SealedLetter {
    pub envelope: Envelope,
    /// Answer-bound bucket id. Client-side only; never uploaded.
    pub bucket_id: BucketId,
}

fn header_aad(
    version: u32,
    question: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
    layer: u8,
) -> Vec<u8> {
    let mut aad = Vec::with_capacity(HEADER_DOMAIN.len() + 4 + 4 + question.len() + 32 + 12 + 1);
    aad.extend_from_slice(HEADER_DOMAIN);
    aad.extend_from_slice(&version.to_be_bytes());
    aad.extend_from_slice(&(question.len() as u32).to_be_bytes());
    aad.extend_from_slice(question.as_bytes());
    aad.extend_from_slice(salt);
    aad.extend_from_slice(&params.iterations.to_be_bytes());
    aad.extend_from_slice(&params.memory_kib.to_be_bytes());
    aad.extend_from_slice(&params.parallelism.to_be_bytes());
    aad.push(layer);
    aad
}

fn answer_check(key: &DerivedKey) -> [u8; ANSWER_CHECK_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(ANSWER_CHECK_DOMAIN);
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let mut check = [0u8; ANSWER_CHECK_LEN];
    check.copy_from_slice(&digest[..ANSWER_CHECK_LEN]);
    check
}

/// Seal `plaintext` so that only `answer` opens it.
pub fn seal(
    plaintext: &[u8],
    question: &str,
    answer: &str,
    options: &SealOptions,
) -> LetterResult<SealedLetter> {
    seal_with_rng(&mut rand::thread_rng(), plaintext, question, answer, options)
}

/// [`seal`] with an explicit randomness source.
///
/// Inputs are checked before anything is drawn from `rng`.
pub fn seal_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    plaintext: &[u8],
    question: &str,
    answer: &str,
    options: &SealOptions,
) -> LetterResult<SealedLetter> {
    if plaintext.len() > options.max_payload_bytes {
        return Err(LetterError::PayloadTooLarge {
            size: plaintext.len(),
            limit: options.max_payload_bytes,
        });
    }
    options.kdf_params.validate()?;
    if question.trim().is_empty() {
        return Err(LetterError::InvalidInput("question is required".into()));
    }
    let answer_norm = Zeroizing::new(normalize_answer(answer));
    if answer_norm.is_empty() {
        return Err(LetterError::InvalidInput("answer is required".into()));
    }

    let start = Instant::now();
    let params = options.kdf_params;

    let salt: [u8; SALT_LEN] = cipher::generate_random_with(rng);
    let answer_key = derive_key(answer_norm.as_bytes(), &salt, &params)?;
    let message_key: Zeroizing<[u8; KEY_LEN]> = Zeroizing::new(cipher::generate_random_with(rng));

    let content_aad = header_aad(ENVELOPE_VERSION, question, &salt, &params, LAYER_CONTENT);
    let content = cipher::encrypt_with_rng(rng, &message_key, plaintext, &content_aad)?;

    let wrap_aad = header_aad(ENVELOPE_VERSION, question, &salt, &params, LAYER_WRAP);
    let wrapped = cipher::encrypt_with_rng(rng, answer_key.as_bytes(), &message_key[..], &wrap_aad)?;

    let mut wrapped_message_key = [0u8; KEY_LEN];
    if wrapped.ciphertext.len() != KEY_LEN {
        return Err(LetterError::Primitive(format!(
            "wrapped key has {} bytes",
            wrapped.ciphertext.len()
        )));
    }
    wrapped_message_key.copy_from_slice(&wrapped.ciphertext);

    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        question: question.to_string(),
        salt,
        kdf_params: params,
        wrapped_message_key,
        wrap_iv: wrapped.iv,
        wrap_tag: wrapped.tag,
        answer_check: answer_check(&answer_key),
        encrypted_content: content.ciphertext,
        content_iv: content.iv,
        content_tag: content.tag,
    };
    let bucket_id = derive_bucket_id(question, &answer_norm);

    debug!(
        subsystem = "crypto",
        component = "envelope",
        op = "seal",
        content_bytes = plaintext.len(),
        memory_kib = params.memory_kib,
        iterations = params.iterations,
        duration_ms = start.elapsed().as_millis() as u64,
        "Letter sealed"
    );

    Ok(SealedLetter {
        envelope,
        bucket_id,
    })
}

/// Open an envelope with a submitted answer.
///
/// Returns [`LetterError::WrongAnswer`] only when neither the answer check
/// nor the key wrap accepts the derived key. Any other authentication
/// failure is [`LetterError::CorruptEnvelope`].
pub fn open(envelope: &Envelope, answer: &str) -> LetterResult<Vec<u8>> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(LetterError::MalformedEnvelope(format!(
            "unsupported version {}",
            envelope.version
        )));
    }
    envelope.kdf_params.validate()?;

    let start = Instant::now();
    let answer_norm = Zeroizing::new(normalize_answer(answer));
    let answer_key = derive_key(answer_norm.as_bytes(), &envelope.salt, &envelope.kdf_params)?;

    let check_matches =
        bool::from(answer_check(&answer_key)[..].ct_eq(&envelope.answer_check[..]));
    let unwrapped = cipher::decrypt(
        answer_key.as_bytes(),
        &envelope.wrapped_message_key,
        &envelope.wrap_iv,
        &envelope.wrap_tag,
        &envelope.associated_data(LAYER_WRAP),
    )
    .map(Zeroizing::new);

    // The wrap authenticating under this key proves the answer, so a stale
    // answerCheck is corruption, not a wrong answer.
    let message_key = match (check_matches, unwrapped) {
        (true, Ok(message_key)) => message_key,
        (false, Err(_)) => {
            debug!(
                subsystem = "crypto",
                component = "envelope",
                op = "open",
                duration_ms = start.elapsed().as_millis() as u64,
                "Answer check did not match"
            );
            return Err(LetterError::WrongAnswer);
        }
        (false, Ok(_)) => {
            warn!(
                subsystem = "crypto",
                component = "envelope",
                op = "open",
                layer = "answer_check",
                "Answer check corrupted but key wrap authenticated"
            );
            return Err(LetterError::CorruptEnvelope);
        }
        (true, Err(_)) => {
            warn!(
                subsystem = "crypto",
                component = "envelope",
                op = "open",
                layer = "wrap",
                "Envelope failed authentication after answer check passed"
            );
            return Err(LetterError::CorruptEnvelope);
        }
    };

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    if message_key.len() != KEY_LEN {
        return Err(LetterError::CorruptEnvelope);
    }
    key.copy_from_slice(&message_key);

    let plaintext = cipher::decrypt(
        &key,
        &envelope.encrypted_content,
        &envelope.content_iv,
        &envelope.content_tag,
        &envelope.associated_data(LAYER_CONTENT),
    )
    .map_err(|_| {
        warn!(
            subsystem = "crypto",
            component = "envelope",
            op = "open",
            layer = "content",
            "Envelope failed authentication after answer check passed"
        );
        LetterError::CorruptEnvelope
    })?;

    debug!(
        subsystem = "crypto",
        component = "envelope",
        op = "open",
        content_bytes = plaintext.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Letter opened"
    );

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn fast_options() -> SealOptions {
        SealOptions::default().with_kdf_params(KdfParams::new(1, 1024, 1))
    }

    /// RNG wrapper that counts how many bytes were drawn.
    struct CountingRng {
        inner: StdRng,
        drawn: usize,
    }

    impl CountingRng {
        fn new() -> Self {
            Self {
                inner: StdRng::seed_from_u64(7),
                drawn: 0,
            }
        }
    }

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.drawn += 4;
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.drawn += 8;
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.drawn += dest.len();
            self.inner.fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.drawn += dest.len();
            self.inner.try_fill_bytes(dest)
        }
    }

    impl CryptoRng for CountingRng {}

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(b"Dear future me", "favorite color?", "Blue", &fast_options()).unwrap();
        let plaintext = open(&sealed.envelope, "Blue").unwrap();
        assert_eq!(plaintext, b"Dear future me");
    }

    #[test]
    fn test_open_accepts_equivalent_answer() {
        let sealed = seal(b"hi", "favorite color?", "Sky Blue", &fast_options()).unwrap();
        assert_eq!(open(&sealed.envelope, "  skyblue ").unwrap(), b"hi");
        assert_eq!(open(&sealed.envelope, "SKY\tBLUE").unwrap(), b"hi");
    }

    #[test]
    fn test_wrong_answer() {
        let sealed = seal(b"secret", "favorite color?", "Blue", &fast_options()).unwrap();
        let result = open(&sealed.envelope, "Red");
        assert!(matches!(result, Err(LetterError::WrongAnswer)));
    }

    #[test]
    fn test_empty_answer_on_open_is_wrong_answer() {
        let sealed = seal(b"secret", "q?", "Blue", &fast_options()).unwrap();
        assert!(matches!(
            open(&sealed.envelope, "   "),
            Err(LetterError::WrongAnswer)
        ));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let sealed = seal(b"", "q?", "a", &fast_options()).unwrap();
        assert!(sealed.envelope.encrypted_content.is_empty());
        assert!(open(&sealed.envelope, "a").unwrap().is_empty());
    }

    #[test]
    fn test_bucket_id_uses_normalized_answer() {
        let sealed = seal(b"x", "favorite color?", " Blue ", &fast_options()).unwrap();
        assert_eq!(sealed.bucket_id.as_str(), "c846a2865247a8d9");
    }

    #[test]
    fn test_tampered_content_is_corrupt() {
        let mut sealed = seal(b"secret", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.encrypted_content[0] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::CorruptEnvelope)
        ));
    }

    #[test]
    fn test_tampered_content_tag_is_corrupt() {
        let mut sealed = seal(b"secret", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.content_tag[0] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::CorruptEnvelope)
        ));
    }

    #[test]
    fn test_tampered_wrapped_key_is_corrupt() {
        let mut sealed = seal(b"secret", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.wrapped_message_key[31] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::CorruptEnvelope)
        ));
    }

    #[test]
    fn test_tampered_wrap_tag_is_corrupt() {
        let mut sealed = seal(b"secret", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.wrap_tag[15] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::CorruptEnvelope)
        ));
    }

    #[test]
    fn test_tampered_answer_check_is_corrupt() {
        let mut sealed = seal(b"Hello", "favorite color?", "Blue", &fast_options()).unwrap();
        sealed.envelope.answer_check[0] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "blue"),
            Err(LetterError::CorruptEnvelope)
        ));
        assert!(matches!(
            open(&sealed.envelope, "red"),
            Err(LetterError::WrongAnswer)
        ));
    }

    #[test]
    fn test_tampered_question_is_corrupt() {
        let mut sealed = seal(b"secret", "favorite color?", "a", &fast_options()).unwrap();
        sealed.envelope.question = "favourite colour?".to_string();
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::CorruptEnvelope)
        ));
    }

    #[test]
    fn test_tampered_salt_is_wrong_answer() {
        let mut sealed = seal(b"secret", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.salt[0] ^= 0x01;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::WrongAnswer)
        ));
    }

    #[test]
    fn test_nonces_unique_across_seals() {
        let options = fast_options();
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let sealed = seal(b"x", "q?", "a", &options).unwrap();
            assert!(seen.insert(sealed.envelope.wrap_iv));
            assert!(seen.insert(sealed.envelope.content_iv));
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn test_same_inputs_give_different_envelopes() {
        let options = fast_options();
        let a = seal(b"x", "q?", "a", &options).unwrap();
        let b = seal(b"x", "q?", "a", &options).unwrap();
        assert_ne!(a.envelope.salt, b.envelope.salt);
        assert_ne!(a.envelope.wrapped_message_key, b.envelope.wrapped_message_key);
        assert_eq!(a.bucket_id, b.bucket_id);
    }

    #[test]
    fn test_payload_at_limit_succeeds() {
        let options = fast_options().with_max_payload_bytes(64);
        let sealed = seal(&[7u8; 64], "q?", "a", &options).unwrap();
        assert_eq!(sealed.envelope.encrypted_content.len(), 64);
    }

    #[test]
    fn test_payload_over_limit_draws_no_randomness() {
        let options = fast_options().with_max_payload_bytes(64);
        let mut rng = CountingRng::new();
        let result = seal_with_rng(&mut rng, &[7u8; 65], "q?", "a", &options);
        assert!(matches!(
            result,
            Err(LetterError::PayloadTooLarge {
                size: 65,
                limit: 64
            })
        ));
        assert_eq!(rng.drawn, 0);
    }

    #[test]
    fn test_seal_draws_expected_randomness() {
        let mut rng = CountingRng::new();
        seal_with_rng(&mut rng, b"x", "q?", "a", &fast_options()).unwrap();
        // salt + message key + two nonces
        assert_eq!(rng.drawn, 32 + 32 + 12 + 12);
    }

    #[test]
    fn test_invalid_kdf_params_rejected_before_randomness() {
        let options = SealOptions::default().with_kdf_params(KdfParams::new(0, 1024, 1));
        let mut rng = CountingRng::new();
        let result = seal_with_rng(&mut rng, b"x", "q?", "a", &options);
        assert!(matches!(result, Err(LetterError::InvalidKdfParameters(_))));
        assert_eq!(rng.drawn, 0);
    }

    #[test]
    fn test_empty_question_rejected() {
        let result = seal(b"x", "  ", "a", &fast_options());
        assert!(matches!(result, Err(LetterError::InvalidInput(_))));
    }

    #[test]
    fn test_blank_answer_rejected() {
        let result = seal(b"x", "q?", " \u{3000} ", &fast_options());
        assert!(matches!(result, Err(LetterError::InvalidInput(_))));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut sealed = seal(b"x", "q?", "a", &fast_options()).unwrap();
        sealed.envelope.version = 2;
        assert!(matches!(
            open(&sealed.envelope, "a"),
            Err(LetterError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_scenario_default_parameters() {
        let options = SealOptions::default();
        assert_eq!(options.kdf_params, KdfParams::new(3, 65536, 1));

        let sealed = seal(b"Hello", "favorite color?", "Blue", &options).unwrap();
        assert_eq!(sealed.envelope.question, "favorite color?");
        assert_eq!(sealed.bucket_id.as_str(), "c846a2865247a8d9");
        assert_eq!(open(&sealed.envelope, "blue").unwrap(), b"Hello");
        assert!(matches!(
            open(&sealed.envelope, "red"),
            Err(LetterError::WrongAnswer)
        ));
    }
}
