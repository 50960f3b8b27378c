//! AES-256-GCM cipher operations.
//!
//! Tags are kept detached from the ciphertext so the envelope can carry them
//! as separate fields.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::{CryptoRng, RngCore};

use crate::error::{CryptoError, CryptoResult};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// GCM tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Generate random bytes from a caller-supplied source.
pub fn generate_random_with<const N: usize, R: RngCore + CryptoRng>(rng: &mut R) -> [u8; N] {
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Ciphertext with its nonce and detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadOutput {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

/// Encrypt under a fresh random nonce from the thread RNG.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> CryptoResult<AeadOutput> {
    encrypt_with_rng(&mut rand::thread_rng(), key, plaintext, aad)
}

/// Encrypt under a fresh nonce drawn from `rng`.
///
/// The ciphertext has the same length as the plaintext; the 16-byte tag
/// authenticates both the ciphertext and `aad`.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<AeadOutput> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let iv: [u8; NONCE_LEN] = generate_random_with(rng);
    let mut buffer = plaintext.to_vec();

    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), aad, &mut buffer)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(AeadOutput {
        ciphertext: buffer,
        iv,
        tag: tag_bytes,
    })
}

/// Decrypt and verify a detached-tag ciphertext.
///
/// Any mismatch in key, nonce, tag, ciphertext or associated data yields
/// [`CryptoError::Authentication`] and no plaintext.
pub fn decrypt(
    key: &[u8; KEY_LEN],
    ciphertext: &[u8],
    iv: &[u8; NONCE_LEN],
    tag: &[u8; TAG_LEN],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Authentication)?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer, Tag::from_slice(tag))
        .map_err(|_| CryptoError::Authentication)?;

    Ok(buffer)
}
