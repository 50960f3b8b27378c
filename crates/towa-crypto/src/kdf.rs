//! Key derivation using Argon2id.
//!
//! The answer to a personal question is low-entropy; the memory-hard cost
//! here is the only thing standing between a stolen envelope and an offline
//! dictionary attack. Parameters travel with each envelope so they can be
//! raised for new letters without breaking old ones.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use towa_core::defaults::{
    KDF_ITERATIONS, KDF_MAX_ITERATIONS, KDF_MAX_MEMORY_KIB, KDF_MAX_PARALLELISM, KDF_MEMORY_KIB,
    KDF_PARALLELISM,
};

use crate::error::{CryptoError, CryptoResult, LetterError, LetterResult};

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct KdfParams {
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Parallelism degree (default: 1).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: KDF_ITERATIONS,
            memory_kib: KDF_MEMORY_KIB,
            parallelism: KDF_PARALLELISM,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32, memory_kib: u32, parallelism: u32) -> Self {
        Self {
            iterations,
            memory_kib,
            parallelism,
        }
    }

    /// Lighter parameters for interactive use on constrained devices.
    pub fn interactive() -> Self {
        Self {
            iterations: 2,
            memory_kib: 19456, // 19 MiB
            parallelism: 1,
        }
    }

    /// Create high-security parameters (for letters meant to last decades).
    pub fn high_security() -> Self {
        Self {
            iterations: 4,
            memory_kib: 262144, // 256 MiB
            parallelism: 1,
        }
    }

    /// Check the parameters against Argon2's limits and the accepted bounds.
    ///
    /// Called before any salt is generated or data is touched; never falls
    /// back to weaker parameters.
    pub fn validate(&self) -> LetterResult<()> {
        if self.memory_kib > KDF_MAX_MEMORY_KIB {
            return Err(LetterError::InvalidKdfParameters(format!(
                "memory {} KiB exceeds maximum {} KiB",
                self.memory_kib, KDF_MAX_MEMORY_KIB
            )));
        }
        if self.iterations > KDF_MAX_ITERATIONS {
            return Err(LetterError::InvalidKdfParameters(format!(
                "iterations {} exceeds maximum {}",
                self.iterations, KDF_MAX_ITERATIONS
            )));
        }
        if self.parallelism > KDF_MAX_PARALLELISM {
            return Err(LetterError::InvalidKdfParameters(format!(
                "parallelism {} exceeds maximum {}",
                self.parallelism, KDF_MAX_PARALLELISM
            )));
        }
        self.argon2_params()
            .map(|_| ())
            .map_err(|e| LetterError::InvalidKdfParameters(e.to_string()))
    }

    fn argon2_params(&self) -> CryptoResult<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from a normalized secret using Argon2id.
///
/// Deterministic for identical inputs. Parameter errors surface as
/// [`CryptoError::KeyDerivation`]; callers validate with
/// [`KdfParams::validate`] first to report them as configuration errors.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(secret, salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey { key })
}
