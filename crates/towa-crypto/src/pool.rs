//! Bounded pool for Argon2id-heavy work.
//!
//! Every Seal and Open runs one memory-hard derivation. The pool runs them
//! on tokio's blocking threads behind two semaphores: one caps how many run
//! at once, the other caps their combined memory. Permits move into the
//! blocking task, so abandoning a future never releases memory that is
//! still in use.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use towa_core::defaults::{KDF_MAX_CONCURRENT, KDF_MEMORY_BUDGET_KIB};

use crate::envelope::{self, Envelope, SealOptions, SealedLetter};
use crate::error::{LetterError, LetterResult};
use crate::kdf::KdfParams;

/// Configuration for the derivation pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum derivations running at once.
    pub max_concurrent: usize,
    /// Combined Argon2 memory allowed across running derivations, in KiB.
    pub memory_budget_kib: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: KDF_MAX_CONCURRENT,
            memory_budget_kib: KDF_MEMORY_BUDGET_KIB,
        }
    }
}

impl PoolConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `KDF_MAX_CONCURRENT` | `4` | Max derivations running at once |
    /// | `KDF_MEMORY_BUDGET_KIB` | `262144` | Combined Argon2 memory (256 MiB) |
    pub fn from_env() -> Self {
        let max_concurrent = std::env::var("KDF_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(KDF_MAX_CONCURRENT)
            .max(1);

        let memory_budget_kib = std::env::var("KDF_MEMORY_BUDGET_KIB")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(KDF_MEMORY_BUDGET_KIB)
            .max(8);

        Self {
            max_concurrent,
            memory_budget_kib,
        }
    }

    /// Set maximum concurrent derivations.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the memory budget in KiB.
    pub fn with_memory_budget_kib(mut self, kib: u32) -> Self {
        self.memory_budget_kib = kib;
        self
    }
}

/// Runs Seal and Open with bounded concurrency and memory.
#[derive(Debug, Clone)]
pub struct DerivationPool {
    config: PoolConfig,
    slots: Arc<Semaphore>,
    memory: Arc<Semaphore>,
}

impl DerivationPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent)),
            memory: Arc::new(Semaphore::new(config.memory_budget_kib as usize)),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Derivation slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Memory budget currently free, in KiB.
    pub fn available_memory_kib(&self) -> usize {
        self.memory.available_permits()
    }

    /// Run `work` on a blocking thread once a slot and `params.memory_kib`
    /// of budget are free.
    async fn run<T, F>(&self, params: &KdfParams, work: F) -> LetterResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> LetterResult<T> + Send + 'static,
    {
        if params.memory_kib > self.config.memory_budget_kib {
            return Err(LetterError::InvalidKdfParameters(format!(
                "memory {} KiB exceeds pool budget {} KiB",
                params.memory_kib, self.config.memory_budget_kib
            )));
        }

        let slot = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| LetterError::Primitive(e.to_string()))?;
        let memory = self
            .memory
            .clone()
            .acquire_many_owned(params.memory_kib)
            .await
            .map_err(|e| LetterError::Primitive(e.to_string()))?;

        debug!(
            subsystem = "crypto",
            component = "pool",
            op = "run",
            memory_kib = params.memory_kib,
            available_memory_kib = self.memory.available_permits(),
            "Derivation admitted"
        );

        tokio::task::spawn_blocking(move || {
            let result = work();
            drop(memory);
            drop(slot);
            result
        })
        .await
        .map_err(|e| {
            warn!(
                subsystem = "crypto",
                component = "pool",
                op = "run",
                error = %e,
                "Derivation task failed"
            );
            LetterError::Primitive(e.to_string())
        })?
    }

    /// Seal on the pool.
    pub async fn seal(
        &self,
        plaintext: Vec<u8>,
        question: String,
        answer: String,
        options: SealOptions,
    ) -> LetterResult<SealedLetter> {
        // Oversized input takes no permits and spawns no task.
        if plaintext.len() > options.max_payload_bytes {
            return Err(LetterError::PayloadTooLarge {
                size: plaintext.len(),
                limit: options.max_payload_bytes,
            });
        }

        let params = options.kdf_params;
        let answer = Zeroizing::new(answer);
        self.run(&params, move || {
            envelope::seal(&plaintext, &question, &answer, &options)
        })
        .await
    }

    /// Open on the pool.
    pub async fn open(&self, envelope: Envelope, answer: &str) -> LetterResult<Vec<u8>> {
        let params = envelope.kdf_params;
        let answer = Zeroizing::new(answer.to_string());
        self.run(&params, move || envelope::open(&envelope, &answer))
            .await
    }

    /// Try one answer against several candidates.
    ///
    /// Returns the index of the first candidate that opens together with its
    /// plaintext. When none opens, returns [`LetterError::WrongAnswer`] if
    /// any candidate rejected the answer, otherwise the first error seen.
    pub async fn open_any(
        &self,
        candidates: Vec<Envelope>,
        answer: &str,
    ) -> LetterResult<(usize, Vec<u8>)> {
        if candidates.is_empty() {
            return Err(LetterError::InvalidInput("no candidates to open".into()));
        }

        let mut attempts: FuturesUnordered<_> = candidates
            .into_iter()
            .enumerate()
            .map(|(index, envelope)| async move { (index, self.open(envelope, answer).await) })
            .collect();

        let mut wrong_answer = false;
        let mut first_error = None;

        while let Some((index, result)) = attempts.next().await {
            match result {
                Ok(plaintext) => {
                    debug!(
                        subsystem = "crypto",
                        component = "pool",
                        op = "open_any",
                        candidate = index,
                        "Candidate opened"
                    );
                    return Ok((index, plaintext));
                }
                Err(LetterError::WrongAnswer) => wrong_answer = true,
                Err(e) => {
                    debug!(
                        subsystem = "crypto",
                        component = "pool",
                        op = "open_any",
                        candidate = index,
                        error = %e,
                        "Candidate failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match (wrong_answer, first_error) {
            (true, _) | (false, None) => Err(LetterError::WrongAnswer),
            (false, Some(e)) => Err(e),
        }
    }
}

impl Default for DerivationPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
