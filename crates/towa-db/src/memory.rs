//! In-memory implementation of every collaborator trait.
//!
//! Used by tests and by the server when no `DATABASE_URL` is configured.
//! Nothing survives a restart.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use towa_core::{
    new_v7, Candidate, ContentStore, CostStats, DiscoveryIndex, Error, LetterRecord, LetterStats,
    NewLetter, Opening, OpeningLog, OpeningStats, PublicStats, Result, StatsRepository,
    TelemetryEvent, TelemetrySink,
};

#[derive(Default)]
struct Inner {
    blobs: HashMap<Uuid, Vec<u8>>,
    letters: HashMap<Uuid, LetterRecord>,
    openings: Vec<Opening>,
    telemetry: Vec<(Uuid, TelemetryEvent)>,
}

/// Volatile store backing all collaborator traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub async fn blob_count(&self) -> usize {
        self.inner.read().await.blobs.len()
    }

    /// Recorded telemetry events, oldest first.
    pub async fn telemetry_events(&self) -> Vec<TelemetryEvent> {
        self.inner
            .read()
            .await
            .telemetry
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, data: &[u8]) -> Result<Uuid> {
        let id = new_v7();
        self.inner.write().await.blobs.insert(id, data.to_vec());
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Vec<u8>> {
        self.inner
            .read()
            .await
            .blobs
            .get(&id)
            .cloned()
            .ok_or(Error::LetterNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.write().await.blobs.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl DiscoveryIndex for MemoryStore {
    async fn put(&self, letter: NewLetter) -> Result<LetterRecord> {
        let mut inner = self.inner.write().await;
        if inner.letters.contains_key(&letter.id) {
            return Err(Error::Conflict(format!("letter {} already indexed", letter.id)));
        }
        let record = LetterRecord::from_new(letter, Utc::now());
        inner.letters.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self, discovery_key: &str, limit: i64) -> Result<Vec<Candidate>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<&LetterRecord> = inner
            .letters
            .values()
            .filter(|r| r.discovery_key == discovery_key)
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches
            .into_iter()
            .take(limit.max(0) as usize)
            .map(LetterRecord::candidate)
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<LetterRecord>> {
        Ok(self.inner.read().await.letters.get(&id).cloned())
    }
}

#[async_trait]
impl OpeningLog for MemoryStore {
    async fn record(&self, letter_id: Uuid, opener_id: &str) -> Result<Opening> {
        let mut inner = self.inner.write().await;
        if !inner.letters.contains_key(&letter_id) {
            return Err(Error::LetterNotFound(letter_id));
        }
        if inner
            .openings
            .iter()
            .any(|o| o.letter_id == letter_id && o.opener_id == opener_id)
        {
            return Err(Error::Conflict("Already opened".to_string()));
        }
        let opening = Opening {
            id: new_v7(),
            letter_id,
            opener_id: opener_id.to_string(),
            opened_at: Utc::now(),
        };
        inner.openings.push(opening.clone());
        Ok(opening)
    }
}

#[async_trait]
impl TelemetrySink for MemoryStore {
    async fn record(&self, event: TelemetryEvent) -> Result<Uuid> {
        let id = new_v7();
        self.inner.write().await.telemetry.push((id, event));
        Ok(id)
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn public_stats(&self) -> Result<PublicStats> {
        let inner = self.inner.read().await;

        // Anonymous letters stay out of the letter and cost figures.
        let attributed: Vec<_> = inner
            .letters
            .values()
            .filter(|r| r.sender_id.is_some())
            .collect();
        let letter_count = attributed.len() as i64;
        let unique_senders = attributed
            .iter()
            .filter_map(|r| r.sender_id.as_deref())
            .collect::<HashSet<_>>()
            .len() as i64;
        let total_fiat: f64 = attributed.iter().map(|r| r.cost_fiat).sum();

        let unique_openers = inner
            .openings
            .iter()
            .map(|o| o.opener_id.as_str())
            .collect::<HashSet<_>>()
            .len() as i64;

        Ok(PublicStats {
            letters: LetterStats {
                count: letter_count,
                unique_senders,
            },
            openings: OpeningStats {
                count: inner.openings.len() as i64,
                unique_openers,
            },
            cost: CostStats::from_totals(total_fiat, letter_count),
        })
    }
}
