//! Server-side record models.
//!
//! These describe what the backend stores *about* a letter. None of them
//! carry key material or plaintext: the letter itself is an opaque blob in
//! the content store, and the only human-readable field is the security
//! question, which is public by design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// LETTERS
// =============================================================================

/// Storage cost attributed to a letter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterCost {
    /// Cost in AR.
    pub ar: f64,
    /// Cost in USD.
    pub fiat: f64,
}

/// A letter about to be indexed.
///
/// `id` is the retrieval identifier handed out by the content store.
#[derive(Debug, Clone)]
pub struct NewLetter {
    pub id: Uuid,
    pub discovery_key: String,
    pub question: String,
    pub bytes: i64,
    pub cost: LetterCost,
    pub sender_id: Option<String>,
    pub mirror_opt_in: bool,
}

/// An indexed letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRecord {
    pub id: Uuid,
    pub discovery_key: String,
    pub question: String,
    pub bytes: i64,
    pub cost_ar: f64,
    pub cost_fiat: f64,
    pub sender_id: Option<String>,
    pub mirror_opt_in: bool,
    pub mirror_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LetterRecord {
    /// Build the stored record for a new letter at `created_at`.
    pub fn from_new(letter: NewLetter, created_at: DateTime<Utc>) -> Self {
        let mirror_id = letter
            .mirror_opt_in
            .then(|| format!("mirror_{}", letter.id));
        Self {
            id: letter.id,
            discovery_key: letter.discovery_key,
            question: letter.question,
            bytes: letter.bytes,
            cost_ar: letter.cost.ar,
            cost_fiat: letter.cost.fiat,
            sender_id: letter.sender_id,
            mirror_opt_in: letter.mirror_opt_in,
            mirror_id,
            created_at,
        }
    }

    /// The reader-facing view of this record.
    pub fn candidate(&self) -> Candidate {
        Candidate {
            letter_id: self.id,
            question: self.question.clone(),
            created_at: self.created_at,
        }
    }
}

/// A letter offered to a reader for an identity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub letter_id: Uuid,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// OPENINGS
// =============================================================================

/// A recorded "letter opened" event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opening {
    pub id: Uuid,
    pub letter_id: Uuid,
    pub opener_id: String,
    pub opened_at: DateTime<Utc>,
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Telemetry event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    /// A letter was stored.
    Sent,
    /// An identity lookup returned candidates.
    Found,
    /// A reader opened a letter.
    Decrypt,
    /// A page or stats view.
    View,
    /// A status probe.
    Status,
}

impl TelemetryKind {
    /// All kinds, in declaration order.
    pub const ALL: [TelemetryKind; 5] = [
        TelemetryKind::Sent,
        TelemetryKind::Found,
        TelemetryKind::Decrypt,
        TelemetryKind::View,
        TelemetryKind::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryKind::Sent => "sent",
            TelemetryKind::Found => "found",
            TelemetryKind::Decrypt => "decrypt",
            TelemetryKind::View => "view",
            TelemetryKind::Status => "status",
        }
    }
}

impl std::fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TelemetryKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TelemetryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Invalid event type: {}", s)))
    }
}

/// A telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event: TelemetryKind,
    pub letter_id: Option<Uuid>,
    pub discovery_key: Option<String>,
    pub value: Option<f64>,
    pub meta: Option<JsonValue>,
}

impl TelemetryEvent {
    /// Event with no attached letter, key, value or metadata.
    pub fn new(event: TelemetryKind) -> Self {
        Self {
            event,
            letter_id: None,
            discovery_key: None,
            value: None,
            meta: None,
        }
    }

    pub fn with_letter(mut self, letter_id: Uuid) -> Self {
        self.letter_id = Some(letter_id);
        self
    }

    pub fn with_discovery_key(mut self, key: impl Into<String>) -> Self {
        self.discovery_key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_meta(mut self, meta: JsonValue) -> Self {
        self.meta = Some(meta);
        self
    }
}

// =============================================================================
// FEES & MODERATION
// =============================================================================

/// Per-currency cost breakdown of a fee estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeCost {
    pub ar: f64,
    pub usd: f64,
    pub jpy: f64,
}

/// Exchange rates used for a fee estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRates {
    pub ar_per_byte: f64,
    pub ar_to_usd: f64,
    pub usd_to_jpy: f64,
}

/// Estimated storage fee for a payload size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub bytes: u64,
    pub cost: FeeCost,
    pub rates: FeeRates,
    pub network: String,
    pub timestamp: DateTime<Utc>,
}

/// Input to a moderation check.
#[derive(Debug, Clone, Default)]
pub struct ModerationRequest {
    /// Text to check (draft content, or the public question).
    pub text: String,
    /// Number of attachments.
    pub attachment_count: usize,
    /// Total attachment bytes.
    pub attachment_bytes: u64,
}

/// Moderation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub approved: bool,
    pub confidence: f64,
    pub flags: Vec<String>,
    pub message: String,
}

// =============================================================================
// STATS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterStats {
    pub count: i64,
    pub unique_senders: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningStats {
    pub count: i64,
    pub unique_openers: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostStats {
    pub total_fiat: f64,
    pub avg_per_letter: f64,
}

impl CostStats {
    /// Totals rounded to cents; the average is zero when there are no letters.
    pub fn from_totals(total_fiat: f64, letter_count: i64) -> Self {
        let avg = if letter_count > 0 {
            total_fiat / letter_count as f64
        } else {
            0.0
        };
        Self {
            total_fiat: round_to(total_fiat, 2),
            avg_per_letter: round_to(avg, 2),
        }
    }
}

/// Public, aggregate-only statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicStats {
    pub letters: LetterStats,
    pub openings: OpeningStats,
    pub cost: CostStats,
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
