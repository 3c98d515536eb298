//! Core types for the supply pipeline.

use serde::{Deserialize, Serialize};

use quiz_agent::AcquireError;
use quiz_bank::{Category, Item, StoreError, UnknownCategory};

use crate::controller::BackfillHandle;

/// Where an initial item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Generated and admitted for this request
    Fresh,
    /// Picked from the store after the live fetch timed out or was rejected
    Fallback,
}

/// Result of the consumer-facing initial fetch.
#[derive(Debug, Serialize)]
pub struct InitialItem {
    pub item: Item,
    pub source: ItemSource,
    /// Background backfill started by a fresh item
    #[serde(skip)]
    pub backfill: Option<BackfillHandle>,
}

/// Result of one batch acquisition loop.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Category the batch was requested for
    pub category: Category,
    /// Newly admitted items, in acquisition order
    pub items: Vec<Item>,
    /// Wall-clock time of the whole loop
    pub elapsed_ms: u64,
    /// Generator calls made
    pub attempts: usize,
    /// Candidates dropped by the schema validator
    pub skipped_invalid: usize,
    /// Candidates dropped as near-duplicates
    pub skipped_duplicate: usize,
    /// Failure that ended the loop early, if any
    #[serde(skip)]
    pub interrupted: Option<AcquireError>,
}

impl BatchOutcome {
    /// An outcome with nothing admitted yet.
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            items: Vec::new(),
            elapsed_ms: 0,
            attempts: 0,
            skipped_invalid: 0,
            skipped_duplicate: 0,
            interrupted: None,
        }
    }

    /// Total candidates dropped.
    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_duplicate
    }
}

/// Backfilled items handed to the consumer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Delivery {
    /// Items to append at the tail of the consumer's queue
    pub items: Vec<Item>,
    /// Already-seen item awaiting the consumer's decision
    pub flagged: Option<Item>,
}

/// Result of resolving a flagged duplicate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateOutcome {
    /// Items to append at the tail of the consumer's queue
    pub appended: Vec<Item>,
    /// Next held-back duplicate, now flagged
    pub next_flag: Option<Item>,
}

/// Error types for the supply pipeline.
///
/// Per-candidate rejections never appear here; they are absorbed as skips.
#[derive(Debug, thiserror::Error)]
pub enum SupplyError {
    /// No live item and nothing stored to fall back on
    #[error("No stored items available for {0}")]
    Exhausted(Category),

    /// Generator call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Generator answered with an unparseable body
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Item store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Category outside the recognised set
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
}

impl From<AcquireError> for SupplyError {
    fn from(error: AcquireError) -> Self {
        match error {
            AcquireError::MalformedResponse(msg) => SupplyError::MalformedResponse(msg),
            AcquireError::Upstream(msg) => SupplyError::Upstream(msg),
            timeout @ AcquireError::Timeout(_) => SupplyError::Upstream(timeout.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupplyError>;
