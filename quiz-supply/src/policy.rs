//! When the consumer's lookahead buffer needs more items.

use serde::{Deserialize, Serialize};

use crate::config::BufferConfig;

/// Where the consumer stands in its buffered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferReport {
    /// Items the consumer has already moved past
    pub consumed: usize,
    /// Items still ahead of the consumer
    pub remaining: usize,
}

impl BufferReport {
    pub fn new(consumed: usize, remaining: usize) -> Self {
        Self {
            consumed,
            remaining,
        }
    }
}

/// Backfill triggers.
///
/// Any one of these firing is enough:
/// - fewer than `low_water_mark` items remain
/// - exactly `early_checkpoint` items have been consumed
/// - `remaining` is within `tail_margin` of the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillPolicy {
    pub low_water_mark: usize,
    pub early_checkpoint: usize,
    pub tail_margin: usize,
}

impl Default for BackfillPolicy {
    fn default() -> Self {
        Self::from(&BufferConfig::default())
    }
}

impl From<&BufferConfig> for BackfillPolicy {
    fn from(config: &BufferConfig) -> Self {
        Self {
            low_water_mark: config.low_water_mark,
            early_checkpoint: config.early_checkpoint,
            tail_margin: config.tail_margin,
        }
    }
}

impl BackfillPolicy {
    /// Whether `report` calls for a backfill.
    pub fn should_backfill(&self, report: BufferReport) -> bool {
        report.remaining < self.low_water_mark
            || report.consumed == self.early_checkpoint
            || report.remaining <= self.tail_margin
    }
}
