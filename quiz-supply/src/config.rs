//! Configuration for the supply pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{Result, SupplyError};

/// Configuration for a supply controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// Acquisition configuration
    pub acquisition: AcquisitionConfig,
    /// Lookahead buffer configuration
    pub buffer: BufferConfig,
    /// Validation and deduplication configuration
    pub validation: ValidationConfig,
    /// Item store configuration
    pub store: StoreConfig,
    /// Generator sampling configuration
    pub generator: GeneratorConfig,
}

impl SupplyConfig {
    /// Load config from YAML text.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SupplyError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&yaml)
            .map_err(|e| SupplyError::Config(format!("parsing {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.acquisition.initial_timeout_ms == 0 {
            return Err(SupplyError::Config(
                "acquisition.initial_timeout_ms must be positive".to_string(),
            ));
        }
        if self.acquisition.max_attempts_per_item == 0 {
            return Err(SupplyError::Config(
                "acquisition.max_attempts_per_item must be at least 1".to_string(),
            ));
        }
        let threshold = self.validation.duplicate_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SupplyError::Config(format!(
                "validation.duplicate_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.store.path.trim().is_empty() {
            return Err(SupplyError::Config("store.path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Bound on the consumer-facing initial fetch (ms)
    pub initial_timeout_ms: u64,
    /// Bound on each backfill acquisition (ms); unbounded when absent
    pub backfill_timeout_ms: Option<u64>,
    /// Acquisition attempts allowed per requested item before a batch
    /// settles for fewer items
    pub max_attempts_per_item: usize,
    /// Batch size when a caller does not specify one
    pub default_batch_size: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            initial_timeout_ms: 2000,
            backfill_timeout_ms: None,
            max_attempts_per_item: 3,
            default_batch_size: 5,
        }
    }
}

impl AcquisitionConfig {
    /// Initial fetch bound.
    pub fn initial_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_timeout_ms)
    }

    /// Backfill bound, if any.
    pub fn backfill_timeout(&self) -> Option<Duration> {
        self.backfill_timeout_ms.map(Duration::from_millis)
    }
}

/// Lookahead buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Backfill when fewer than this many items remain
    pub low_water_mark: usize,
    /// Backfill right after this many items have been consumed
    pub early_checkpoint: usize,
    /// Backfill whenever remaining items are within this margin of the end
    pub tail_margin: usize,
    /// Items fetched in the background after a fresh initial item
    pub initial_backfill: usize,
    /// Items fetched per buffer-triggered backfill
    pub backfill_batch: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            low_water_mark: 15,
            early_checkpoint: 2,
            tail_margin: 3,
            initial_backfill: 4,
            backfill_batch: 3,
        }
    }
}

/// Validation and deduplication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Similarity above which a candidate is a duplicate
    pub duplicate_threshold: f64,
    /// Require exactly one option marked correct
    pub require_single_correct: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: quiz_bank::similarity::DEFAULT_DUPLICATE_THRESHOLD,
            require_single_correct: true,
        }
    }
}

/// Item store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON document backing the store
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "questions.json".to_string(),
        }
    }
}

/// Generator sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let defaults = quiz_agent::GatewayConfig::default();
        Self {
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }
}

impl From<&GeneratorConfig> for quiz_agent::GatewayConfig {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}
