//! Supply controller - batch acquisition, fast initial fetch, and
//! coalesced background backfill.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use quiz_agent::AcquisitionGateway;
use quiz_bank::{
    Admission, Candidate, Category, DuplicateDetector, Item, ItemStore, SchemaValidator,
    SimilarityMatch, ValidationFailure,
};

use crate::config::SupplyConfig;
use crate::inflight::InflightSet;
use crate::policy::{BackfillPolicy, BufferReport};
use crate::resolution::{CategoryStream, DuplicateDecision, SeenSet};
use crate::types::{
    BatchOutcome, Delivery, DuplicateOutcome, InitialItem, ItemSource, Result, SupplyError,
};

/// What a single candidate turned into.
#[derive(Debug)]
enum Screening {
    Admitted(Item),
    Invalid(ValidationFailure),
    Duplicate(SimilarityMatch),
}

/// Result of asking for a backfill.
#[derive(Debug)]
pub enum BackfillTrigger {
    /// The buffer is deep enough
    NotNeeded,
    /// A loop for this category is already running
    AlreadyInFlight,
    /// A new loop was spawned
    Started(BackfillHandle),
}

impl BackfillTrigger {
    /// The spawned loop's handle, if one was started.
    pub fn into_handle(self) -> Option<BackfillHandle> {
        match self {
            BackfillTrigger::Started(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Handle to a running backfill loop.
#[derive(Debug)]
pub struct BackfillHandle(JoinHandle<()>);

impl BackfillHandle {
    /// Wait for the loop to finish and its items to be queued.
    pub async fn join(self) {
        if let Err(e) = self.0.await {
            warn!(error = %e, "Backfill task did not complete");
        }
    }
}

/// Orchestrates acquisition, validation, deduplication, and delivery.
///
/// Cheap to clone; clones share the store, the in-flight set, and the
/// per-category delivery streams.
#[derive(Clone)]
pub struct SupplyController {
    config: Arc<SupplyConfig>,
    gateway: Arc<AcquisitionGateway>,
    store: Arc<ItemStore>,
    validator: SchemaValidator,
    detector: DuplicateDetector,
    policy: BackfillPolicy,
    inflight: InflightSet,
    streams: Arc<DashMap<Category, CategoryStream>>,
}

impl SupplyController {
    /// Create a controller with default configuration.
    pub fn new(gateway: Arc<AcquisitionGateway>, store: Arc<ItemStore>) -> Self {
        Self::with_config(gateway, store, SupplyConfig::default())
    }

    /// Create a controller with configuration.
    pub fn with_config(
        gateway: Arc<AcquisitionGateway>,
        store: Arc<ItemStore>,
        config: SupplyConfig,
    ) -> Self {
        Self {
            validator: SchemaValidator::new(config.validation.require_single_correct),
            detector: DuplicateDetector::with_threshold(config.validation.duplicate_threshold),
            policy: BackfillPolicy::from(&config.buffer),
            config: Arc::new(config),
            gateway,
            store,
            inflight: InflightSet::new(),
            streams: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &SupplyConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    /// Acquire up to `count` new items for `category`.
    ///
    /// Each attempt is validated then deduplicated against the category's
    /// stored items, and admitted items are persisted before the next
    /// attempt. Rejected candidates are skipped. The loop stops at `count`
    /// admissions or after `count * max_attempts_per_item` attempts, so a
    /// generator that keeps repeating itself yields a short batch rather
    /// than an endless loop.
    ///
    /// A timeout ends the batch early with what was admitted so far. Other
    /// upstream failures do the same once something has been admitted, and
    /// are returned as errors otherwise.
    pub async fn request_batch(&self, category: Category, count: usize) -> Result<BatchOutcome> {
        let started = Instant::now();
        let mut outcome = BatchOutcome::empty(category);
        if count == 0 {
            return Ok(outcome);
        }

        let max_attempts = count.saturating_mul(self.config.acquisition.max_attempts_per_item);
        let timeout = self.config.acquisition.backfill_timeout();

        while outcome.items.len() < count && outcome.attempts < max_attempts {
            outcome.attempts += 1;

            let candidate = match self.gateway.acquire(category, timeout).await {
                Ok(candidate) => candidate,
                Err(e) if e.is_timeout() || !outcome.items.is_empty() => {
                    warn!(
                        category = %category,
                        admitted = outcome.items.len(),
                        error = %e,
                        "Batch ended early"
                    );
                    outcome.interrupted = Some(e);
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            match self.screen(category, candidate).await? {
                Screening::Admitted(item) => {
                    debug!(category = %category, item_id = %item.id, "Candidate admitted");
                    outcome.items.push(item);
                }
                Screening::Invalid(reason) => {
                    warn!(category = %category, reason = %reason, "Skipping invalid candidate");
                    outcome.skipped_invalid += 1;
                }
                Screening::Duplicate(found) => {
                    warn!(
                        category = %category,
                        score = found.score,
                        "Skipping near-duplicate candidate"
                    );
                    outcome.skipped_duplicate += 1;
                }
            }
        }

        outcome.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            category = %category,
            requested = count,
            admitted = outcome.items.len(),
            attempts = outcome.attempts,
            skipped = outcome.skipped(),
            elapsed_ms = outcome.elapsed_ms,
            "Batch complete"
        );
        Ok(outcome)
    }

    /// Produce one item quickly.
    ///
    /// A single acquisition is bounded by `initial_timeout_ms`. A fresh item
    /// starts a background backfill of `initial_backfill` items. When the
    /// bound elapses, or the candidate is rejected, a random stored item of
    /// the category is returned instead. Other upstream failures propagate.
    pub async fn request_initial(&self, category: Category) -> Result<InitialItem> {
        let timeout = self.config.acquisition.initial_timeout();

        match self.gateway.acquire(category, Some(timeout)).await {
            Ok(candidate) => match self.screen(category, candidate).await? {
                Screening::Admitted(item) => {
                    info!(category = %category, item_id = %item.id, "Initial item generated");
                    let backfill = self
                        .spawn_backfill(category, self.config.buffer.initial_backfill)
                        .into_handle();
                    Ok(InitialItem {
                        item,
                        source: ItemSource::Fresh,
                        backfill,
                    })
                }
                Screening::Invalid(reason) => {
                    warn!(category = %category, reason = %reason, "Initial candidate invalid, falling back");
                    self.fallback(category).await
                }
                Screening::Duplicate(found) => {
                    warn!(category = %category, score = found.score, "Initial candidate duplicate, falling back");
                    self.fallback(category).await
                }
            },
            Err(e) if e.is_timeout() => {
                warn!(category = %category, ?timeout, "Initial fetch timed out, falling back");
                self.fallback(category).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A random valid stored item of `category`.
    pub async fn random_from_store(&self, category: Category) -> Option<Item> {
        self.store.random(category, &self.validator).await
    }

    /// Start a backfill if `report` calls for one.
    ///
    /// Triggers for a category that already has a loop running are no-ops.
    /// Admitted items are queued for [`collect`](Self::collect).
    pub fn maintain_buffer(&self, category: Category, report: BufferReport) -> BackfillTrigger {
        if !self.policy.should_backfill(report) {
            return BackfillTrigger::NotNeeded;
        }
        debug!(
            category = %category,
            consumed = report.consumed,
            remaining = report.remaining,
            "Buffer low"
        );
        self.spawn_backfill(category, self.config.buffer.backfill_batch)
    }

    /// Whether a backfill loop is running for `category`.
    pub fn backfill_in_flight(&self, category: Category) -> bool {
        self.inflight.contains(category)
    }

    /// Backfilled items not yet collected.
    pub fn pending(&self, category: Category) -> usize {
        self.streams
            .get(&category)
            .map(|stream| stream.pending_len())
            .unwrap_or(0)
    }

    /// Hand queued backfill items to the consumer.
    ///
    /// Items in `seen` are withheld; the first becomes the flagged item and
    /// the rest wait until it is resolved.
    pub fn collect(&self, category: Category, seen: &SeenSet) -> Delivery {
        let mut stream = self.streams.entry(category).or_default();
        let items = stream.drain(seen);
        Delivery {
            items,
            flagged: stream.flagged().cloned(),
        }
    }

    /// Apply the consumer's decision to the flagged item of `category`.
    pub async fn resolve_duplicate(
        &self,
        category: Category,
        decision: DuplicateDecision,
    ) -> Result<DuplicateOutcome> {
        let (flagged, next_flag) = {
            let mut stream = self.streams.entry(category).or_default();
            let flagged = stream.take_flag();
            (flagged, stream.flagged().cloned())
        };

        let Some(flagged) = flagged else {
            debug!(category = %category, "No flagged item to resolve");
            return Ok(DuplicateOutcome::default());
        };

        let appended = match decision {
            DuplicateDecision::AdmitAnyway => vec![flagged],
            DuplicateDecision::RequestReplacement => {
                debug!(category = %category, item_id = %flagged.id, "Replacing flagged item");
                self.request_batch(category, 1).await?.items
            }
        };

        Ok(DuplicateOutcome {
            appended,
            next_flag,
        })
    }

    fn spawn_backfill(&self, category: Category, count: usize) -> BackfillTrigger {
        if count == 0 {
            return BackfillTrigger::NotNeeded;
        }
        let Some(guard) = self.inflight.try_acquire(category) else {
            debug!(category = %category, "Backfill already in flight");
            return BackfillTrigger::AlreadyInFlight;
        };

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            match controller.request_batch(category, count).await {
                Ok(outcome) => {
                    controller
                        .streams
                        .entry(category)
                        .or_default()
                        .enqueue(outcome.items);
                }
                Err(e) => warn!(category = %category, error = %e, "Backfill failed"),
            }
        });

        BackfillTrigger::Started(BackfillHandle(handle))
    }

    async fn fallback(&self, category: Category) -> Result<InitialItem> {
        match self.random_from_store(category).await {
            Some(item) => {
                info!(category = %category, item_id = %item.id, "Serving stored item");
                Ok(InitialItem {
                    item,
                    source: ItemSource::Fallback,
                    backfill: None,
                })
            }
            None => Err(SupplyError::Exhausted(category)),
        }
    }

    async fn screen(&self, category: Category, candidate: Candidate) -> Result<Screening> {
        if let Err(reason) = self.validator.check(&candidate) {
            return Ok(Screening::Invalid(reason));
        }
        Ok(match self.store.admit(category, candidate, &self.detector).await? {
            Admission::Admitted(item) => Screening::Admitted(item),
            Admission::Duplicate(found) => Screening::Duplicate(found),
        })
    }
}
