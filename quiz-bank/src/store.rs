//! Append-only item store.
//!
//! Items are partitioned by [`Category`] and persisted as one JSON document
//! (`{ "questions": [...] }`). Every admission flushes the whole document to
//! a temporary file which is then renamed over the original.
//!
//! Records that no longer parse as items are kept verbatim and written back
//! in their original position, so nothing on disk is ever dropped.
//!
//! Deduplication happens inside [`ItemStore::admit`] under the write lock, so
//! concurrent admissions for the same category can never both slip past the
//! detector, and ids are issued exactly once.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::similarity::{DuplicateDetector, SimilarityMatch};
use crate::types::{Candidate, Category, Item};
use crate::validate::SchemaValidator;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file or a candidate could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Persisted under a freshly issued id
    Admitted(Item),
    /// Too similar to an item already stored in the category
    Duplicate(SimilarityMatch),
}

#[derive(Deserialize, Default)]
struct StoredDocument {
    #[serde(default)]
    questions: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    questions: Vec<RecordRef<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RecordRef<'a> {
    Item(&'a Item),
    Raw(&'a serde_json::Value),
}

/// Durable keyed collection of admitted items.
pub struct ItemStore {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    /// Items in admission order
    items: RwLock<Vec<Item>>,
    /// Unreadable records with their position in the loaded document
    retained: Vec<(usize, serde_json::Value)>,
}

impl ItemStore {
    /// Create an empty store that is never flushed.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            items: RwLock::new(Vec::new()),
            retained: Vec::new(),
        }
    }

    /// Create an in-memory store seeded with items.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            path: None,
            items: RwLock::new(items),
            retained: Vec::new(),
        }
    }

    /// Load the store at `path`, or start empty if the file does not exist.
    ///
    /// Records that no longer parse as items are not served, but are kept
    /// and written back on every flush.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoredDocument::default(),
            Ok(bytes) => serde_json::from_slice::<StoredDocument>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredDocument::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut items = Vec::with_capacity(document.questions.len());
        let mut retained = Vec::new();
        for (index, record) in document.questions.into_iter().enumerate() {
            match Item::deserialize(&record) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(index, error = %e, "Retaining unreadable stored item");
                    retained.push((index, record));
                }
            }
        }

        info!(
            path = %path.display(),
            items = items.len(),
            retained = retained.len(),
            "Opened item store"
        );

        Ok(Self {
            path: Some(path),
            items: RwLock::new(items),
            retained,
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Admit a validated candidate unless it duplicates a stored item of the
    /// same category.
    ///
    /// Callers must have validated the candidate first.
    pub async fn admit(
        &self,
        category: Category,
        candidate: Candidate,
        detector: &DuplicateDetector,
    ) -> Result<Admission, StoreError> {
        let mut items = self.items.write().await;

        let text = candidate.primary_text().unwrap_or_default().to_string();
        let corpus = items
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.primary_text.as_str());
        if let Some(found) = detector.find_duplicate(&text, corpus) {
            return Ok(Admission::Duplicate(found));
        }

        let id = loop {
            let id = uuid::Uuid::new_v4().to_string();
            if !items.iter().any(|i| i.id == id) {
                break id;
            }
        };

        let mut item = candidate.into_item(id, category)?;
        item.created_at = Some(chrono::Utc::now());
        items.push(item.clone());

        if let Err(e) = self.flush(&items).await {
            items.pop();
            return Err(e);
        }

        debug!(item_id = %item.id, category = %category, "Item admitted to store");
        Ok(Admission::Admitted(item))
    }

    /// All items of a category, in admission order.
    pub async fn by_category(&self, category: Category) -> Vec<Item> {
        let items = self.items.read().await;
        items
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect()
    }

    /// Question texts of a category, in admission order.
    pub async fn texts_for(&self, category: Category) -> Vec<String> {
        let items = self.items.read().await;
        items
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.primary_text.clone())
            .collect()
    }

    /// Whether an item with this id exists.
    pub async fn exists(&self, id: &str) -> bool {
        let items = self.items.read().await;
        items.iter().any(|i| i.id == id)
    }

    /// Look up an item by id.
    pub async fn get(&self, id: &str) -> Option<Item> {
        let items = self.items.read().await;
        items.iter().find(|i| i.id == id).cloned()
    }

    /// Uniformly random item of a category that still passes `validator`.
    pub async fn random(&self, category: Category, validator: &SchemaValidator) -> Option<Item> {
        let items = self.items.read().await;
        let eligible: Vec<&Item> = items
            .iter()
            .filter(|i| i.category == category && validator.validate(&i.to_candidate()))
            .collect();
        eligible.choose(&mut rand::thread_rng()).map(|i| (*i).clone())
    }

    /// Number of stored records that could not be read as items.
    pub fn unreadable(&self) -> usize {
        self.retained.len()
    }

    /// Total number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Item counts per category.
    pub async fn counts(&self) -> BTreeMap<Category, usize> {
        let items = self.items.read().await;
        let mut counts = BTreeMap::new();
        for item in items.iter() {
            *counts.entry(item.category).or_insert(0) += 1;
        }
        counts
    }

    /// Write the full document to disk. Called with the write lock held.
    async fn flush(&self, items: &[Item]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let document = StoredDocumentRef {
            questions: document_order(&self.retained, items),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        Ok(())
    }
}

/// Interleave retained raw records back at their original positions.
fn document_order<'a>(
    retained: &'a [(usize, serde_json::Value)],
    items: &'a [Item],
) -> Vec<RecordRef<'a>> {
    let mut records = Vec::with_capacity(retained.len() + items.len());
    let mut retained = retained.iter().peekable();
    for item in items {
        while let Some((_, raw)) = retained.next_if(|(index, _)| *index <= records.len()) {
            records.push(RecordRef::Raw(raw));
        }
        records.push(RecordRef::Item(item));
    }
    records.extend(retained.map(|(_, raw)| RecordRef::Raw(raw)));
    records
}
