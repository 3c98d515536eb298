//! Consumer-side duplicate resolution for backfilled items.
//!
//! Backfilled batches are screened against what the consumer has already
//! seen. Clean items go straight to the consumer; an already-seen item is
//! flagged and waits for a [`DuplicateDecision`]. Only one item is flagged at
//! a time and further matches are held back until the flag is resolved.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use quiz_bank::Item;

/// Ids and texts the consumer has already been shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenSet {
    #[serde(default)]
    ids: HashSet<String>,
    #[serde(default)]
    texts: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item by both id and text.
    pub fn mark(&mut self, item: &Item) {
        self.ids.insert(item.id.clone());
        self.texts.insert(item.primary_text.clone());
    }

    pub fn insert_id(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn insert_text(&mut self, text: impl Into<String>) {
        self.texts.insert(text.into());
    }

    /// Whether the item's id or exact text has been seen.
    pub fn contains(&self, item: &Item) -> bool {
        self.ids.contains(&item.id) || self.texts.contains(&item.primary_text)
    }

    pub fn len(&self) -> usize {
        self.ids.len().max(self.texts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.texts.is_empty()
    }
}

impl<'a> FromIterator<&'a Item> for SeenSet {
    fn from_iter<I: IntoIterator<Item = &'a Item>>(iter: I) -> Self {
        let mut seen = SeenSet::new();
        for item in iter {
            seen.mark(item);
        }
        seen
    }
}

/// The consumer's answer to a flagged duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDecision {
    /// Append the flagged item anyway
    AdmitAnyway,
    /// Discard it and fetch one replacement
    RequestReplacement,
}

/// A batch split against a [`SeenSet`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Unseen items, in batch order
    pub clean: Vec<Item>,
    /// First seen item
    pub flagged: Option<Item>,
    /// Later seen items, in batch order
    pub held: Vec<Item>,
}

/// Splits backfilled batches into clean and already-seen items.
pub struct DuplicateResolver;

impl DuplicateResolver {
    pub fn resolve(batch: Vec<Item>, seen: &SeenSet) -> Resolution {
        let mut resolution = Resolution::default();
        for item in batch {
            if !seen.contains(&item) {
                resolution.clean.push(item);
            } else if resolution.flagged.is_none() {
                resolution.flagged = Some(item);
            } else {
                resolution.held.push(item);
            }
        }
        resolution
    }
}

/// Per-category delivery state between backfills and the consumer.
#[derive(Debug, Default)]
pub(crate) struct CategoryStream {
    pending: Vec<Item>,
    flagged: Option<Item>,
    held: VecDeque<Item>,
}

impl CategoryStream {
    /// Queue a finished backfill batch at the tail.
    pub fn enqueue(&mut self, items: Vec<Item>) {
        self.pending.extend(items);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn flagged(&self) -> Option<&Item> {
        self.flagged.as_ref()
    }

    /// Drain pending items through the resolver. Returns the clean ones.
    pub fn drain(&mut self, seen: &SeenSet) -> Vec<Item> {
        let batch = std::mem::take(&mut self.pending);
        let resolution = DuplicateResolver::resolve(batch, seen);

        let mut matched: VecDeque<Item> = resolution.flagged.into_iter().collect();
        matched.extend(resolution.held);
        if self.flagged.is_none() {
            self.flagged = matched.pop_front();
        }
        self.held.extend(matched);

        resolution.clean
    }

    /// Clear the current flag and surface the next held item, if any.
    pub fn take_flag(&mut self) -> Option<Item> {
        let flagged = self.flagged.take()?;
        self.flagged = self.held.pop_front();
        Some(flagged)
    }
}
