//! At most one backfill per category at a time.

use dashmap::DashSet;
use std::sync::Arc;
use tracing::trace;

use quiz_bank::Category;

/// Categories with a backfill loop currently running.
#[derive(Debug, Clone, Default)]
pub struct InflightSet {
    active: Arc<DashSet<Category>>,
}

impl InflightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `category`. `None` when a loop is already running for it.
    pub fn try_acquire(&self, category: Category) -> Option<InflightGuard> {
        if !self.active.insert(category) {
            return None;
        }
        trace!(category = %category, "Backfill slot claimed");
        Some(InflightGuard {
            active: self.active.clone(),
            category,
        })
    }

    pub fn contains(&self, category: Category) -> bool {
        self.active.contains(&category)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Releases the category's slot when dropped, including on panic or abort.
#[derive(Debug)]
pub struct InflightGuard {
    active: Arc<DashSet<Category>>,
    category: Category,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.category);
        trace!(category = %self.category, "Backfill slot released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_refused() {
        let set = InflightSet::new();
        let guard = set.try_acquire(Category::NeetUg);
        assert!(guard.is_some());
        assert!(set.try_acquire(Category::NeetUg).is_none());
        assert!(set.contains(Category::NeetUg));
    }

    #[test]
    fn test_categories_are_independent() {
        let set = InflightSet::new();
        let _ug = set.try_acquire(Category::NeetUg).unwrap();
        let _pg = set.try_acquire(Category::NeetPg).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_drop_releases() {
        let set = InflightSet::new();
        {
            let _guard = set.try_acquire(Category::Upsc).unwrap();
        }
        assert!(set.is_empty());
        assert!(set.try_acquire(Category::Upsc).is_some());
    }
}
