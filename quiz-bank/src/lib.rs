//! Quiz Bank - validated question items and their persisted corpus
//!
//! This crate owns everything that decides whether a generated question is
//! fit to reach a learner:
//!
//! - **Types**: [`Item`], [`Choice`], [`Category`] and the untrusted [`Candidate`]
//! - **Schema validation**: [`SchemaValidator`] checks structure before admission
//! - **Near-duplicate detection**: [`DuplicateDetector`] scores bigram similarity
//! - **Item store**: [`ItemStore`] is the append-only, category-partitioned corpus
//!
//! # Example
//!
//! ```ignore
//! use quiz_bank::{Category, DuplicateDetector, ItemStore, SchemaValidator};
//!
//! let store = ItemStore::open("questions.json").await?;
//! let validator = SchemaValidator::default();
//! let detector = DuplicateDetector::default();
//!
//! if validator.validate(&candidate) {
//!     store.admit(Category::NeetUg, candidate, &detector).await?;
//! }
//! ```

pub mod similarity;
pub mod store;
pub mod types;
pub mod validate;

// Re-export main types
pub use similarity::{dice_coefficient, DuplicateDetector, SimilarityMatch};
pub use store::{Admission, ItemStore, StoreError};
pub use types::*;
pub use validate::{SchemaValidator, ValidationFailure};
