//! Quiz Supply - buffered, de-duplicated question supply
//!
//! Keeps a consumer stocked with exam questions:
//! - Batch acquisition with validation and near-duplicate rejection
//! - A time-bounded initial fetch that falls back to stored items
//! - Background backfill, at most one loop per category
//! - Consumer-side resolution of backfilled items it has already seen
//!
//! # Architecture
//!
//! ```text
//!   consumer ──► SupplyController ──► AcquisitionGateway ──► generator
//!                  │        ▲
//!                  │        │ Delivery / flagged duplicate
//!                  ▼        │
//!   SchemaValidator ─► ItemStore (dedup + persist, per category)
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod inflight;
pub mod policy;
pub mod resolution;
pub mod types;

pub use config::SupplyConfig;
pub use controller::{BackfillHandle, BackfillTrigger, SupplyController};
pub use inflight::{InflightGuard, InflightSet};
pub use policy::{BackfillPolicy, BufferReport};
pub use resolution::{DuplicateDecision, DuplicateResolver, Resolution, SeenSet};
pub use types::*;
