//! # Media Cache
//!
//! **Subsystem ID:** 3
//!
//! Catalog searches return different projections of the same record: a
//! name search knows titles, a tag search knows the caller's tags, a full
//! fetch knows everything. They arrive at different times and in any order.
//! This crate folds them into one entry per media id.
//!
//! ## Merge Rules
//!
//! - A field is *known* when it is present and non-empty.
//! - An incoming known field replaces the cached one.
//! - An incoming unknown field never replaces anything.
//! - Ids not yet cached are inserted as they come.
//!
//! Merging is therefore idempotent and monotonic: re-applying a batch
//! changes nothing, and no known field ever becomes unknown through a merge.
//!
//! ## Selection
//!
//! At most one cached record is selected. Evicting it clears the selection.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cache;
pub mod errors;
pub mod record;

pub use cache::{MediaCache, MergeStats};
pub use errors::CacheError;
pub use record::PartialMediaRecord;
