//! The atomic document store seam.

use async_trait::async_trait;

use crate::document::LockDocument;
use crate::error::StoreError;
use crate::ops::{Filter, Update};

/// Atomic conditional operations over lock documents, keyed by id.
///
/// Every method is a single indivisible step with respect to all other
/// calls against the same store: no third party can observe a document
/// mid-mutation. This is the only concurrency primitive the lock engine
/// relies on; correctness across independent processes rests entirely on
/// the backend honoring these semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert-if-absent-else-update-if-matching.
    ///
    /// If a document with `id` exists and matches `filter`, apply `update`
    /// and return 1. If it exists but does not match, return 0. If no
    /// document exists, insert a fresh unlocked document with `update`
    /// applied and return 1.
    ///
    /// Backends where the insert path can race a concurrent insert on the
    /// unique key must surface that race as `StoreError::DuplicateKey`.
    async fn upsert(&self, id: &str, filter: Filter, update: Update) -> Result<u64, StoreError>;

    /// Apply `update` to the document with `id` if it exists and matches
    /// `filter`; never inserts. Returns the matched count (0 or 1).
    async fn update(&self, id: &str, filter: Filter, update: Update) -> Result<u64, StoreError>;

    /// Delete the document with `id` if it exists and matches `filter`.
    /// Returns the deleted count (0 or 1).
    async fn delete(&self, id: &str, filter: Filter) -> Result<u64, StoreError>;

    /// Point read of the document with `id`.
    async fn find(&self, id: &str) -> Result<Option<LockDocument>, StoreError>;
}
