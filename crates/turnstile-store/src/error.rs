//! Store error types.

/// Errors surfaced by a `DocumentStore` backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A concurrent insert raced on the unique key during an upsert.
    ///
    /// This is an expected contention signal, not a failure: callers retry
    /// the conditional operation immediately.
    #[error("duplicate key: a concurrent insert won the race")]
    DuplicateKey,

    /// Any other backend failure; propagated verbatim to the caller.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is the expected unique-key contention signal.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey)
    }
}
