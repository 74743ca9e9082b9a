//! Lock engine error types.

use turnstile_store::StoreError;

/// Errors returned by the lock service.
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    /// The caller's deadline elapsed without acquisition. Recoverable:
    /// retry with a fresh deadline.
    #[error("timed out waiting for lock")]
    Timeout,

    /// Malformed acquisition parameters; raised at call entry, never
    /// retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A store failure other than the expected unique-key conflict,
    /// propagated verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),
}
