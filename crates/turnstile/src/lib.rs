//! Turnstile - distributed read/write locks over an atomic document store
//!
//! Many independent processes request shared (read) or exclusive (write)
//! access to a resource identified by an opaque key. All mutual exclusion
//! is enforced by the backing store's atomic conditional operations; no
//! in-process synchronization is involved, so the same protocol works
//! across hosts that share nothing but the store.
//!
//! Acquisition is optimistic-retry polling: each call computes one
//! absolute deadline at entry and retries at a fixed interval until it
//! succeeds or times out. Leases (`stale_duration`) guard against holders
//! that crash without releasing: once a lease expires, any contender may
//! reclaim the lock.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use turnstile::{LockService, MemoryStore};
//!
//! # async fn example() -> Result<(), turnstile::LockError> {
//! let service = LockService::new(Arc::new(MemoryStore::new()));
//!
//! service.write_lock("orders", Duration::from_secs(30)).await?;
//! // ... exclusive section ...
//! service.write_unlock("orders").await?;
//!
//! let token = service.read_lock("orders", Duration::from_secs(30)).await?;
//! // ... shared section ...
//! service.read_unlock("orders", token).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;

// Re-exports for convenience
pub use config::{AcquireOptions, LockConfig, Timeout};
pub use error::LockError;
pub use service::LockService;
pub use turnstile_store::{
    DocumentStore, Filter, LockDocument, MemoryStore, ReaderEntry, ReaderToken, StoreError, Update,
};
