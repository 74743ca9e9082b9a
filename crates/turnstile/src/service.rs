//! Lock acquisition, release, and stale reclamation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use turnstile_store::{DocumentStore, Filter, ReaderEntry, ReaderToken, StoreError, Update};

use crate::config::{AcquireOptions, LockConfig};
use crate::error::LockError;

/// Distributed read/write lock service.
///
/// All coordination state lives in the backing store; a `LockService` is a
/// stateless protocol driver and any number of them (in any number of
/// processes) may operate on the same store concurrently.
pub struct LockService<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    config: LockConfig,
}

impl<S: DocumentStore + ?Sized> Clone for LockService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config,
        }
    }
}

impl<S: DocumentStore + ?Sized> LockService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, LockConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: LockConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquire a shared lock on `id` using the configured timing.
    ///
    /// `stale_duration` is the lease: once it elapses, any contender may
    /// prune this read as abandoned. Returns the token that releases
    /// exactly this acquisition.
    pub async fn read_lock(
        &self,
        id: &str,
        stale_duration: Duration,
    ) -> Result<ReaderToken, LockError> {
        self.read_lock_with(id, stale_duration, AcquireOptions::default())
            .await
    }

    /// `read_lock` with per-call poll/timeout overrides.
    pub async fn read_lock_with(
        &self,
        id: &str,
        stale_duration: Duration,
        options: AcquireOptions,
    ) -> Result<ReaderToken, LockError> {
        let stale = lease(stale_duration)?;
        let (poll_interval, timeout) = options.resolve(&self.config);
        let deadline = timeout.map(|t| Instant::now() + t);

        while !expired(deadline) {
            // Fresh token per attempt; a token from a lost attempt never
            // reaches the record.
            let token = ReaderToken::mint();
            let filter = Filter::any().writing(false).write_pending(false);
            let update = Update::new()
                .push_reader(ReaderEntry {
                    token,
                    stale_at: Utc::now() + stale,
                })
                .write_stale_at(None);

            match self.store.upsert(id, filter, update).await {
                Ok(1) => {
                    debug!(id = %id, token = %token, "read lock acquired");
                    return Ok(token);
                }
                Ok(_) => {}
                // A concurrent insert won the unique-key race: ordinary
                // contention, retry without delay.
                Err(StoreError::DuplicateKey) => continue,
                Err(e) => return Err(e.into()),
            }

            if self.clear_stuck_write(id).await? {
                continue;
            }

            tokio::time::sleep(poll_interval).await;
        }

        debug!(id = %id, "read lock timed out");
        Err(LockError::Timeout)
    }

    /// Release the read acquisition identified by `token`.
    ///
    /// Unconditional: releasing an already-pruned token is a no-op. If the
    /// record is left idle, it is garbage-collected.
    pub async fn read_unlock(&self, id: &str, token: ReaderToken) -> Result<(), LockError> {
        self.store
            .update(id, Filter::any(), Update::new().pull_reader(token))
            .await?;
        debug!(id = %id, token = %token, "read lock released");

        // Garbage-collect the record once the last holder is gone. The
        // delete is conditional, so a racing acquisition simply keeps it.
        self.store
            .delete(id, Filter::any().writing(false).readers_empty(true))
            .await?;
        Ok(())
    }

    /// Acquire the exclusive lock on `id` using the configured timing.
    ///
    /// `stale_duration` is the lease: once it elapses, any contender may
    /// reclaim the write as abandoned.
    pub async fn write_lock(&self, id: &str, stale_duration: Duration) -> Result<(), LockError> {
        self.write_lock_with(id, stale_duration, AcquireOptions::default())
            .await
    }

    /// `write_lock` with per-call poll/timeout overrides.
    pub async fn write_lock_with(
        &self,
        id: &str,
        stale_duration: Duration,
        options: AcquireOptions,
    ) -> Result<(), LockError> {
        let stale = lease(stale_duration)?;
        let (poll_interval, timeout) = options.resolve(&self.config);
        let deadline = timeout.map(|t| Instant::now() + t);

        while !expired(deadline) {
            let filter = Filter::any().writing(false).readers_empty(true);
            let update = Update::new()
                .writing(true)
                .write_pending(false)
                .write_stale_at(Some(Utc::now() + stale))
                .clear_readers();

            match self.store.upsert(id, filter, update).await {
                Ok(1) => {
                    debug!(id = %id, "write lock acquired");
                    return Ok(());
                }
                Ok(_) => {}
                Err(StoreError::DuplicateKey) => continue,
                Err(e) => return Err(e.into()),
            }

            if self.clear_stuck_write(id).await? || self.clear_stuck_read(id).await? {
                continue;
            }

            // Advisory deterrent only: discourages new readers while this
            // writer waits. Not required to succeed atomically with
            // anything else.
            self.store
                .update(id, Filter::any(), Update::new().write_pending(true))
                .await?;

            tokio::time::sleep(poll_interval).await;
        }

        // Best-effort: do not leave our deterrent behind, it would starve
        // readers forever. See also clear_stuck_read.
        let _ = self
            .store
            .update(id, Filter::any(), Update::new().write_pending(false))
            .await;

        debug!(id = %id, "write lock timed out");
        Err(LockError::Timeout)
    }

    /// Release the exclusive lock on `id`.
    ///
    /// A writer holds exclusive ownership, so unconditional deletion is
    /// always safe; afterward no record exists for `id`.
    pub async fn write_unlock(&self, id: &str) -> Result<(), LockError> {
        self.store.delete(id, Filter::any()).await?;
        debug!(id = %id, "write lock released");
        Ok(())
    }

    /// Delete the record if its writer's lease has expired. Returns whether
    /// it acted. Recovery from a writer that crashed without releasing.
    pub(crate) async fn clear_stuck_write(&self, id: &str) -> Result<bool, LockError> {
        let now = Utc::now();
        let n = self
            .store
            .delete(id, Filter::any().writing(true).write_stale_by(now))
            .await?;
        if n == 1 {
            warn!(id = %id, "cleared stale write lock");
        }
        Ok(n == 1)
    }

    /// Prune every reader whose lease has expired, in one atomic step.
    /// Returns whether any were removed. Only effective while no writer
    /// holds the lock. Recovery from readers that crashed without
    /// releasing.
    ///
    /// Also resets `write_pending`: a crashed pending writer's flag falls
    /// together with the stale readers of its era, so the flag cannot
    /// starve readers forever.
    pub(crate) async fn clear_stuck_read(&self, id: &str) -> Result<bool, LockError> {
        let now = Utc::now();
        let n = self
            .store
            .update(
                id,
                Filter::any().writing(false).reader_stale_by(now),
                Update::new()
                    .pull_readers_stale_by(now)
                    .write_pending(false),
            )
            .await?;
        if n == 1 {
            warn!(id = %id, "pruned stale read locks");
        }
        Ok(n == 1)
    }
}

/// Convert a caller lease into a chrono span, rejecting the degenerate
/// zero lease (it would make every acquisition instantly reclaimable).
fn lease(stale_duration: Duration) -> Result<chrono::Duration, LockError> {
    if stale_duration.is_zero() {
        return Err(LockError::InvalidArgument(
            "stale_duration must be greater than zero".to_string(),
        ));
    }
    chrono::Duration::from_std(stale_duration)
        .map_err(|_| LockError::InvalidArgument("stale_duration out of range".to_string()))
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnstile_store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, LockService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = LockService::with_config(
            store.clone(),
            LockConfig {
                poll_interval: Duration::from_millis(5),
                timeout: Some(Duration::from_millis(250)),
            },
        );
        (store, service)
    }

    #[tokio::test]
    async fn write_lock_creates_exclusive_record() {
        let (store, service) = service();
        let before = Utc::now();
        service.write_lock("x", Duration::from_secs(1)).await.unwrap();

        let doc = store.find("x").await.unwrap().unwrap();
        assert!(doc.writing);
        assert!(!doc.write_pending);
        assert!(doc.readers.is_empty());
        let lease = doc.write_stale_at.unwrap();
        assert!(lease >= before + chrono::Duration::seconds(1));
        assert!(lease <= Utc::now() + chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn zero_stale_duration_is_rejected() {
        let (_, service) = service();
        let err = service.write_lock("x", Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, LockError::InvalidArgument(_)));

        let err = service.read_lock("x", Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, LockError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn contended_write_sets_pending_and_times_out() {
        let (store, service) = service();
        let token = service.read_lock("x", Duration::from_secs(30)).await.unwrap();

        let err = service
            .write_lock_with(
                "x",
                Duration::from_secs(30),
                AcquireOptions::new().timeout(Duration::from_millis(30)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Timeout));

        // The deterrent was set while waiting, then cleared on the way out.
        let doc = store.find("x").await.unwrap().unwrap();
        assert!(!doc.write_pending);
        assert_eq!(doc.readers.len(), 1);
        assert_eq!(doc.readers[0].token, token);
    }

    #[tokio::test]
    async fn clear_stuck_write_only_acts_on_expired_lease() {
        let (store, service) = service();
        service.write_lock("x", Duration::from_secs(30)).await.unwrap();
        assert!(!service.clear_stuck_write("x").await.unwrap());

        // Force the lease into the past.
        store
            .update(
                "x",
                Filter::any(),
                Update::new().write_stale_at(Some(Utc::now() - chrono::Duration::seconds(1))),
            )
            .await
            .unwrap();
        assert!(service.clear_stuck_write("x").await.unwrap());
        assert!(store.find("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_stuck_read_prunes_and_resets_pending() {
        let (store, service) = service();
        let stale = service.read_lock("x", Duration::from_millis(1)).await.unwrap();
        let fresh = service.read_lock("x", Duration::from_secs(30)).await.unwrap();
        assert_ne!(stale, fresh);

        store
            .update("x", Filter::any(), Update::new().write_pending(true))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.clear_stuck_read("x").await.unwrap());

        let doc = store.find("x").await.unwrap().unwrap();
        assert_eq!(doc.readers.len(), 1);
        assert_eq!(doc.readers[0].token, fresh);
        assert!(!doc.write_pending);

        // Nothing left to prune.
        assert!(!service.clear_stuck_read("x").await.unwrap());
    }
}
