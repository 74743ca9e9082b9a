//! In-process store backend.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::document::LockDocument;
use crate::error::StoreError;
use crate::ops::{Filter, Update};
use crate::store::DocumentStore;

/// In-process `DocumentStore` over a concurrent map.
///
/// Each operation runs under the map's per-entry guard, so every call is
/// atomic with respect to all others, matching what a real document store
/// provides across processes. Useful for tests and for single-process
/// deployments that still want the lock protocol's semantics.
///
/// The entry API closes the insert race entirely, so this backend never
/// returns `StoreError::DuplicateKey`; networked backends do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: DashMap<String, LockDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored. Test visibility.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, id: &str, filter: Filter, update: Update) -> Result<u64, StoreError> {
        match self.docs.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let doc = occupied.get_mut();
                if filter.matches(doc) {
                    update.apply(doc);
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            Entry::Vacant(vacant) => {
                let mut doc = LockDocument::unlocked(id);
                update.apply(&mut doc);
                vacant.insert(doc);
                Ok(1)
            }
        }
    }

    async fn update(&self, id: &str, filter: Filter, update: Update) -> Result<u64, StoreError> {
        match self.docs.get_mut(id) {
            Some(mut doc) => {
                if filter.matches(&doc) {
                    update.apply(&mut doc);
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &str, filter: Filter) -> Result<u64, StoreError> {
        let removed = self.docs.remove_if(id, |_, doc| filter.matches(doc));
        Ok(u64::from(removed.is_some()))
    }

    async fn find(&self, id: &str) -> Result<Option<LockDocument>, StoreError> {
        Ok(self.docs.get(id).map(|doc| doc.value().clone()))
    }
}
