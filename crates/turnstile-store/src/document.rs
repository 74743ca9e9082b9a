//! Persisted lock record.
//!
//! The layout of `LockDocument` is the durable contract of the lock
//! protocol: any external tool reading the store directly must honor it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier minted per read-lock acquisition.
///
/// Used only for exact-match removal by `read_unlock`; holders must treat
/// it as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReaderToken(Uuid);

impl ReaderToken {
    /// Mint a fresh, globally unique token.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ReaderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One active shared holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderEntry {
    /// Token returned to the holder by `read_lock`.
    pub token: ReaderToken,
    /// Instant at which this read is considered stale and may be pruned.
    #[serde(rename = "staleAt")]
    pub stale_at: DateTime<Utc>,
}

/// The lock record, one per lock id, keyed by `id` in the store.
///
/// Invariants:
/// - `writing == true` implies `readers` is empty and `write_stale_at` is set
/// - `writing == false` implies `write_stale_at` is `None`
/// - absence of a document for an id is the fully unlocked state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDocument {
    /// Store-native unique key identifying the protected resource.
    pub id: String,
    /// True while a writer holds exclusive access.
    pub writing: bool,
    /// Advisory flag set by a blocked writer to deter new readers.
    #[serde(rename = "writePending")]
    pub write_pending: bool,
    /// Lease expiry of the current writer; `None` unless `writing`.
    #[serde(rename = "writeStaleAt")]
    pub write_stale_at: Option<DateTime<Utc>>,
    /// Active shared holders, in acquisition order; empty while `writing`.
    pub readers: Vec<ReaderEntry>,
}

impl LockDocument {
    /// A fresh, fully unlocked record for `id`.
    pub fn unlocked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            writing: false,
            write_pending: false,
            write_stale_at: None,
            readers: Vec::new(),
        }
    }

    /// True when no holder remains and no writer is waiting; such a record
    /// is eligible for garbage collection.
    pub fn is_idle(&self) -> bool {
        !self.writing && !self.write_pending && self.readers.is_empty()
    }

    /// True when the writer's lease expired at or before `now`.
    pub fn write_stale(&self, now: DateTime<Utc>) -> bool {
        self.writing && self.write_stale_at.is_some_and(|at| at <= now)
    }

    /// True when at least one reader entry is stale at or before `now`.
    pub fn has_stale_reader(&self, now: DateTime<Utc>) -> bool {
        self.readers.iter().any(|r| r.stale_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn tokens_are_unique() {
        let a = ReaderToken::mint();
        let b = ReaderToken::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn unlocked_document_is_idle() {
        let doc = LockDocument::unlocked("res");
        assert!(doc.is_idle());
        assert!(!doc.writing);
        assert!(doc.write_stale_at.is_none());
        assert!(doc.readers.is_empty());
    }

    #[test]
    fn write_staleness() {
        let now = Utc::now();
        let mut doc = LockDocument::unlocked("res");
        doc.writing = true;
        doc.write_stale_at = Some(now - Duration::seconds(1));
        assert!(doc.write_stale(now));

        doc.write_stale_at = Some(now + Duration::seconds(10));
        assert!(!doc.write_stale(now));

        // A non-writing record is never write-stale, whatever the timestamp.
        doc.writing = false;
        doc.write_stale_at = Some(now - Duration::seconds(1));
        assert!(!doc.write_stale(now));
    }

    #[test]
    fn stale_reader_detection() {
        let now = Utc::now();
        let mut doc = LockDocument::unlocked("res");
        doc.readers.push(ReaderEntry {
            token: ReaderToken::mint(),
            stale_at: now + Duration::seconds(30),
        });
        assert!(!doc.has_stale_reader(now));

        doc.readers.push(ReaderEntry {
            token: ReaderToken::mint(),
            stale_at: now - Duration::seconds(1),
        });
        assert!(doc.has_stale_reader(now));
    }

    #[test]
    fn durable_layout_field_names() {
        let now = Utc::now();
        let mut doc = LockDocument::unlocked("res");
        doc.writing = true;
        doc.write_stale_at = Some(now);

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("writePending").is_some());
        assert!(json.get("writeStaleAt").is_some());
        assert!(json.get("readers").is_some());
        assert_eq!(json.get("id").unwrap(), "res");
    }
}
