//! Conditional-match and atomic-mutation descriptors.
//!
//! Every backend interprets `Filter` and `Update` through the
//! `matches`/`apply` implementations below, so the conditional semantics
//! are identical regardless of where the documents live.

use chrono::{DateTime, Utc};

use crate::document::{LockDocument, ReaderEntry, ReaderToken};

/// Conjunction of conditions a document must satisfy for a conditional
/// operation to act. An empty filter matches any document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Require `writing` to equal this value.
    pub writing: Option<bool>,
    /// Require `write_pending` to equal this value.
    pub write_pending: Option<bool>,
    /// Require `readers` to be empty (`true`) or non-empty (`false`).
    pub readers_empty: Option<bool>,
    /// Require a writer whose lease expired at or before this instant.
    pub write_stale_by: Option<DateTime<Utc>>,
    /// Require at least one reader entry stale at or before this instant.
    pub reader_stale_by: Option<DateTime<Utc>>,
}

impl Filter {
    /// Matches any existing document.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn writing(mut self, writing: bool) -> Self {
        self.writing = Some(writing);
        self
    }

    pub fn write_pending(mut self, pending: bool) -> Self {
        self.write_pending = Some(pending);
        self
    }

    pub fn readers_empty(mut self, empty: bool) -> Self {
        self.readers_empty = Some(empty);
        self
    }

    pub fn write_stale_by(mut self, at: DateTime<Utc>) -> Self {
        self.write_stale_by = Some(at);
        self
    }

    pub fn reader_stale_by(mut self, at: DateTime<Utc>) -> Self {
        self.reader_stale_by = Some(at);
        self
    }

    /// Whether `doc` satisfies every condition of this filter.
    pub fn matches(&self, doc: &LockDocument) -> bool {
        if let Some(writing) = self.writing {
            if doc.writing != writing {
                return false;
            }
        }
        if let Some(pending) = self.write_pending {
            if doc.write_pending != pending {
                return false;
            }
        }
        if let Some(empty) = self.readers_empty {
            if doc.readers.is_empty() != empty {
                return false;
            }
        }
        if let Some(at) = self.write_stale_by {
            if !doc.write_stale(at) {
                return false;
            }
        }
        if let Some(at) = self.reader_stale_by {
            if !doc.has_stale_reader(at) {
                return false;
            }
        }
        true
    }
}

/// Mutation set applied to a document as one indivisible step.
///
/// On the insert path of an upsert the update is applied to a fresh
/// `LockDocument::unlocked(id)`.
#[derive(Debug, Clone, Default)]
pub struct Update {
    /// Set the `writing` flag.
    pub set_writing: Option<bool>,
    /// Set the `write_pending` flag.
    pub set_write_pending: Option<bool>,
    /// Outer `Some` means "set the field"; the inner option is the value,
    /// so `Some(None)` clears the writer lease.
    pub set_write_stale_at: Option<Option<DateTime<Utc>>>,
    /// Append one reader entry.
    pub push_reader: Option<ReaderEntry>,
    /// Remove the reader entry with exactly this token.
    pub pull_reader: Option<ReaderToken>,
    /// Remove every reader entry stale at or before this instant.
    pub pull_readers_stale_by: Option<DateTime<Utc>>,
    /// Drop all reader entries.
    pub clear_readers: bool,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writing(mut self, writing: bool) -> Self {
        self.set_writing = Some(writing);
        self
    }

    pub fn write_pending(mut self, pending: bool) -> Self {
        self.set_write_pending = Some(pending);
        self
    }

    pub fn write_stale_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.set_write_stale_at = Some(at);
        self
    }

    pub fn push_reader(mut self, entry: ReaderEntry) -> Self {
        self.push_reader = Some(entry);
        self
    }

    pub fn pull_reader(mut self, token: ReaderToken) -> Self {
        self.pull_reader = Some(token);
        self
    }

    pub fn pull_readers_stale_by(mut self, at: DateTime<Utc>) -> Self {
        self.pull_readers_stale_by = Some(at);
        self
    }

    pub fn clear_readers(mut self) -> Self {
        self.clear_readers = true;
        self
    }

    /// Apply every mutation of this update to `doc`.
    pub fn apply(&self, doc: &mut LockDocument) {
        if let Some(writing) = self.set_writing {
            doc.writing = writing;
        }
        if let Some(pending) = self.set_write_pending {
            doc.write_pending = pending;
        }
        if let Some(at) = self.set_write_stale_at {
            doc.write_stale_at = at;
        }
        if self.clear_readers {
            doc.readers.clear();
        }
        if let Some(token) = self.pull_reader {
            doc.readers.retain(|r| r.token != token);
        }
        if let Some(at) = self.pull_readers_stale_by {
            doc.readers.retain(|r| r.stale_at > at);
        }
        if let Some(ref entry) = self.push_reader {
            doc.readers.push(entry.clone());
        }
    }
}
