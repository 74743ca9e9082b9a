//! Turnstile Store - lock document model and atomic store abstraction
//!
//! This crate provides:
//! - The persisted lock record (`LockDocument`) and its durable layout
//! - Typed conditional-match (`Filter`) and atomic-mutation (`Update`)
//!   descriptors
//! - The `DocumentStore` trait, the only concurrency primitive the lock
//!   engine relies on
//! - An in-process `MemoryStore` backend

pub mod document;
pub mod error;
pub mod memory;
pub mod ops;
pub mod store;

// Re-exports for convenience
pub use document::{LockDocument, ReaderEntry, ReaderToken};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use ops::{Filter, Update};
pub use store::DocumentStore;
