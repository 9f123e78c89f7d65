//! # costline-store
//!
//! Durable storage for one [`SessionState`](costline_core::SessionState) per
//! session, shared by many short-lived processes.
//!
//! ## Contract
//!
//! - [`StateStore::load`] never fails on a missing or malformed record: it
//!   returns a fresh state instead. It only errors when the store itself is
//!   unreachable (lock or I/O failure).
//! - [`StateStore::save`] is atomic: readers never observe a partial record.
//! - A load/save pair is **not** atomic. Each record carries a `revision`;
//!   `save` refuses to overwrite a record whose revision moved since the
//!   state was loaded and returns [`StoreError::Conflict`]. The caller
//!   decides whether to reload and retry.
//! - A record file is never overwritten with another session's state; such
//!   a save fails with [`StoreError::ForeignRecord`].
//!
//! ## Implementations
//!
//! - [`FileStateStore`]: one JSON file per session, advisory locks on a
//!   sidecar lock file, temp-file-and-rename writes
//! - [`MemoryStateStore`]: in-process map with the same revision semantics

#![deny(unsafe_code)]

pub mod errors;
pub mod file;
pub mod memory;
pub mod traits;

pub use errors::{Result, StoreError};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use traits::StateStore;
