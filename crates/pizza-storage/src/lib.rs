//! History persistence for the pizza counter.
//!
//! A single append-only SQLite table records every processed upload.
//! Reports read it back in full, newest first.

pub mod error;
pub mod history;

pub use error::{StorageError, StorageResult};
pub use history::HistoryStore;
