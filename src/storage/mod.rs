//! Durable key/value storage behind the book store. The store only ever needs
//! to read one key at start-up and overwrite it after each mutation, so the
//! trait stays that small.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, DB_FILE_NAME};

use crate::error::StorageError;

/// A place to keep serialized collections between sessions.
pub trait Storage {
    /// Fetch the value stored under `key`, or `None` when nothing was written
    /// yet.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key` in full.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Whether written values survive the process.
    fn is_durable(&self) -> bool {
        true
    }
}
