//! Error taxonomy for the book store. None of these are fatal: validation and
//! not-found errors leave the collection untouched, and persistence errors
//! leave a usable in-memory collection behind.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::BookId;

/// Input that violates the field constraints of a [`crate::Book`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required.")]
    EmptyTitle,
    #[error("Author is required.")]
    EmptyAuthor,
    #[error("Rating must be between 1 and 5 (got {0}).")]
    RatingOutOfRange(u8),
}

/// Failures raised by a [`crate::storage::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not locate home directory")]
    NoHomeDirectory,
    #[error("I/O failure at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SQLite storage failure")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize collection")]
    Serialize(#[from] serde_json::Error),
    #[error("saved collection could not be read, writes are held until an explicit save")]
    WritesHeld,
}

/// Everything a [`crate::BookStore`] operation can report.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Book {0} not found.")]
    NotFound(BookId),
    /// Reading or writing durable storage failed. After a write failure the
    /// in-memory collection already holds the change.
    #[error("Storage unavailable, changes are kept for this session only")]
    Persistence(#[source] StorageError),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::Persistence(err)
    }
}
