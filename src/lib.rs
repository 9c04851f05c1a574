//! Personal book tracker: a validated, persisted collection of books plus the
//! pure query helpers and terminal UI built on top of it.
//!
//! [`BookStore`] owns the collection and writes it through a [`Storage`]
//! backend after every change. The functions in [`query`] derive views
//! (search results, author aggregates, recently added, statistics) from a
//! borrowed slice and never touch storage.
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod storage;
pub mod store;
pub mod ui;

pub use config::Config;
pub use error::{StorageError, StoreError, ValidationError};
pub use models::{Book, BookDraft, BookId, BookPatch, MAX_RATING, MIN_RATING};
pub use query::{
    collection_stats, filter_by_author, recent_first, search_by_text, AuthorAggregate,
    AuthorMatches, CollectionStats, SearchScope,
};
pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use store::{BookStore, DEFAULT_STORAGE_KEY};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
