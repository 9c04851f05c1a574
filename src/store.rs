//! The book collection state manager. `BookStore` is the single owner of the
//! collection: views borrow `list()` and feed it to the pure helpers in
//! [`crate::query`], and every mutation goes through the methods below so the
//! in-memory list and the durable copy never drift apart silently.
//!
//! Persistence is a full rewrite of one key after each successful mutation. If
//! that write fails the mutation is kept in memory and the caller receives
//! [`StoreError::Persistence`]; [`BookStore::flush`] retries later.
//!
//! When the saved collection could not be read at all, automatic writes are
//! held back so the intact copy on disk is not replaced by a partial one. Only
//! an explicit [`BookStore::flush`] overwrites it.

use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{StorageError, StoreError};
use crate::models::{Book, BookDraft, BookId, BookPatch};
use crate::storage::Storage;

/// Key the collection is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "bookTracker.books";

pub struct BookStore {
    books: Vec<Book>,
    storage: Box<dyn Storage>,
    key: String,
    persisted: bool,
    /// Set after a read failure; cleared by `flush`.
    writes_held: bool,
    load_error: Option<StoreError>,
}

impl BookStore {
    /// Rehydrate the collection from `storage`. Never fails: missing or
    /// malformed data starts an empty collection, and a read failure is kept
    /// for [`BookStore::take_load_error`].
    pub fn open<S>(storage: S, key: impl Into<String>) -> Self
    where
        S: Storage + 'static,
    {
        let key = key.into();
        let (books, load_error) = match storage.read(&key) {
            Ok(Some(raw)) => (parse_collection(&raw), None),
            Ok(None) => {
                info!("no saved collection under {key}, starting empty");
                (Vec::new(), None)
            }
            Err(err) => {
                warn!("failed to read saved collection under {key}: {err}");
                (Vec::new(), Some(StoreError::Persistence(err)))
            }
        };
        info!("loaded {} books", books.len());

        Self {
            books,
            storage: Box::new(storage),
            key,
            persisted: load_error.is_none(),
            writes_held: load_error.is_some(),
            load_error,
        }
    }

    /// Open over a stand-in backend after the real one could not be opened.
    /// `cause` is reported through [`BookStore::take_load_error`] and the
    /// store never claims to be persisted unless the stand-in is durable.
    pub fn open_fallback<S>(storage: S, key: impl Into<String>, cause: StorageError) -> Self
    where
        S: Storage + 'static,
    {
        let mut store = Self::open(storage, key);
        warn!("primary storage unavailable, using fallback: {cause}");
        store.persisted = false;
        store.load_error = Some(StoreError::Persistence(cause));
        store
    }

    /// Books in insertion order.
    pub fn list(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn find_by_id(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Validate `draft`, assign an id and timestamp, append, and persist.
    pub fn add(&mut self, draft: BookDraft) -> Result<Book, StoreError> {
        draft.validate()?;

        let book = Book {
            id: self.fresh_id(),
            title: draft.title,
            author: draft.author,
            rating: draft.rating,
            notes: draft.notes,
            cover_image: draft.cover_image,
            date_added: draft.date_added.unwrap_or_else(Utc::now),
        };
        debug!("adding book {} ({})", book.id, book.title);
        self.books.push(book.clone());

        self.persist()?;
        Ok(book)
    }

    /// Merge `patch` over the stored record. The merged record must pass the
    /// same validation as `add`; on failure the stored record is untouched.
    pub fn update(&mut self, id: BookId, patch: BookPatch) -> Result<Book, StoreError> {
        let index = self.index_of(id)?;
        let merged = patch.apply_to(&self.books[index]);
        merged.validate()?;

        debug!("updating book {id}");
        self.books[index] = merged.clone();

        self.persist()?;
        Ok(merged)
    }

    /// Delete the book and hand back what was removed.
    pub fn remove(&mut self, id: BookId) -> Result<Book, StoreError> {
        let index = self.index_of(id)?;
        let removed = self.books.remove(index);
        debug!("removed book {id} ({})", removed.title);

        self.persist()?;
        Ok(removed)
    }

    /// Rewrite the whole collection to storage. Also releases writes held
    /// back after a failed start-up read.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.writes_held {
            info!("explicit flush, replacing unreadable collection under {}", self.key);
            self.writes_held = false;
        }
        self.persist()
    }

    /// True when the last write reached durable storage. False after a failed
    /// or held write, and always false on a memory-only backend.
    pub fn is_persisted(&self) -> bool {
        self.persisted && self.storage.is_durable()
    }

    /// Whether the backend outlives the process.
    pub fn is_durable(&self) -> bool {
        self.storage.is_durable()
    }

    /// Error raised while reading the saved collection at start-up, if any.
    /// Returned once.
    pub fn take_load_error(&mut self) -> Option<StoreError> {
        self.load_error.take()
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    fn index_of(&self, id: BookId) -> Result<usize, StoreError> {
        self.books
            .iter()
            .position(|book| book.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn fresh_id(&self) -> BookId {
        loop {
            let id = BookId::new();
            if self.find_by_id(id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if self.writes_held {
            self.persisted = false;
            debug!("write under {} held until an explicit flush", self.key);
            return Err(StoreError::Persistence(StorageError::WritesHeld));
        }

        let result = serde_json::to_string(&self.books)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.write(&self.key, &payload));

        match result {
            Ok(()) => {
                self.persisted = true;
                Ok(())
            }
            Err(err) => {
                self.persisted = false;
                warn!("collection kept in memory only: {err}");
                Err(StoreError::Persistence(err))
            }
        }
    }
}

/// Decode a saved collection. Anything that is not a JSON array yields an
/// empty collection. Each element is decoded on its own, so a record that
/// does not fit the schema or breaks the store's invariants is dropped
/// without taking its neighbours with it.
fn parse_collection(raw: &str) -> Vec<Book> {
    let records: Vec<Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(err) => {
            warn!("saved collection is malformed, starting empty: {err}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<Book>(record) {
            Ok(book) => Some(book),
            Err(err) => {
                warn!("dropping unreadable saved record #{index}: {err}");
                None
            }
        })
        .filter(|book| {
            if let Err(err) = book.validate() {
                warn!("dropping saved book {}: {err}", book.id);
                return false;
            }
            if !seen.insert(book.id) {
                warn!("dropping duplicate saved book {}", book.id);
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;
    use crate::storage::MemoryStorage;

    /// Storage whose writes fail until `healthy` is flipped.
    struct FlakyStorage {
        inner: MemoryStorage,
        healthy: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Storage for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.healthy.get() {
                self.inner.write(key, value)
            } else {
                Err(StorageError::Io {
                    path: PathBuf::from("/quota"),
                    source: io::Error::new(io::ErrorKind::Other, "quota exceeded"),
                })
            }
        }
    }

    /// Storage whose reads fail until `readable` is flipped; writes always
    /// land in `inner`.
    struct BlindStorage {
        inner: MemoryStorage,
        readable: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Storage for BlindStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.readable.get() {
                self.inner.read(key)
            } else {
                Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery))
            }
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.write(key, value)
        }
    }

    struct UnreadableStorage;

    impl Storage for UnreadableStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::NoHomeDirectory)
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_keeps_change_in_memory() {
        let disk = MemoryStorage::new();
        let healthy = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut store = BookStore::open(
            FlakyStorage {
                inner: disk.clone(),
                healthy: healthy.clone(),
            },
            DEFAULT_STORAGE_KEY,
        );

        let err = store
            .add(BookDraft::new("Dune", "Herbert", 5))
            .unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(store.len(), 1);
        assert!(!store.is_persisted());
        assert_eq!(disk.read(DEFAULT_STORAGE_KEY).unwrap(), None);

        healthy.set(true);
        store.flush().unwrap();
        assert!(store.is_persisted());

        let reopened = BookStore::open(disk, DEFAULT_STORAGE_KEY);
        assert_eq!(reopened.list(), store.list());
    }

    #[test]
    fn read_failure_starts_empty_and_reports_once() {
        let mut store = BookStore::open(UnreadableStorage, DEFAULT_STORAGE_KEY);
        assert!(store.is_empty());
        assert!(matches!(
            store.take_load_error(),
            Some(StoreError::Persistence(StorageError::NoHomeDirectory))
        ));
        assert!(store.take_load_error().is_none());
    }

    #[test]
    fn read_failure_holds_writes_until_flush() {
        let disk = MemoryStorage::new().with_entry(DEFAULT_STORAGE_KEY, "[\"intact\"]");
        let readable = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut store = BookStore::open(
            BlindStorage {
                inner: disk.clone(),
                readable: readable.clone(),
            },
            DEFAULT_STORAGE_KEY,
        );

        let err = store
            .add(BookDraft::new("Dune", "Herbert", 5))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Persistence(StorageError::WritesHeld)
        ));
        assert_eq!(store.len(), 1);
        assert!(!store.is_persisted());
        assert_eq!(
            disk.read(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
            Some("[\"intact\"]")
        );

        store.flush().unwrap();
        assert!(store.is_persisted());
        readable.set(true);
        let reopened = BookStore::open(disk, DEFAULT_STORAGE_KEY);
        assert_eq!(reopened.list(), store.list());
    }

    #[test]
    fn fallback_store_reports_cause_and_never_claims_disk() {
        let mut store = BookStore::open_fallback(
            MemoryStorage::new(),
            DEFAULT_STORAGE_KEY,
            StorageError::NoHomeDirectory,
        );
        assert!(!store.is_durable());
        assert!(!store.is_persisted());
        assert!(matches!(
            store.take_load_error(),
            Some(StoreError::Persistence(StorageError::NoHomeDirectory))
        ));

        store.add(BookDraft::new("Dune", "Herbert", 5)).unwrap();
        store.flush().unwrap();
        assert!(!store.is_persisted());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn structurally_bad_records_are_dropped_individually() {
        let raw = r#"[
            {"id":"5b1f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Emma","author":"Austen","rating":4,"notes":"","dateAdded":"2024-01-01T00:00:00Z"},
            {"id":"6c2f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Dune","author":"Herbert","rating":-1,"notes":"","dateAdded":"2024-01-02T00:00:00Z"},
            {"id":"7d3f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Ulysses","author":"Joyce","rating":4.5,"notes":"","dateAdded":"2024-01-03T00:00:00Z"},
            {"id":"8e4f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Middlemarch","author":"Eliot","rating":300,"notes":"","dateAdded":"2024-01-04T00:00:00Z"},
            {"id":"9f5f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Beloved","author":"Morrison","rating":5,"dateAdded":"2024-01-05T00:00:00Z"},
            {"id":"not-a-uuid","title":"Kindred","author":"Butler","rating":5,"notes":"","dateAdded":"2024-01-06T00:00:00Z"},
            "stray string",
            {"id":"a06f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Persuasion","author":"Austen","rating":5,"notes":"","dateAdded":"2024-01-07T00:00:00Z"}
        ]"#;
        let titles: Vec<_> = parse_collection(raw)
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Emma", "Persuasion"]);
    }

    #[test]
    fn non_array_payload_yields_empty_collection() {
        assert!(parse_collection(r#"{"books":[]}"#).is_empty());
    }

    #[test]
    fn malformed_payload_yields_empty_collection() {
        let storage = MemoryStorage::new().with_entry(DEFAULT_STORAGE_KEY, "{not json");
        let mut store = BookStore::open(storage, DEFAULT_STORAGE_KEY);
        assert!(store.is_empty());
        assert!(store.take_load_error().is_none());
    }

    #[test]
    fn invalid_and_duplicate_records_are_dropped() {
        let raw = r#"[
            {"id":"5b1f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Emma","author":"Austen","rating":4,"notes":"","dateAdded":"2024-01-01T00:00:00Z"},
            {"id":"5b1f3a4e-2c64-4b8e-9f0e-1a2b3c4d5e6f","title":"Emma again","author":"Austen","rating":3,"notes":"","dateAdded":"2024-01-02T00:00:00Z"},
            {"id":"9d2c7a10-1111-4222-8333-444455556666","title":"","author":"Nobody","rating":3,"notes":"","dateAdded":"2024-01-03T00:00:00Z"},
            {"id":"0a0b0c0d-1111-4222-8333-444455556666","title":"Draft","author":"Someone","rating":0,"notes":"","dateAdded":"2024-01-04T00:00:00Z"}
        ]"#;
        let books = parse_collection(raw);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Emma");
    }

    #[test]
    fn update_with_empty_patch_is_a_rewrite() {
        let mut store = BookStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let book = store.add(BookDraft::new("Dune", "Herbert", 5)).unwrap();
        let same = store.update(book.id, BookPatch::default()).unwrap();
        assert_eq!(same, book);
    }
}
