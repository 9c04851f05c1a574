use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::Storage;
use crate::error::StorageError;

/// SQLite file name stored inside the application data directory.
pub const DB_FILE_NAME: &str = "book-tracker.sqlite";

/// Key/value table inside an embedded SQLite file. One row per key; the book
/// collection lives in a single row as a JSON array.
pub struct SqliteStorage {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStorage {
    /// Ensure the data directory and database file exist, create the table if
    /// needed, and return a live handle.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir).map_err(|source| StorageError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let path = data_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&path)?;
        ensure_schema(&conn)?;
        info!("opened storage at {}", path.display());

        Ok(Self { conn, path })
    }

    /// Storage backed by a private in-memory SQLite database. Behaves exactly
    /// like the on-disk variant but vanishes with the handle.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        debug!("wrote {} bytes under {key}", value.len());
        Ok(())
    }
}

fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS storage (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.read("nothing").unwrap(), None);
    }

    #[test]
    fn write_overwrites_previous_value() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("books", "[]").unwrap();
        storage.write("books", "[1]").unwrap();
        assert_eq!(storage.read("books").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn open_creates_nested_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut storage = SqliteStorage::open(&nested).unwrap();
        storage.write("k", "v").unwrap();
        assert!(nested.join(DB_FILE_NAME).exists());
        assert_eq!(storage.path(), nested.join(DB_FILE_NAME));

        drop(storage);
        let reopened = SqliteStorage::open(&nested).unwrap();
        assert_eq!(reopened.read("k").unwrap().as_deref(), Some("v"));
    }
}
