//! Persistent fingerprint storage.
//!
//! Fingerprints are stored under a `(domain, identifier)` key. The default
//! backend is a single-table SQLite database; anything else can plug in by
//! implementing [`StorageBackend`] — the core is oblivious to what sits
//! behind the two methods.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

/// File name used when no explicit store path is configured.
const DEFAULT_DB_FILE: &str = "scrapling_adaptive.sqlite3";

/// A place fingerprints can be saved to and retrieved from.
///
/// Implementations must be usable from multiple threads; writes to the same
/// `(domain, identifier)` key are last-writer-wins.
pub trait StorageBackend: Send + Sync {
    /// Persist `fingerprint` under `(domain, identifier)`, overwriting any
    /// previous record.
    fn save(&self, domain: &str, identifier: &str, fingerprint: &Fingerprint) -> Result<()>;

    /// Load the fingerprint stored under `(domain, identifier)`.
    ///
    /// A missing key is `Ok(None)`, not an error.
    fn retrieve(&self, domain: &str, identifier: &str) -> Result<Option<Fingerprint>>;
}

/// The default on-disk backend: one SQLite table, fingerprints as JSON.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS scrapling_adaptive (
                domain     TEXT NOT NULL,
                identifier TEXT NOT NULL,
                data       JSON NOT NULL,
                PRIMARY KEY (domain, identifier)
            )",
            (),
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open the store at its default location in the OS temp directory.
    pub fn open_default() -> Result<Self> {
        Self::open(std::env::temp_dir().join(DEFAULT_DB_FILE))
    }

    /// Where this store lives on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for SqliteStorage {
    fn save(&self, domain: &str, identifier: &str, fingerprint: &Fingerprint) -> Result<()> {
        let data = serde_json::to_string(fingerprint)
            .map_err(|err| Error::StorageError(err.to_string()))?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO scrapling_adaptive (domain, identifier, data)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (domain, identifier) DO UPDATE SET data = excluded.data",
            (domain, identifier, &data),
        )?;
        log::debug!("saved fingerprint for ({domain}, {identifier})");
        Ok(())
    }

    fn retrieve(&self, domain: &str, identifier: &str) -> Result<Option<Fingerprint>> {
        let conn = self.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM scrapling_adaptive WHERE domain = ?1 AND identifier = ?2",
                (domain, identifier),
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => {
                let fingerprint = serde_json::from_str(&data)
                    .map_err(|err| Error::StorageError(format!("corrupt record: {err}")))?;
                Ok(Some(fingerprint))
            }
            None => {
                log::debug!("no fingerprint stored for ({domain}, {identifier})");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn sample_fingerprint(tag: &str) -> Fingerprint {
        let mut attributes = IndexMap::new();
        attributes.insert("class".to_string(), "product".to_string());
        Fingerprint {
            tag: tag.to_string(),
            text: "Widget".to_string(),
            attributes,
            sibling_tags: vec!["h3".to_string(), tag.to_string()],
            path_tags: vec![tag.to_string(), "body".to_string()],
            parent_tag: "body".to_string(),
            parent_attributes: IndexMap::new(),
            parent_text: String::new(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStorage::open(dir.path().join("store.sqlite3")).unwrap();
        (dir, store)
    }

    #[test]
    fn save_and_retrieve_round_trip() {
        let (_dir, store) = temp_store();
        let fp = sample_fingerprint("div");
        store.save("example.com", "k", &fp).unwrap();
        let loaded = store.retrieve("example.com", "k").unwrap();
        assert_eq!(loaded, Some(fp));
    }

    #[test]
    fn missing_key_is_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.retrieve("example.com", "absent").unwrap(), None);
    }

    #[test]
    fn save_overwrites_in_place() {
        let (_dir, store) = temp_store();
        store.save("example.com", "k", &sample_fingerprint("div")).unwrap();
        store.save("example.com", "k", &sample_fingerprint("article")).unwrap();
        let loaded = store.retrieve("example.com", "k").unwrap().unwrap();
        assert_eq!(loaded.tag, "article");
    }

    #[test]
    fn domains_are_isolated() {
        let (_dir, store) = temp_store();
        store.save("a.com", "k", &sample_fingerprint("div")).unwrap();
        assert!(store.retrieve("b.com", "k").unwrap().is_none());
        assert!(store.retrieve("a.com", "k").unwrap().is_some());
    }

    #[test]
    fn store_reopens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        {
            let store = SqliteStorage::open(&path).unwrap();
            store.save("a.com", "k", &sample_fingerprint("div")).unwrap();
        }
        let store = SqliteStorage::open(&path).unwrap();
        assert!(store.retrieve("a.com", "k").unwrap().is_some());
    }
}
