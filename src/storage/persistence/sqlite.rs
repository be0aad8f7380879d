//! `SQLite`-backed factoid store.

use crate::models::{Factoid, FactoidId};
use crate::storage::sqlite::{
    DEFAULT_BUSY_TIMEOUT, FACTOID_COLUMNS, FactoidRow, acquire_lock, configure_connection, timed,
};
use crate::storage::traits::FactoidStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-backed factoid store.
///
/// # Concurrency Model
///
/// A single `Mutex<Connection>` serializes statements inside the process.
/// WAL mode lets other processes read while one writes, and the busy timeout
/// bounds how long any call waits on a locked database.
///
/// # Schema
///
/// One `factoids` table indexed by `key`. Provenance tuples are stored as
/// JSON text.
pub struct SqliteFactoidStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteFactoidStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the database cannot be opened or
    /// initialized.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens a store with an explicit busy timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the database cannot be opened or
    /// initialized.
    pub fn open_with_timeout(db_path: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::store("create_data_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::store("open_sqlite", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize(busy_timeout)?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::store("open_sqlite_in_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize(DEFAULT_BUSY_TIMEOUT)?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self, busy_timeout: Duration) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn, busy_timeout)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS factoids (
                id TEXT PRIMARY KEY,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                kind TEXT NOT NULL,
                chance REAL NOT NULL,
                created TEXT NOT NULL,
                modified TEXT NOT NULL,
                accessed TEXT NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_factoids_key ON factoids(key);",
        )
        .map_err(|e| Error::store("create_factoids_table", e))
    }

    fn stream(
        conn: &Connection,
        operation: &'static str,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::store(operation, e))?;
        let mut rows = stmt.query(params).map_err(|e| Error::store(operation, e))?;

        while let Some(row) = rows.next().map_err(|e| Error::store(operation, e))? {
            let factoid = FactoidRow::from_row(row)
                .map_err(|e| Error::store(operation, e))?
                .into_factoid()?;
            visit(factoid)?;
        }
        Ok(())
    }
}

impl FactoidStore for SqliteFactoidStore {
    #[instrument(skip(self, factoid), fields(operation = "insert", backend = BACKEND, factoid.id = %factoid.id, factoid.key = %factoid.key))]
    fn insert(&self, factoid: &Factoid) -> Result<FactoidId> {
        timed(BACKEND, "insert", || {
            let row = FactoidRow::encode(factoid)?;
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO factoids (id, key, value, kind, chance, created, modified, accessed, access_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.key,
                    row.value,
                    row.kind,
                    row.chance,
                    row.created,
                    row.modified,
                    row.accessed,
                    row.access_count
                ],
            )
            .map_err(|e| Error::store("insert", e))?;
            Ok(factoid.id.clone())
        })
    }

    #[instrument(skip(self, factoid), fields(operation = "update_by_id", backend = BACKEND, factoid.id = %id))]
    fn update_by_id(&self, id: &FactoidId, factoid: &Factoid) -> Result<()> {
        timed(BACKEND, "update_by_id", || {
            let row = FactoidRow::encode(factoid)?;
            let conn = acquire_lock(&self.conn);
            let changed = conn
                .execute(
                    "UPDATE factoids
                     SET key = ?2, value = ?3, kind = ?4, chance = ?5,
                         created = ?6, modified = ?7, accessed = ?8, access_count = ?9
                     WHERE id = ?1",
                    params![
                        id.as_str(),
                        row.key,
                        row.value,
                        row.kind,
                        row.chance,
                        row.created,
                        row.modified,
                        row.accessed,
                        row.access_count
                    ],
                )
                .map_err(|e| Error::store("update_by_id", e))?;
            if changed == 0 {
                return Err(Error::NotFound(id.clone()));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "delete_by_id", backend = BACKEND, factoid.id = %id))]
    fn delete_by_id(&self, id: &FactoidId) -> Result<()> {
        timed(BACKEND, "delete_by_id", || {
            let conn = acquire_lock(&self.conn);
            let deleted = conn
                .execute("DELETE FROM factoids WHERE id = ?1", params![id.as_str()])
                .map_err(|e| Error::store("delete_by_id", e))?;
            if deleted == 0 {
                return Err(Error::NotFound(id.clone()));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "get_by_id", backend = BACKEND, factoid.id = %id))]
    fn get_by_id(&self, id: &FactoidId) -> Result<Factoid> {
        timed(BACKEND, "get_by_id", || {
            let conn = acquire_lock(&self.conn);
            let row = conn
                .query_row(
                    &format!("SELECT {FACTOID_COLUMNS} FROM factoids WHERE id = ?1"),
                    params![id.as_str()],
                    FactoidRow::from_row,
                )
                .optional()
                .map_err(|e| Error::store("get_by_id", e))?;

            row.ok_or_else(|| Error::NotFound(id.clone()))?.into_factoid()
        })
    }

    #[instrument(skip(self), fields(operation = "count_by_key", backend = BACKEND))]
    fn count_by_key(&self, key: &str) -> Result<usize> {
        timed(BACKEND, "count_by_key", || {
            let conn = acquire_lock(&self.conn);
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM factoids WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .map_err(|e| Error::store("count_by_key", e))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    #[instrument(skip(self, visit), fields(operation = "for_each_by_key", backend = BACKEND))]
    fn for_each_by_key(
        &self,
        key: &str,
        visit: &mut dyn FnMut(Factoid) -> Result<()>,
    ) -> Result<()> {
        timed(BACKEND, "for_each_by_key", || {
            let conn = acquire_lock(&self.conn);
            Self::stream(
                &conn,
                "for_each_by_key",
                &format!("SELECT {FACTOID_COLUMNS} FROM factoids WHERE key = ?1"),
                &[&key],
                visit,
            )
        })
    }

    #[instrument(skip(self, visit), fields(operation = "for_each", backend = BACKEND))]
    fn for_each(&self, visit: &mut dyn FnMut(Factoid) -> Result<()>) -> Result<()> {
        timed(BACKEND, "for_each", || {
            let conn = acquire_lock(&self.conn);
            Self::stream(
                &conn,
                "for_each",
                &format!("SELECT {FACTOID_COLUMNS} FROM factoids ORDER BY key, id"),
                &[],
                visit,
            )
        })
    }

    fn count(&self) -> Result<usize> {
        timed(BACKEND, "count", || {
            let conn = acquire_lock(&self.conn);
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM factoids", [], |row| row.get(0))
                .map_err(|e| Error::store("count", e))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chance, Provenance, ScopeId, Speaker};
    use tempfile::TempDir;

    fn factoid(key: &str, value: &str) -> Factoid {
        let provenance =
            Provenance::now(&Speaker::new("alice", "al", "host"), &ScopeId::new("#test"));
        Factoid::new(key, value, provenance)
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        let fact = factoid("tea", "hot leaf juice");

        let id = store.insert(&fact).unwrap();
        assert_eq!(id, fact.id);

        let fetched = store.get_by_id(&id).unwrap();
        assert_eq!(fetched, fact);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        let result = store.get_by_id(&FactoidId::new("missing"));
        assert!(matches!(result, Err(Error::NotFound(ref id)) if id.as_str() == "missing"));
    }

    #[test]
    fn test_update_overwrites_record() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        let mut fact = factoid("tea", "hot");
        store.insert(&fact).unwrap();

        fact.value = "very hot".to_string();
        fact.chance = Chance::new(0.5).unwrap();
        store.update_by_id(&fact.id, &fact).unwrap();

        let fetched = store.get_by_id(&fact.id).unwrap();
        assert_eq!(fetched.value, "very hot");
        assert_eq!(fetched.chance, Chance::new(0.5).unwrap());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        let fact = factoid("tea", "hot");
        assert!(matches!(
            store.update_by_id(&fact.id, &fact),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        let fact = factoid("tea", "hot");
        store.insert(&fact).unwrap();

        store.delete_by_id(&fact.id).unwrap();
        assert!(matches!(store.get_by_id(&fact.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete_by_id(&fact.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_count_and_find_by_key() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        store.insert(&factoid("lol", "haha")).unwrap();
        store.insert(&factoid("lol", "rofl")).unwrap();
        store.insert(&factoid("tea", "hot")).unwrap();

        assert_eq!(store.count_by_key("lol").unwrap(), 2);
        assert_eq!(store.count_by_key("nope").unwrap(), 0);
        assert_eq!(store.count().unwrap(), 3);

        let mut values: Vec<_> = store
            .find_by_key("lol")
            .unwrap()
            .into_iter()
            .map(|f| f.value)
            .collect();
        values.sort();
        assert_eq!(values, vec!["haha", "rofl"]);
    }

    #[test]
    fn test_for_each_by_key_stops_on_visitor_error() {
        let store = SqliteFactoidStore::in_memory().unwrap();
        store.insert(&factoid("lol", "a")).unwrap();
        store.insert(&factoid("lol", "b")).unwrap();

        let mut seen = 0;
        let result = store.for_each_by_key("lol", &mut |_| {
            seen += 1;
            Err(Error::store("send", "closed"))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("facts.db");
        let fact = factoid("tea", "hot");

        {
            let store = SqliteFactoidStore::open(&path).unwrap();
            store.insert(&fact).unwrap();
            assert_eq!(store.db_path(), Some(path.as_path()));
        }

        let store = SqliteFactoidStore::open(&path).unwrap();
        assert_eq!(store.get_by_id(&fact.id).unwrap(), fact);
    }
}
