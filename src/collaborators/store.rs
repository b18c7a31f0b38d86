//! `SQLite` document store
//!
//! Records are JSON objects grouped by collection name, kept in one table.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use uuid::Uuid;

use super::{DocumentStore, Record};
use crate::{Error, Result};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Database connection pool
pub type StorePool = Pool<SqliteConnectionManager>;

/// Document store backed by a pooled `SQLite` database
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: StorePool,
}

impl SqliteDocumentStore {
    /// Open (and migrate) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or initialized
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self::from_pool(pool)?;
        tracing::info!(path = %path.as_ref().display(), version = SCHEMA_VERSION, "document store opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        Self::from_pool(pool)
    }

    fn from_pool(pool: StorePool) -> Result<Self> {
        let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
        migrate(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// Append a record synchronously
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub fn insert(&self, collection: &str, record: &Record) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO documents (id, collection, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, collection, body, now],
        )?;

        tracing::debug!(collection, id = %id, "document added");
        Ok(id)
    }

    /// Read a collection synchronously, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the read fails
    pub fn list(&self, collection: &str) -> Result<Vec<Record>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY rowid")?;

        let bodies = stmt
            .query_map([collection], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }

    /// Delete every record in a collection, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails
    pub fn clear(&self, collection: &str) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let removed = conn.execute("DELETE FROM documents WHERE collection = ?1", [collection])?;
        tracing::info!(collection, removed, "collection cleared");
        Ok(removed)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add_item(&self, collection: &str, record: Record) -> Result<String> {
        self.insert(collection, &record)
    }

    async fn list_items(&self, collection: &str) -> Result<Vec<Record>> {
        self.list(collection)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

            PRAGMA user_version = 1;
            ",
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn named(name: &str) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), Value::from(name));
        record
    }

    #[tokio::test]
    async fn test_add_and_list_in_order() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();

        store.add_item("availableItems", named("eggs")).await.unwrap();
        store.add_item("availableItems", named("spinach")).await.unwrap();
        store.add_item("groceryLists", named("milk")).await.unwrap();

        let items = store.list_items("availableItems").await.unwrap();
        let names: Vec<&str> = items
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["eggs", "spinach"]);
    }

    #[test]
    fn test_empty_collection() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let items = tokio_test::block_on(store.list_items("nothing"));
        assert!(tokio_test::assert_ok!(items).is_empty());
    }

    #[test]
    fn test_clear() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        store.insert("groceryLists", &named("flour")).unwrap();
        store.insert("groceryLists", &named("sugar")).unwrap();

        assert_eq!(store.clear("groceryLists").unwrap(), 2);
        assert!(store.list("groceryLists").unwrap().is_empty());
    }

    #[test]
    fn test_migration_sets_schema_version() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let conn = store.pool.get().unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // Migrating an up-to-date database is a no-op
        migrate(&conn).unwrap();
        drop(conn);
        assert!(store.list("availableItems").unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kitchen.db");

        {
            let store = SqliteDocumentStore::open(&path).unwrap();
            store.insert("availableItems", &named("rice")).unwrap();
        }

        let reopened = SqliteDocumentStore::open(&path).unwrap();
        assert_eq!(reopened.list("availableItems").unwrap().len(), 1);
    }
}
