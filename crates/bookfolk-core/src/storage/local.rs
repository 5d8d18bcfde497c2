//! Local SQLite backend
//!
//! Stores documents on disk so bookfolk works without a remote service.
//! The connection is shared between the document store and the local
//! identity provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::error::{StorageError, StorageResult};
use super::schema::{init_schema, needs_init};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::repository::{Document, DocumentStore};

/// Shared handle to the local database
#[derive(Clone)]
pub struct LocalDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl LocalDatabase {
    /// Open or create the database in the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        let path = config.database_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure with the connection locked
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StorageResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&conn)?)
    }
}

/// Document store backed by the local database
#[derive(Clone)]
pub struct LocalStore {
    db: LocalDatabase,
}

impl LocalStore {
    pub fn new(db: LocalDatabase) -> Self {
        Self { db }
    }

    fn read(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let body: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
        })?;

        body.map(|b| decode(collection, id, &b)).transpose()
    }

    fn write(&self, collection: &str, id: &str, document: &Document) -> AppResult<()> {
        let body = serde_json::to_string(document)?;
        let now = Utc::now().timestamp_millis();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![collection, id, body, now],
            )
        })?;
        Ok(())
    }
}

fn decode(collection: &str, id: &str, body: &str) -> AppResult<Document> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StorageError::InvalidDocument {
            key: format!("{}/{}", collection, id),
            details: "not a JSON object".to_string(),
        }
        .into()),
        Err(e) => Err(StorageError::InvalidDocument {
            key: format!("{}/{}", collection, id),
            details: e.to_string(),
        }
        .into()),
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn set(&self, collection: &str, id: &str, document: Document) -> AppResult<()> {
        self.write(collection, id, &document)
    }

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        self.read(collection, id)
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let rows: Vec<(String, String)> = self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, body FROM documents WHERE collection = ?1")?;
            let rows = stmt
                .query_map([collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.iter()
            .map(|(id, body)| decode(collection, id, body))
            .collect()
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> AppResult<()> {
        let mut document = self
            .read(collection, id)?
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
        document.extend(fields);
        self.write(collection, id, &document)
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
        })?;
        Ok(())
    }
}
