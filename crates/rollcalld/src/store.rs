//! SQLite-backed document store.
//!
//! Documents are JSON bodies keyed by (collection, doc id). Writes use
//! merge semantics: only the fields present in the patch are overwritten.
//! Queries filter on one top-level field with no compound ordering, so no
//! secondary indexes are required.

use rusqlite::params;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("document {collection}/{doc_id} not found")]
    NotFound { collection: String, doc_id: String },
    #[error("corrupt document body: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Clone-safe handle to the document store.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).await?;
        Self::init(conn).await
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    doc_id     TEXT NOT NULL,
                    body       TEXT NOT NULL,
                    PRIMARY KEY (collection, doc_id)
                )",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Fetch one document body, or `None` if absent.
    pub async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>, StoreError> {
        let collection = collection.to_string();
        let doc_id = doc_id.to_string();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2")?;
                let mut rows = stmt.query(params![collection, doc_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await?;
        raw.map(|s| serde_json::from_str(&s)).transpose().map_err(Into::into)
    }

    /// Merge-write: overwrite only the fields listed in `patch`, creating
    /// the document if it does not exist. Two racing merges on the same
    /// key resolve last-writer-wins.
    pub async fn merge_set(
        &self,
        collection: &str,
        doc_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        let mut body = self
            .get(collection, doc_id)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));
        merge_into(&mut body, patch);
        self.put(collection, doc_id, &body).await
    }

    /// Merge-write to an existing document only; never creates one.
    pub async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        let mut body = self.get(collection, doc_id).await?.ok_or_else(|| {
            StoreError::NotFound {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            }
        })?;
        merge_into(&mut body, patch);
        self.put(collection, doc_id, &body).await
    }

    async fn put(&self, collection: &str, doc_id: &str, body: &Value) -> Result<(), StoreError> {
        let collection = collection.to_string();
        let doc_id = doc_id.to_string();
        let raw = serde_json::to_string(body)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, doc_id) DO UPDATE SET body = excluded.body",
                    params![collection, doc_id, raw],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// All documents whose top-level `field` equals `value` (string
    /// comparison). Single-field lookup; collections are small enough to
    /// filter in process.
    pub async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.list(collection).await?;
        Ok(docs
            .into_iter()
            .filter(|(_, body)| body.get(field).and_then(Value::as_str) == Some(value))
            .collect())
    }

    /// All documents in a collection, unordered.
    pub async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let collection = collection.to_string();
        let rows: Vec<(String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT doc_id, body FROM documents WHERE collection = ?1")?;
                let rows = stmt
                    .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter()
            .map(|(id, raw)| Ok((id, serde_json::from_str(&raw)?)))
            .collect()
    }
}

/// Shallow object merge: fields in `patch` replace the base's, fields not
/// listed are preserved. A non-object patch replaces the body wholesale.
fn merge_into(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
        }
        (base, patch) => *base = patch,
    }
}
