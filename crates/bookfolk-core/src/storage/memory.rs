//! In-memory document store
//!
//! Keeps documents in a map for the lifetime of the process. Used by tests
//! and by `backend = "memory"` for throwaway sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::error::StorageError;
use crate::error::{AppError, AppResult};
use crate::repository::{Document, DocumentStore};

type Collections = HashMap<String, HashMap<String, Document>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|_| AppError::Local(StorageError::Poisoned))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(&self, collection: &str, id: &str, document: Document) -> AppResult<()> {
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        Ok(self
            .lock()?
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        Ok(self
            .lock()?
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> AppResult<()> {
        let mut collections = self.lock()?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
        document.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        if let Some(docs) = self.lock()?.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_merge_keeps_other_fields() {
        let store = MemoryStore::new();
        store
            .set("c", "1", doc(json!({"a": 1, "b": 2})))
            .await
            .unwrap();
        store.merge("c", "1", doc(json!({"b": 3}))).await.unwrap();

        let stored = store.get("c", "1").await.unwrap().unwrap();
        assert_eq!(serde_json::Value::Object(stored), json!({"a": 1, "b": 3}));
    }

    #[tokio::test]
    async fn test_merge_missing() {
        let store = MemoryStore::new();
        let result = store.merge("c", "nope", Document::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_collection() {
        let store = MemoryStore::new();
        store.delete("nowhere", "1").await.unwrap();
    }
}
