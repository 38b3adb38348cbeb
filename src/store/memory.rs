//! In-process document store

use super::{Document, DocumentSink, DocumentSource};
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

type CollectionKey = (String, String);

/// Collections held in memory, keyed by (database, collection)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<BTreeMap<CollectionKey, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with one collection
    pub fn with_collection(database: &str, collection: &str, documents: Vec<Document>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.collections.write() {
            guard.insert((database.to_string(), collection.to_string()), documents);
        }
        store
    }

    pub fn len(&self, database: &str, collection: &str) -> usize {
        self.collections
            .read()
            .map(|guard| {
                guard
                    .get(&(database.to_string(), collection.to_string()))
                    .map_or(0, Vec::len)
            })
            .unwrap_or(0)
    }
}

fn poisoned() -> PipelineError {
    PipelineError::Connection("in-memory store lock poisoned".to_string())
}

impl DocumentSource for InMemoryStore {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let guard = self.collections.read().map_err(|_| poisoned())?;
        Ok(guard
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

impl DocumentSink for InMemoryStore {
    fn insert_many(&self, database: &str, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let count = documents.len();
        guard
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(documents);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_then_fetch() {
        let store = InMemoryStore::new();
        let doc = json!({"a": 1}).as_object().cloned().unwrap();

        assert_eq!(store.insert_many("db", "c", vec![doc.clone(), doc.clone()]).unwrap(), 2);
        assert_eq!(store.len("db", "c"), 2);
        assert_eq!(store.fetch_all("db", "c").unwrap(), vec![doc.clone(), doc]);
        assert!(store.fetch_all("db", "other").unwrap().is_empty());
    }
}
