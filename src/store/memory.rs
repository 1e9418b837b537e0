use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::store::{deep_merge, Document, DocumentStore, SetOptions};

/// Keeps the documents in a map.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<(String, String), Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, collection: &str, id: &str, data: Document) -> Self {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert((collection.to_string(), id.to_string()), data);
        }
        self
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(&key(collection, id)).cloned())
    }

    async fn set_document(&self, collection: &str, id: &str, data: Document, options: SetOptions) -> Result<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        let key = key(collection, id);
        match docs.get_mut(&key) {
            Some(existing) if options.merge => deep_merge(existing, data),
            _ => {
                docs.insert(key, data);
            }
        }
        Ok(())
    }
}
