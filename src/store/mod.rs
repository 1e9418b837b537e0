use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Merge nested maps into the stored document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        SetOptions { merge: true }
    }

    pub fn overwrite() -> Self {
        SetOptions { merge: false }
    }
}

/// Small key/value documents grouped in collections (`config/main`, `settings/general`, ...).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document doesn't exist.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn set_document(&self, collection: &str, id: &str, data: Document, options: SetOptions) -> Result<()>;
}

/// Merges `src` into `dst`. Maps are merged key by key, any other value replaces the old one.
pub fn deep_merge(dst: &mut Document, src: Document) {
    for (key, value) in src {
        match (dst.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, incoming),
            (_, value) => {
                dst.insert(key, value);
            }
        }
    }
}
