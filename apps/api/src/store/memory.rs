use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::{DocumentStore, FieldPatch, FieldValue, StoreError};

/// In-process document store. Same merge semantics as the Postgres store;
/// contents are lost on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Map<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a whole document, replacing whatever was there.
    #[cfg(test)]
    pub fn insert(&self, collection: &str, doc_id: &str, body: Map<String, Value>) {
        self.lock()
            .insert((collection.to_string(), doc_id.to_string()), body);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Map<String, Value>>> {
        // A poisoned map is still structurally valid; keep serving.
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn merge(
        &self,
        collection: &str,
        doc_id: &str,
        patch: FieldPatch,
    ) -> Result<(), StoreError> {
        let now = Value::String(Utc::now().to_rfc3339());
        let mut documents = self.lock();
        let document = documents
            .entry((collection.to_string(), doc_id.to_string()))
            .or_default();
        for (key, value) in patch.iter() {
            let value = match value {
                FieldValue::Json(v) => v.clone(),
                FieldValue::ServerTimestamp => now.clone(),
            };
            document.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        Ok(self
            .lock()
            .get(&(collection.to_string(), doc_id.to_string()))
            .cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
