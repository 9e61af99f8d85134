//! Document store seam: keyed JSON documents grouped into collections, written
//! with merge semantics.
//!
//! `AppState` holds an `Arc<dyn DocumentStore>`; `PgDocumentStore` backs it in
//! production and `MemoryDocumentStore` covers local runs and tests.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored document {collection}/{doc_id} is not a JSON object")]
    CorruptDocument { collection: String, doc_id: String },
}

/// A value to write into a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    /// Resolved by the store to its own clock at write time.
    ServerTimestamp,
}

/// Fields for a single merge-write, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    fields: Vec<(String, FieldValue)>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), FieldValue::Json(value)));
        self
    }

    pub fn server_timestamp(mut self, key: impl Into<String>) -> Self {
        self.fields.push((key.into(), FieldValue::ServerTimestamp));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON-valued fields as an object.
    pub fn json_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(k, v)| match v {
                FieldValue::Json(value) => Some((k.clone(), value.clone())),
                FieldValue::ServerTimestamp => None,
            })
            .collect()
    }

    /// Names of the fields to stamp with the store's clock.
    pub fn timestamp_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, v)| matches!(v, FieldValue::ServerTimestamp))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the document if absent, then replaces only the top-level fields
    /// named in `patch`. All other fields are left untouched.
    async fn merge(
        &self,
        collection: &str,
        doc_id: &str,
        patch: FieldPatch,
    ) -> Result<(), StoreError>;

    async fn get(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError>;

    /// Backend name, for logging.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_splits_json_and_timestamp_fields() {
        let patch = FieldPatch::new()
            .set("ai_analysis", json!({"gpa": "3.9"}))
            .server_timestamp("updated_at");

        let json_fields = patch.json_fields();
        assert_eq!(json_fields.len(), 1);
        assert_eq!(json_fields["ai_analysis"], json!({"gpa": "3.9"}));
        assert_eq!(patch.timestamp_fields(), vec!["updated_at".to_string()]);
    }
}
