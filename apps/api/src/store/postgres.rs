use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

use super::{DocumentStore, FieldPatch, StoreError};

/// PostgreSQL-backed document store. Each document is one JSONB row keyed by
/// `(collection, doc_id)`; merges use JSONB concatenation so only the patched
/// top-level keys change.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn merge(
        &self,
        collection: &str,
        doc_id: &str,
        patch: FieldPatch,
    ) -> Result<(), StoreError> {
        let json_fields = Value::Object(patch.json_fields());
        let timestamp_fields = patch.timestamp_fields();

        // Timestamp keys are stamped with the database clock inside the statement.
        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, body, updated_at)
            VALUES (
                $1,
                $2,
                $3::jsonb || (
                    SELECT COALESCE(jsonb_object_agg(k, to_jsonb(now())), '{}'::jsonb)
                    FROM unnest($4::text[]) AS k
                ),
                now()
            )
            ON CONFLICT (collection, doc_id)
            DO UPDATE SET body = documents.body || EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(doc_id)
        .bind(&json_fields)
        .bind(&timestamp_fields)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND doc_id = $2")
                .bind(collection)
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;

        match body {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(StoreError::CorruptDocument {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            }),
        }
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
