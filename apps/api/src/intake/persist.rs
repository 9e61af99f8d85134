//! Persister: merge-writes an analysis into the user's student document.

use thiserror::Error;
use tracing::info;

use crate::intake::models::AnalysisResult;
use crate::store::{DocumentStore, FieldPatch, StoreError};

pub const STUDENTS_COLLECTION: &str = "students";
pub const ANALYSIS_FIELD: &str = "ai_analysis";
pub const UPDATED_AT_FIELD: &str = "updated_at";

#[derive(Debug, Error)]
#[error("Failed to save analysis for '{user_id}': {source}")]
pub struct PersistenceError {
    pub user_id: String,
    #[source]
    pub source: StoreError,
}

/// Writes `ai_analysis` and a server timestamp into `students/{user_id}`.
/// Other fields of the document are preserved.
pub async fn persist(
    store: &dyn DocumentStore,
    user_id: &str,
    result: &AnalysisResult,
) -> Result<(), PersistenceError> {
    let patch = FieldPatch::new()
        .set(ANALYSIS_FIELD, result.to_value())
        .server_timestamp(UPDATED_AT_FIELD);

    store
        .merge(STUDENTS_COLLECTION, user_id, patch)
        .await
        .map_err(|source| PersistenceError {
            user_id: user_id.to_string(),
            source,
        })?;

    info!(
        "Saved analysis to {}/{user_id} ({} store)",
        STUDENTS_COLLECTION,
        store.backend()
    );
    Ok(())
}
