//! Orchestrator: runs one upload through save → extract → analyze → persist.
//!
//! Stages run strictly in sequence and the first failure is terminal: later
//! stages never run and nothing is retried.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::analyze::analyze;
use crate::intake::extract::extract;
use crate::intake::models::{AnalysisResult, UploadRequest};
use crate::intake::persist::persist;
use crate::llm_client::TextCompletion;
use crate::store::DocumentStore;

/// Lifecycle of a single request as recorded in log lines.
///
/// Every request ends in exactly one terminal state: `Responded` on success,
/// or the failure state of the stage that stopped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    FileSaved,
    TextExtracted,
    Analyzed,
    Persisted,
    Responded,
    ExtractionFailed,
    AnalysisFailed,
    PersistenceFailed,
}

impl Stage {
    /// Terminal failure state for an error raised inside the pipeline.
    /// Errors from outside a processing stage (upload I/O) have none.
    pub fn failed_at(err: &AppError) -> Option<Stage> {
        match err {
            AppError::Extraction(_) => Some(Stage::ExtractionFailed),
            AppError::Analysis(_) => Some(Stage::AnalysisFailed),
            AppError::Persistence(_) => Some(Stage::PersistenceFailed),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::FileSaved => "file_saved",
            Stage::TextExtracted => "text_extracted",
            Stage::Analyzed => "analyzed",
            Stage::Persisted => "persisted",
            Stage::Responded => "responded",
            Stage::ExtractionFailed => "extraction_failed",
            Stage::AnalysisFailed => "analysis_failed",
            Stage::PersistenceFailed => "persistence_failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    upload_dir: PathBuf,
    llm: Arc<dyn TextCompletion>,
    store: Arc<dyn DocumentStore>,
}

impl Pipeline {
    pub fn new(
        upload_dir: PathBuf,
        llm: Arc<dyn TextCompletion>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            upload_dir,
            llm,
            store,
        }
    }

    /// Where the upload for `user_id` is kept. One file per user; re-uploads overwrite.
    pub fn upload_path(&self, user_id: &str) -> PathBuf {
        self.upload_dir.join(format!("{user_id}.pdf"))
    }

    pub async fn run(&self, request: UploadRequest) -> Result<AnalysisResult, AppError> {
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            user_id = %request.user_id,
            stage = %Stage::Received,
            "Processing upload"
        );

        match self.run_stages(request_id, request).await {
            Ok(result) => {
                info!(%request_id, stage = %Stage::Responded, "Upload processed");
                Ok(result)
            }
            Err(e) => {
                match Stage::failed_at(&e) {
                    Some(stage) => warn!(%request_id, %stage, "Upload failed: {e}"),
                    None => warn!(%request_id, "Upload failed: {e}"),
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        request: UploadRequest,
    ) -> Result<AnalysisResult, AppError> {
        let user_id = request.user_id.as_str();

        let path = self.upload_path(user_id);
        save_upload(&self.upload_dir, &path, request.file_bytes).await?;
        info!(%request_id, stage = %Stage::FileSaved, path = %path.display());

        let text = extract(&path).await?;
        info!(%request_id, stage = %Stage::TextExtracted, chars = text.chars().count());

        let result = analyze(&text, self.llm.as_ref()).await?;
        info!(%request_id, stage = %Stage::Analyzed, keys = result.fields().len());

        persist(self.store.as_ref(), user_id, &result).await?;
        info!(%request_id, stage = %Stage::Persisted);

        Ok(result)
    }
}

/// Writes the upload to a temp file beside `path`, then renames it into place.
async fn save_upload(dir: &Path, path: &Path, bytes: bytes::Bytes) -> Result<(), AppError> {
    let dir = dir.to_path_buf();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create upload dir '{}'", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .context("Failed to create temp file for upload")?;
        tmp.write_all(&bytes).context("Failed to write upload")?;
        tmp.as_file().sync_all().context("Failed to flush upload")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to move upload to '{}'", path.display()))?;
        Ok(())
    })
    .await
    .context("Upload writer task failed")??;
    Ok(())
}
