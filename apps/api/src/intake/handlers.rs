//! Axum route handlers for the intake API.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::intake::models::{AnalysisResult, UploadRequest};
use crate::state::AppState;

pub const FILE_FIELD: &str = "file";
pub const USER_ID_FIELD: &str = "user_id";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub data: AnalysisResult,
}

/// POST /upload_resume
///
/// Multipart form with a `file` part (the resume PDF) and a `user_id` text part.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let multipart = multipart.map_err(|e| {
        AppError::BadRequest(format!("Expected a multipart upload: {}", e.body_text()))
    })?;
    let (user_id, file) = read_upload_fields(multipart).await?;
    let request = UploadRequest::new(user_id, file)?;

    let data = state.pipeline.run(request).await?;

    Ok(Json(UploadResponse {
        message: "Success",
        data,
    }))
}

/// Drains the form so both fields are known before either is validated.
/// Unknown parts are skipped.
async fn read_upload_fields(
    mut multipart: Multipart,
) -> Result<(Option<String>, Option<Bytes>), AppError> {
    let mut user_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => file = Some(field.bytes().await.map_err(malformed)?),
            Some(USER_ID_FIELD) => user_id = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok((user_id, file))
}

/// Body-limit overruns surface from the multipart stream; everything else is a parse fault.
fn malformed(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("Malformed multipart body: {}", e.body_text()))
    }
}
