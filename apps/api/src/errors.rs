use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::intake::analyze::AnalysisError;
use crate::intake::extract::ExtractionError;
use crate::intake::persist::PersistenceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Causes are logged here and never echoed to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable classification returned in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Analysis(_) => "ANALYSIS_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Analysis(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::PayloadTooLarge(detail) => {
                tracing::warn!("Upload rejected: {detail}");
                "Uploaded file exceeds the size limit".to_string()
            }
            AppError::Extraction(e) => {
                tracing::error!("Extraction error: {e}");
                "Could not read text from the uploaded document".to_string()
            }
            AppError::Analysis(e) => {
                tracing::error!("Analysis error: {e}");
                "The AI service returned no usable data".to_string()
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                "Saving the analysis failed".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_request_body_carries_code_and_message() {
        let response = AppError::BadRequest("No User ID provided".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "No User ID provided");
    }

    #[test]
    fn test_stage_errors_map_to_distinct_statuses() {
        let extraction = AppError::from(ExtractionError::NoText);
        let analysis = AppError::from(AnalysisError::EmptyResponse);
        assert_eq!(extraction.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(extraction.code(), "EXTRACTION_ERROR");
        assert_eq!(analysis.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(analysis.code(), "ANALYSIS_ERROR");
    }
}
