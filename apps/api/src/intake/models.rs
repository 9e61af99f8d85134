use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Keys every analysis is expected to carry. Missing ones are tolerated.
pub const CANONICAL_KEYS: [&str; 3] = ["skills", "gpa", "degree"];

/// A validated resume upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: String,
    pub file_bytes: Bytes,
}

impl UploadRequest {
    /// Validates the raw multipart fields. The user id is checked before the
    /// file so an anonymous upload is rejected without looking at its body.
    pub fn new(user_id: Option<String>, file_bytes: Option<Bytes>) -> Result<Self, AppError> {
        let user_id = validate_user_id(user_id.as_deref())?;
        let file_bytes = match file_bytes {
            None => return Err(AppError::BadRequest("No file part".to_string())),
            Some(b) if b.is_empty() => {
                return Err(AppError::BadRequest("Uploaded file is empty".to_string()))
            }
            Some(b) => b,
        };
        Ok(Self {
            user_id,
            file_bytes,
        })
    }
}

/// The id names both a file on disk and a document key, so path-like ids are refused.
fn validate_user_id(raw: Option<&str>) -> Result<String, AppError> {
    let user_id = raw.map(str::trim).unwrap_or_default();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("No User ID provided".to_string()));
    }
    let path_like = user_id == "."
        || user_id == ".."
        || user_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if path_like {
        return Err(AppError::BadRequest(format!(
            "Invalid User ID '{}'",
            user_id.escape_debug()
        )));
    }
    Ok(user_id.to_string())
}

/// Structured record returned by the AI service. Always a JSON object; keys
/// beyond the canonical three pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn skills(&self) -> Option<Vec<&str>> {
        self.0
            .get("skills")?
            .as_array()
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
    }

    pub fn gpa(&self) -> Option<&str> {
        self.0.get("gpa").and_then(Value::as_str)
    }

    pub fn degree(&self) -> Option<&str> {
        self.0.get("degree").and_then(Value::as_str)
    }

    pub fn missing_canonical_keys(&self) -> Vec<&'static str> {
        CANONICAL_KEYS
            .into_iter()
            .filter(|key| !self.0.contains_key(*key))
            .collect()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
