//! Analyzer: resume text to a structured record via one completion call.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::intake::models::AnalysisResult;
use crate::intake::prompts::RESUME_ANALYSIS_PROMPT;
use crate::intake::sanitize::sanitize_response;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmError, TextCompletion};

/// Longest resume prefix, in characters, sent to the model.
pub const MAX_RESUME_CHARS: usize = 10_000;

/// How much of the raw response goes into debug logs.
const RAW_LOG_PREFIX_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Completion call failed: {0}")]
    Completion(#[from] LlmError),

    #[error("AI service returned an empty response")]
    EmptyResponse,

    #[error("AI response is not valid JSON: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("AI response is JSON but not an object (got {kind})")]
    NotAnObject { kind: &'static str, raw: String },
}

impl AnalysisError {
    /// The raw model output that triggered the failure, when there was one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AnalysisError::Malformed { raw, .. } | AnalysisError::NotAnObject { raw, .. } => {
                Some(raw)
            }
            _ => None,
        }
    }
}

/// Returns the first `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_prompt(resume_text: &str) -> String {
    RESUME_ANALYSIS_PROMPT.replace(
        "{resume_text}",
        truncate_chars(resume_text, MAX_RESUME_CHARS),
    )
}

/// Parses a sanitized model response. Anything but a JSON object is an error.
pub fn parse_response(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let clean = sanitize_response(raw);
    if clean.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    match serde_json::from_str::<Value>(clean) {
        Ok(Value::Object(fields)) => Ok(AnalysisResult::new(fields)),
        Ok(other) => Err(AnalysisError::NotAnObject {
            kind: json_kind(&other),
            raw: raw.to_string(),
        }),
        Err(source) => Err(AnalysisError::Malformed {
            source,
            raw: raw.to_string(),
        }),
    }
}

/// Sends the resume to the model once and parses its answer.
pub async fn analyze(
    text: &str,
    llm: &dyn TextCompletion,
) -> Result<AnalysisResult, AnalysisError> {
    let prompt = build_prompt(text);
    info!("Sending resume to {}", llm.model());

    let completion = match llm.complete(&prompt, JSON_ONLY_SYSTEM).await {
        Ok(c) => c,
        Err(e) => {
            error!("AI analysis failed: {e}");
            if let Some(feedback) = e.feedback() {
                warn!("Safety feedback: {feedback}");
            }
            return Err(e.into());
        }
    };

    debug!(
        finish_reason = ?completion.finish_reason,
        "Raw AI response: {}...",
        truncate_chars(&completion.text, RAW_LOG_PREFIX_CHARS)
    );

    let result = parse_response(&completion.text).map_err(|e| {
        error!("AI analysis failed: {e}");
        if let Some(raw) = e.raw_response() {
            error!("Offending AI response: {raw}");
        }
        if let Some(feedback) = &completion.prompt_feedback {
            warn!("Safety feedback: {feedback}");
        }
        e
    })?;

    let missing = result.missing_canonical_keys();
    if !missing.is_empty() {
        warn!("AI response is missing canonical keys: {missing:?}");
    }
    debug!(
        skills = ?result.skills(),
        gpa = ?result.gpa(),
        degree = ?result.degree(),
        "Parsed analysis"
    );
    Ok(result)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
