use crate::intake::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Intake pipeline holding the LLM client and document store behind trait objects.
    pub pipeline: Pipeline,
}
