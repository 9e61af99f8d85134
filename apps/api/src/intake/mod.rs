// Resume intake: extract text from an uploaded PDF, have the AI service
// structure it, and merge the result into the student's document.
// All LLM calls go through llm_client; all writes go through store.

pub mod analyze;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod persist;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;

pub use pipeline::Pipeline;
