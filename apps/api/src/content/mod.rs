// Content generation: the structured text payload of a post, its schema limits,
// the headline history and the service that produces it.
// All LLM calls go through llm_client.

pub mod history;
pub mod models;
pub mod prompts;
pub mod service;
pub mod validation;

use thiserror::Error;

use crate::llm_client::LlmError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content service call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("content service unavailable: {0}")]
    Unavailable(String),

    #[error("generated content is unusable: {0}")]
    Unusable(String),
}
