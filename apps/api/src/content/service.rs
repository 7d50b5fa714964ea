//! Content service: request text → `StructuredContent`.
//!
//! The pipeline holds an `Arc<dyn ContentService>`; `LlmContentService` is the production
//! backend and tests substitute scripted fakes.

use async_trait::async_trait;
use tracing::info;

use crate::content::models::StructuredContent;
use crate::content::prompts::{CONTENT_PROMPT_TEMPLATE, CONTENT_SYSTEM, NO_HISTORY};
use crate::content::ContentError;
use crate::llm_client::prompts::LENGTH_LIMIT_INSTRUCTION;
use crate::llm_client::LlmClient;

#[async_trait]
pub trait ContentService: Send + Sync {
    /// Generates post content for `request`, avoiding the headlines in `history`.
    async fn generate(
        &self,
        request: &str,
        history: &[String],
    ) -> Result<StructuredContent, ContentError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmContentService
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmContentService {
    llm: LlmClient,
    max_pages: usize,
}

impl LlmContentService {
    pub fn new(llm: LlmClient, max_pages: usize) -> Self {
        Self { llm, max_pages }
    }
}

#[async_trait]
impl ContentService for LlmContentService {
    async fn generate(
        &self,
        request: &str,
        history: &[String],
    ) -> Result<StructuredContent, ContentError> {
        let prompt = build_prompt(request, history, self.max_pages);
        let content: StructuredContent = self.llm.call_json(&prompt, CONTENT_SYSTEM).await?;

        info!(
            model = self.llm.model(),
            pages = content.content_pages.len(),
            headline = %content.headline(),
            "Content generated"
        );
        Ok(content)
    }
}

pub fn build_prompt(request: &str, history: &[String], max_pages: usize) -> String {
    let history_block = if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history
            .iter()
            .map(|h| format!("- {h}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    CONTENT_PROMPT_TEMPLATE
        .replace("{request}", request.trim())
        .replace("{history}", &history_block)
        .replace("{max_pages}", &max_pages.to_string())
        .replace("{length_rule}", LENGTH_LIMIT_INSTRUCTION)
}
