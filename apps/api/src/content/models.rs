use serde::{Deserialize, Serialize};

/// Whether the content service searched the web before writing, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDecision {
    pub performed_search: bool,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub search_reason: String,
}

/// Cover image text. Each field is bounded (see `content::validation`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cover {
    /// Stored without the leading `#`; the cover template adds it.
    pub hashtag: String,
    pub heading_line1: String,
    pub heading_line2: String,
    pub grey_box_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub title: String,
    pub main_point: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngagementHooks {
    #[serde(default)]
    pub question_for_comments: String,
    #[serde(default)]
    pub sharing_incentive: String,
}

/// The text payload of one carousel post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub search_decision: Option<SearchDecision>,
    pub cover: Cover,
    #[serde(default)]
    pub content_pages: Vec<ContentPage>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub engagement_hooks: EngagementHooks,
    #[serde(default)]
    pub sources: Vec<String>,
}

fn default_content_type() -> String {
    "general".to_string()
}

impl StructuredContent {
    /// Cover headline as one line, used for history and notification subjects.
    pub fn headline(&self) -> String {
        let line1 = self.cover.heading_line1.trim();
        let line2 = self.cover.heading_line2.trim();
        match (line1.is_empty(), line2.is_empty()) {
            (false, false) => format!("{line1} {line2}"),
            (false, true) => line1.to_string(),
            (true, _) => line2.to_string(),
        }
    }
}
