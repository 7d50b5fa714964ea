//! Schema enforcement for generated content.
//!
//! Oversized fields are truncated (word-safe, with the `…` marker), never rejected.
//! Only structurally unusable content (no pages, no headline) is an error.

use tracing::warn;

use crate::content::models::StructuredContent;
use crate::content::ContentError;
use crate::layout::fit::{char_len, truncate};

pub const HASHTAG_MAX: usize = 20;
pub const HEADING_MAX: usize = 25;
pub const GREY_BOX_MAX: usize = 35;
pub const PAGE_TITLE_MAX: usize = 35;
pub const MAIN_POINT_MAX: usize = 350;
pub const CAPTION_MAX: usize = 800;
pub const CAPTION_MIN: usize = 100;
/// Page numbers are two digits on the page template.
pub const PAGE_LIMIT_MAX: usize = 99;

/// What validation changed. Empty when the content was already within schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Dotted paths of fields that were truncated, e.g. `content_pages[1].title`.
    pub truncated_fields: Vec<String>,
    pub dropped_pages: usize,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.truncated_fields.is_empty() && self.dropped_pages == 0 && self.warnings.is_empty()
    }
}

/// Normalises and bounds `content`, keeping at most `max_pages` content pages
/// (never more than `PAGE_LIMIT_MAX`).
pub fn validate(
    mut content: StructuredContent,
    max_pages: usize,
) -> Result<(StructuredContent, ValidationReport), ContentError> {
    let mut report = ValidationReport::default();
    let max_pages = max_pages.min(PAGE_LIMIT_MAX);

    let cover = &mut content.cover;
    cover.hashtag = normalize_hashtag(&cover.hashtag);
    bound(&mut cover.hashtag, HASHTAG_MAX, "cover.hashtag", &mut report);
    bound(&mut cover.heading_line1, HEADING_MAX, "cover.heading_line1", &mut report);
    bound(&mut cover.heading_line2, HEADING_MAX, "cover.heading_line2", &mut report);
    bound(&mut cover.grey_box_text, GREY_BOX_MAX, "cover.grey_box_text", &mut report);

    if content.headline().is_empty() {
        return Err(ContentError::Unusable(
            "cover has no heading text".to_string(),
        ));
    }

    content
        .content_pages
        .retain(|p| !p.title.trim().is_empty() || !p.main_point.trim().is_empty());
    if content.content_pages.is_empty() {
        return Err(ContentError::Unusable(
            "content has no content pages".to_string(),
        ));
    }
    if content.content_pages.len() > max_pages {
        report.dropped_pages = content.content_pages.len() - max_pages;
        content.content_pages.truncate(max_pages);
        warn!(
            dropped = report.dropped_pages,
            max_pages, "Dropped content pages over the page limit"
        );
    }

    for (i, page) in content.content_pages.iter_mut().enumerate() {
        bound(
            &mut page.title,
            PAGE_TITLE_MAX,
            &format!("content_pages[{i}].title"),
            &mut report,
        );
        bound(
            &mut page.main_point,
            MAIN_POINT_MAX,
            &format!("content_pages[{i}].main_point"),
            &mut report,
        );
    }

    bound(&mut content.caption, CAPTION_MAX, "caption", &mut report);
    let caption_len = char_len(&content.caption);
    if caption_len < CAPTION_MIN {
        warn!(caption_len, min = CAPTION_MIN, "Caption shorter than recommended");
        report
            .warnings
            .push(format!("caption has {caption_len} characters (minimum {CAPTION_MIN})"));
    }

    content.sources.retain(|s| !s.trim().is_empty());

    Ok((content, report))
}

/// Strips surrounding whitespace and any leading `#` characters.
pub fn normalize_hashtag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_string()
}

fn bound(field: &mut String, max: usize, path: &str, report: &mut ValidationReport) {
    let trimmed = field.trim();
    if trimmed.len() != field.len() {
        *field = trimmed.to_string();
    }
    if char_len(field) > max {
        warn!(field = path, len = char_len(field), max, "Truncating oversized field");
        *field = truncate(field, max);
        report.truncated_fields.push(path.to_string());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
