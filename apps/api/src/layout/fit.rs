//! Character-budget fit checks for template placeholders.
//!
//! Fit is a pure character-count check: no glyph measurement happens at this layer.
//! A container has a budget (`max_chars`) at its nominal font size. Rendering the
//! text smaller buys proportionally more room, down to the minimum legible size.
//! Past that floor the only remedy is truncation, which the caller performs.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// Smallest fraction of the nominal size a placeholder may be shrunk to.
pub const MIN_FONT_SCALE: f32 = 0.75;

/// Absolute legibility floor in pixels on a 1080×1080 canvas.
pub const MIN_LEGIBLE_SIZE_PX: f32 = 18.0;

/// Marker appended to truncated text. Counts as one character.
pub const TRUNCATION_MARKER: &str = "…";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Result of checking one string against one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub fits: bool,
    /// Characters over budget at the nominal size (0 when `fits`).
    pub overflow_chars: usize,
    /// Font size that would make the text fit, never above nominal and never below the floor.
    pub suggested_size: f32,
    /// True when even the floor size cannot hold the text.
    pub needs_truncation: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluation
// ────────────────────────────────────────────────────────────────────────────

/// Decides whether `text` fits a container of `max_chars` at `nominal_size`.
///
/// When it does not fit, `suggested_size` scales the nominal size down by
/// `max_chars / len`, clamped at [`min_legible_size`].
pub fn evaluate(text: &str, max_chars: usize, nominal_size: f32) -> FitResult {
    let len = char_len(text);

    if len <= max_chars {
        return FitResult {
            fits: true,
            overflow_chars: 0,
            suggested_size: nominal_size,
            needs_truncation: false,
        };
    }

    let floor = min_legible_size(nominal_size);
    let ideal = nominal_size * max_chars as f32 / len as f32;
    // Half-pixel steps, rounded down so the resized capacity never falls short.
    let rounded = (ideal * 2.0).floor() / 2.0;

    FitResult {
        fits: false,
        overflow_chars: len - max_chars,
        suggested_size: rounded.max(floor).min(nominal_size),
        needs_truncation: ideal < floor,
    }
}

/// Minimum size a placeholder with the given nominal size may be rendered at.
pub fn min_legible_size(nominal_size: f32) -> f32 {
    (nominal_size * MIN_FONT_SCALE)
        .max(MIN_LEGIBLE_SIZE_PX)
        .min(nominal_size)
}

/// Character capacity of a container rendered at `size` instead of `nominal_size`.
pub fn capacity_at(max_chars: usize, nominal_size: f32, size: f32) -> usize {
    if size <= 0.0 || size >= nominal_size {
        return max_chars;
    }
    // Epsilon absorbs float error so `capacity_at(suggested_size)` covers the text.
    (max_chars as f32 * nominal_size / size + 1e-3).floor() as usize
}

/// Length in characters (not bytes), so CJK text is budgeted per glyph.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

// ────────────────────────────────────────────────────────────────────────────
// Truncation
// ────────────────────────────────────────────────────────────────────────────

/// Truncates `text` to at most `max_chars` characters, marker included.
///
/// Cuts at the last whitespace when that keeps at least half of the budget,
/// otherwise at a character boundary. Text already within budget is returned as-is.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }

    let marker_len = char_len(TRUNCATION_MARKER);
    if max_chars <= marker_len {
        return TRUNCATION_MARKER.chars().take(max_chars).collect();
    }

    let keep = max_chars - marker_len;
    let head: String = text.chars().take(keep).collect();

    // The next character being whitespace means the cut already lands on a word boundary.
    let next_is_space = text
        .chars()
        .nth(keep)
        .map(char::is_whitespace)
        .unwrap_or(false);

    let cut = if next_is_space {
        head.as_str()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(idx) if char_len(&head[..idx]) * 2 >= keep => &head[..idx],
            _ => head.as_str(),
        }
    };

    let trimmed = cut.trim_end_matches(|c: char| c.is_whitespace() || is_trailing_punct(c));
    let body = if trimmed.is_empty() { cut.trim_end() } else { trimmed };

    format!("{body}{TRUNCATION_MARKER}")
}

fn is_trailing_punct(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '-' | '，' | '、' | '；' | '：')
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
