//! Template Filler: substitutes slot values and font sizes into a static SVG template.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::layout::font_metrics::get_metrics;
use crate::layout::templates::{Anchor, TemplateId};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FillError {
    #[error("template {template} has no value for placeholder '{placeholder}'")]
    MissingPlaceholder {
        template: TemplateId,
        placeholder: String,
    },
}

/// Text as laid out in one slot, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub slot: String,
    pub lines: Vec<String>,
    pub x: f32,
    /// Baseline of the first line.
    pub y: f32,
    pub size: f32,
    pub line_height: f32,
    pub anchor: Anchor,
}

/// A template instance with every token substituted. Ready for rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledTemplate {
    pub template: TemplateId,
    pub svg: String,
    pub texts: Vec<PlacedText>,
    pub background: [u8; 3],
    pub ink: [u8; 3],
}

// ────────────────────────────────────────────────────────────────────────────
// Fill
// ────────────────────────────────────────────────────────────────────────────

/// Fills the template for `template_id` with `values`, rendering each slot at the size
/// given in `sizes` (nominal when absent).
///
/// Every slot the template defines must have a value; extra entries are ignored.
pub fn fill(
    template_id: TemplateId,
    values: &BTreeMap<String, String>,
    sizes: &BTreeMap<String, f32>,
) -> Result<FilledTemplate, FillError> {
    let template = template_id.template();
    let metrics = get_metrics();

    let mut tokens: BTreeMap<String, String> = BTreeMap::new();
    let mut texts = Vec::with_capacity(template.slots.len());

    for slot in template.slots {
        let value = values
            .get(slot.name)
            .ok_or_else(|| FillError::MissingPlaceholder {
                template: template_id,
                placeholder: slot.name.to_string(),
            })?;
        let size = sizes
            .get(slot.name)
            .copied()
            .filter(|s| *s > 0.0)
            .unwrap_or(slot.nominal_size);

        let (lines, line_height) = match slot.wrap {
            Some(wrap) => (
                metrics.wrap_lines(value, wrap.width_px / size),
                size * wrap.line_spacing,
            ),
            None => (vec![value.clone()], size),
        };

        let body = if slot.wrap.is_some() {
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let dy = if i == 0 { 0.0 } else { line_height };
                    format!(
                        r#"<tspan x="{}" dy="{}">{}</tspan>"#,
                        slot.x,
                        dy,
                        escape_xml(line)
                    )
                })
                .collect::<String>()
        } else {
            escape_xml(value)
        };

        tokens.insert(format!("{}.size", slot.name), format_size(size));
        tokens.insert(slot.name.to_string(), body);

        texts.push(PlacedText {
            slot: slot.name.to_string(),
            lines,
            x: slot.x,
            y: slot.y,
            size,
            line_height,
            anchor: slot.anchor,
        });
    }

    Ok(FilledTemplate {
        template: template_id,
        svg: substitute(template.source, &tokens),
        texts,
        background: template.background,
        ink: template.ink,
    })
}

/// Replaces each `{{token}}` in `source` with its value in one left-to-right pass.
///
/// Inserted values are never rescanned. Unknown tokens are kept verbatim.
fn substitute(source: &str, tokens: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = &after[..close];
                match tokens.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn format_size(size: f32) -> String {
    // Half-pixel sizes keep one decimal; whole sizes print without one.
    if size.fract() == 0.0 {
        format!("{}", size as i32)
    } else {
        format!("{size:.1}")
    }
}

/// Escapes the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cover_values() -> BTreeMap<String, String> {
        [
            ("hashtag", "AI"),
            ("heading_line1", "AI Ethics"),
            ("heading_line2", "Why it matters"),
            ("grey_box_text", "Swipe to learn more"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_fill_cover_substitutes_every_token() {
        let filled = fill(TemplateId::Cover, &cover_values(), &BTreeMap::new()).unwrap();
        assert!(!filled.svg.contains("{{"), "unreplaced token left in {}", filled.svg);
        assert!(filled.svg.contains(">#AI</text>"));
        assert!(filled.svg.contains(r#"font-size="66""#));
        assert_eq!(filled.texts.len(), 4);
    }

    #[test]
    fn test_fill_applies_reduced_size() {
        let sizes: BTreeMap<String, f32> = [("heading_line1".to_string(), 61.5)].into();
        let filled = fill(TemplateId::Cover, &cover_values(), &sizes).unwrap();
        assert!(filled.svg.contains(r#"font-size="61.5""#));
        let heading = filled.texts.iter().find(|t| t.slot == "heading_line1").unwrap();
        assert_eq!(heading.size, 61.5);
    }

    #[test]
    fn test_fill_missing_placeholder_errors() {
        let mut values = cover_values();
        values.remove("grey_box_text");
        let err = fill(TemplateId::Cover, &values, &BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            FillError::MissingPlaceholder {
                template: TemplateId::Cover,
                placeholder: "grey_box_text".to_string(),
            }
        );
    }

    #[test]
    fn test_fill_ignores_extra_values() {
        let mut values = cover_values();
        values.insert("unused".to_string(), "x".to_string());
        assert!(fill(TemplateId::Cover, &values, &BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_fill_escapes_markup() {
        let mut values = cover_values();
        values.insert("heading_line1".to_string(), "R&D <fast>".to_string());
        let filled = fill(TemplateId::Cover, &values, &BTreeMap::new()).unwrap();
        assert!(filled.svg.contains("R&amp;D &lt;fast&gt;"));
        assert!(!filled.svg.contains("<fast>"));
    }

    #[test]
    fn test_fill_wraps_main_point_into_tspans() {
        let values: BTreeMap<String, String> = [
            ("page_number", "02"),
            ("title", "Bias"),
            (
                "main_point",
                "Models learn whatever patterns the training data holds, including its blind spots",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let filled = fill(TemplateId::ContentPage(2), &values, &BTreeMap::new()).unwrap();

        let main = filled.texts.iter().find(|t| t.slot == "main_point").unwrap();
        assert!(main.lines.len() > 1, "expected wrapping, got {:?}", main.lines);
        assert_eq!(
            filled.svg.matches("<tspan").count(),
            main.lines.len(),
            "one tspan per wrapped line"
        );
        assert_eq!(main.line_height, 60.0);
    }

    #[test]
    fn test_token_like_values_are_not_substituted_again() {
        let mut values = cover_values();
        values.insert("hashtag".to_string(), "{{heading_line1}}".to_string());
        values.insert("heading_line1".to_string(), "SECRET".to_string());
        values.insert("grey_box_text".to_string(), "{{hashtag.size}}px".to_string());
        let filled = fill(TemplateId::Cover, &values, &BTreeMap::new()).unwrap();

        assert!(filled.svg.contains(">#{{heading_line1}}</text>"), "{}", filled.svg);
        assert!(!filled.svg.contains(">#SECRET</text>"));
        assert!(filled.svg.contains(">{{hashtag.size}}px</text>"));
        assert_eq!(filled.svg.matches(">SECRET</text>").count(), 1);
    }

    #[test]
    fn test_substitute_keeps_unknown_and_unclosed_tokens() {
        let tokens: BTreeMap<String, String> = [("a".to_string(), "1".to_string())].into();
        assert_eq!(substitute("{{a}}-{{b}}-{{a", &tokens), "1-{{b}}-{{a");
        assert_eq!(substitute("no tokens", &tokens), "no tokens");
    }

    #[test]
    fn test_escape_xml_all_specials() {
        assert_eq!(escape_xml(r#"<a & "b" 'c'>"#), "&lt;a &amp; &quot;b&quot; &apos;c&apos;&gt;");
    }
}
