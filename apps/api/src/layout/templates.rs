//! Carousel template definitions and render targets.
//!
//! Templates are static SVG documents with `{{slot}}` text tokens and
//! `{{slot.size}}` font-size tokens. Each slot carries its own character budget and
//! nominal font size. Budgets equal the content schema limits, so validated content
//! never loses text at render time; the wrapped main-point box is sized to hold a
//! full-length main point at its nominal size.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::content::models::{ContentPage, Cover};
use crate::content::validation::MAIN_POINT_MAX;

// ────────────────────────────────────────────────────────────────────────────
// Template identity
// ────────────────────────────────────────────────────────────────────────────

/// Identifies one image of the carousel. Serialized as its blob-key stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateId {
    Cover,
    /// 1-based page number.
    ContentPage(u8),
}

impl TemplateId {
    pub fn template(&self) -> &'static Template {
        match self {
            TemplateId::Cover => &COVER,
            TemplateId::ContentPage(_) => &CONTENT_PAGE,
        }
    }

    pub fn is_cover(&self) -> bool {
        matches!(self, TemplateId::Cover)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Cover => write!(f, "cover"),
            TemplateId::ContentPage(n) => write!(f, "content_{n:02}"),
        }
    }
}

impl Serialize for TemplateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template definitions
// ────────────────────────────────────────────────────────────────────────────

/// Horizontal anchoring of a text slot, mirroring SVG `text-anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// Greedy word-wrap settings for multi-line slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrap {
    pub width_px: f32,
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
}

/// One substitutable text slot in a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub max_chars: usize,
    pub nominal_size: f32,
    pub x: f32,
    pub y: f32,
    pub anchor: Anchor,
    pub wrap: Option<Wrap>,
}

/// A visual layout: SVG source plus the slots it expects.
#[derive(Debug)]
pub struct Template {
    pub name: &'static str,
    pub source: &'static str,
    pub slots: &'static [SlotSpec],
    /// Flat colours used by the basic raster backend.
    pub background: [u8; 3],
    pub ink: [u8; 3],
}

impl Template {
    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.name == name)
    }
}

const fn slot(
    name: &'static str,
    max_chars: usize,
    nominal_size: f32,
    x: f32,
    y: f32,
    anchor: Anchor,
) -> SlotSpec {
    SlotSpec {
        name,
        max_chars,
        nominal_size,
        x,
        y,
        anchor,
        wrap: None,
    }
}

pub static COVER: Template = Template {
    name: "cover",
    source: COVER_SVG,
    slots: &[
        slot("hashtag", 20, 22.0, 290.0, 272.0, Anchor::Middle),
        slot("heading_line1", 25, 66.0, 540.0, 430.0, Anchor::Middle),
        slot("heading_line2", 25, 66.0, 540.0, 520.0, Anchor::Middle),
        slot("grey_box_text", 35, 30.0, 540.0, 658.0, Anchor::Middle),
    ],
    background: [0x1a, 0x1a, 0x1a],
    ink: [0xff, 0xff, 0xff],
};

pub static CONTENT_PAGE: Template = Template {
    name: "content_page",
    source: CONTENT_PAGE_SVG,
    slots: &[
        slot("page_number", 2, 22.0, 900.0, 140.0, Anchor::End),
        slot("title", 35, 40.0, 190.0, 220.0, Anchor::Start),
        SlotSpec {
            name: "main_point",
            max_chars: MAIN_POINT_MAX,
            nominal_size: 40.0,
            x: 190.0,
            y: 330.0,
            anchor: Anchor::Start,
            wrap: Some(Wrap {
                width_px: 700.0,
                line_spacing: 1.5,
            }),
        },
    ],
    background: [0x1c, 0x1c, 0x1c],
    ink: [0xcc, 0xcc, 0xcc],
};

const COVER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1080 1080" width="1080" height="1080">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="#121212"/>
      <stop offset="100%" stop-color="#232323"/>
    </linearGradient>
  </defs>
  <rect width="1080" height="1080" fill="url(#bg)"/>
  <rect x="140" y="210" width="800" height="600" rx="6" ry="6" fill="#1e1e1e"/>
  <rect x="170" y="240" width="240" height="46" rx="23" ry="23" fill="#4B9CD3"/>
  <text id="hashtag" x="290" y="272" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{hashtag.size}}" font-weight="600" fill="#FFFFFF" text-anchor="middle">#{{hashtag}}</text>
  <text id="heading_line1" x="540" y="430" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{heading_line1.size}}" font-weight="700" fill="#FFFFFF" text-anchor="middle">{{heading_line1}}</text>
  <text id="heading_line2" x="540" y="520" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{heading_line2.size}}" font-weight="700" fill="#FFFFFF" text-anchor="middle">{{heading_line2}}</text>
  <rect x="190" y="600" width="700" height="90" rx="10" ry="10" fill="#3A3A3A"/>
  <text id="grey_box_text" x="540" y="658" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{grey_box_text.size}}" font-weight="500" fill="#DDDDDD" text-anchor="middle">{{grey_box_text}}</text>
</svg>"##;

const CONTENT_PAGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1080 1080" width="1080" height="1080">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="#121212"/>
      <stop offset="100%" stop-color="#232323"/>
    </linearGradient>
  </defs>
  <rect width="1080" height="1080" fill="url(#bg)"/>
  <rect x="140" y="80" width="800" height="920" rx="12" ry="12" fill="#1F1F1F"/>
  <text id="page_number" x="900" y="140" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{page_number.size}}" font-weight="500" fill="#AAAAAA" text-anchor="end">{{page_number}}</text>
  <text id="title" x="190" y="220" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{title.size}}" font-weight="700" fill="#FFFFFF">{{title}}</text>
  <rect x="190" y="250" width="100" height="5" rx="2.5" ry="2.5" fill="#4B9CD3"/>
  <text id="main_point" x="190" y="330" font-family="Noto Sans CJK TC, PingFang TC, sans-serif" font-size="{{main_point.size}}" fill="#CCCCCC">{{main_point}}</text>
</svg>"##;

// ────────────────────────────────────────────────────────────────────────────
// Render targets
// ────────────────────────────────────────────────────────────────────────────

/// A single bounded text value destined for one template slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub value: String,
    pub max_chars: usize,
    pub nominal_size: f32,
}

/// One template instance to render: identity plus ordered placeholder values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTarget {
    pub template: TemplateId,
    pub placeholders: Vec<Placeholder>,
}

impl RenderTarget {
    /// Builds a target from `(slot name, value)` pairs, taking budgets from the template.
    ///
    /// Pairs naming slots the template does not define are dropped.
    pub fn new(template: TemplateId, values: Vec<(&str, String)>) -> Self {
        let layout = template.template();
        let placeholders = values
            .into_iter()
            .filter_map(|(name, value)| {
                layout.slot(name).map(|slot| Placeholder {
                    name: slot.name.to_string(),
                    value,
                    max_chars: slot.max_chars,
                    nominal_size: slot.nominal_size,
                })
            })
            .collect();
        Self {
            template,
            placeholders,
        }
    }

    pub fn cover(cover: &Cover) -> Self {
        Self::new(
            TemplateId::Cover,
            vec![
                ("hashtag", cover.hashtag.clone()),
                ("heading_line1", cover.heading_line1.clone()),
                ("heading_line2", cover.heading_line2.clone()),
                ("grey_box_text", cover.grey_box_text.clone()),
            ],
        )
    }

    pub fn content_page(number: u8, page: &ContentPage) -> Self {
        Self::new(
            TemplateId::ContentPage(number),
            vec![
                ("page_number", format!("{number:02}")),
                ("title", page.title.clone()),
                ("main_point", page.main_point.clone()),
            ],
        )
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.placeholders
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
