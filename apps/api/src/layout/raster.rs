//! Rasterizer backends: filled SVG template → 1080×1080 PNG bytes.
//!
//! Both backends are synchronous and CPU-bound; the render controller calls them
//! from `tokio::task::spawn_blocking`.

use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use thiserror::Error;
use tracing::info;

use crate::layout::filler::FilledTemplate;
use crate::layout::font_metrics::get_metrics;
use crate::layout::templates::Anchor;

/// Output canvas edge in pixels.
pub const CANVAS_SIZE: u32 = 1080;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RasterError {
    #[error("malformed template markup: {0}")]
    MalformedInput(String),

    #[error("raster backend failed: {0}")]
    Backend(String),
}

/// Converts a filled template into PNG bytes at `CANVAS_SIZE`×`CANVAS_SIZE`.
pub trait Rasterizer: Send + Sync {
    fn render(&self, filled: &FilledTemplate) -> Result<Vec<u8>, RasterError>;

    fn name(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// Backend selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterBackend {
    Resvg,
    Basic,
}

impl FromStr for RasterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resvg" => Ok(RasterBackend::Resvg),
            "basic" => Ok(RasterBackend::Basic),
            other => Err(format!("unknown raster backend '{other}' (expected resvg or basic)")),
        }
    }
}

pub fn build_rasterizer(backend: RasterBackend) -> Arc<dyn Rasterizer> {
    match backend {
        RasterBackend::Resvg => Arc::new(ResvgRasterizer::new()),
        RasterBackend::Basic => Arc::new(BasicRasterizer),
    }
}

fn parse_svg(svg: &str, options: &usvg::Options) -> Result<usvg::Tree, RasterError> {
    usvg::Tree::from_str(svg, options).map_err(|e| RasterError::MalformedInput(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// resvg backend
// ────────────────────────────────────────────────────────────────────────────

/// Vector rasterization with shaped text. The font database is loaded once.
pub struct ResvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgRasterizer {
    /// Loads system fonts. Slow (directory scan); build once at startup.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        info!(faces = db.len(), "Loaded system fonts for resvg");
        Self::from_database(db)
    }

    pub fn from_database(db: usvg::fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(db),
        }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn render(&self, filled: &FilledTemplate) -> Result<Vec<u8>, RasterError> {
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = parse_svg(&filled.svg, &options)?;

        let mut pixmap = Pixmap::new(CANVAS_SIZE, CANVAS_SIZE)
            .ok_or_else(|| RasterError::Backend("could not allocate pixmap".to_string()))?;

        let size = tree.size();
        let transform = Transform::from_scale(
            CANVAS_SIZE as f32 / size.width(),
            CANVAS_SIZE as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| RasterError::Backend(format!("png encoding failed: {e}")))
    }

    fn name(&self) -> &'static str {
        "resvg"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// basic backend
// ────────────────────────────────────────────────────────────────────────────

/// Flat raster drawing: background colour plus one ink band per text line.
///
/// Needs no fonts. The markup is still parsed so malformed input fails the same way
/// it does under resvg.
pub struct BasicRasterizer;

impl Rasterizer for BasicRasterizer {
    fn render(&self, filled: &FilledTemplate) -> Result<Vec<u8>, RasterError> {
        parse_svg(&filled.svg, &usvg::Options::default())?;

        let mut canvas = RgbImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgb(filled.background));
        let metrics = get_metrics();

        for text in &filled.texts {
            for (i, line) in text.lines.iter().enumerate() {
                let width = metrics.measure_str(line) * text.size;
                let height = text.size * 0.7;
                let baseline = text.y + text.line_height * i as f32;
                let left = match text.anchor {
                    Anchor::Start => text.x,
                    Anchor::Middle => text.x - width / 2.0,
                    Anchor::End => text.x - width,
                };
                fill_rect(&mut canvas, left, baseline - height, width, height, filled.ink);
            }
        }

        let mut buffer = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| RasterError::Backend(format!("png encoding failed: {e}")))?;
        Ok(buffer)
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

fn fill_rect(canvas: &mut RgbImage, x: f32, y: f32, w: f32, h: f32, color: [u8; 3]) {
    let max = CANVAS_SIZE as f32;
    let x0 = x.clamp(0.0, max) as u32;
    let y0 = y.clamp(0.0, max) as u32;
    let x1 = (x + w).clamp(0.0, max) as u32;
    let y1 = (y + h).clamp(0.0, max) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, Rgb(color));
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
