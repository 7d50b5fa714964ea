// Image rendering: fixed carousel templates, text-fit rules, SVG filling, rasterization
// and the retrying render controller.
// Rasterization is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod controller;
pub mod filler;
pub mod fit;
pub mod font_metrics;
pub mod raster;
pub mod templates;
