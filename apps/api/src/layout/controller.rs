//! Image Render Controller: one render target → one stored PNG, or a failure report.
//!
//! # Architecture
//! - `RenderController::render` drives a phase machine with at most `MAX_ATTEMPTS` attempts.
//! - `Drafting` opens an attempt. `Checking` compares every placeholder with its capacity
//!   at the current font size.
//! - A misfit goes to `Resizing`: shrink to the suggested size, or truncate to the budget
//!   once the legibility floor is reached. That closes the attempt.
//! - Otherwise `Rasterizing` fills the template and rasterizes it via
//!   `tokio::task::spawn_blocking`. Fill and raster errors close the attempt and the same
//!   values are retried.
//! - Only a successful raster is written to the blob store.
//!
//! Callers see three outcomes: `Done`, `NotPersisted` (rendered but the store write
//! failed) and `Failed`.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::layout::filler::fill;
use crate::layout::fit::{capacity_at, char_len, evaluate, truncate};
use crate::layout::raster::{Rasterizer, CANVAS_SIZE};
use crate::layout::templates::{RenderTarget, TemplateId};
use crate::storage::{image_key, BlobStore, PNG_CONTENT_TYPE};

/// Upper bound on attempts per image.
pub const MAX_ATTEMPTS: u8 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// A change made to one placeholder between attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    Resize {
        placeholder: String,
        from_size: f32,
        to_size: f32,
    },
    Truncate {
        placeholder: String,
        from_chars: usize,
        to_chars: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { key: String },
    FitOverflow { placeholders: Vec<String> },
    FillFailed { reason: String },
    RasterFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderAttempt {
    /// 1-based.
    pub number: u8,
    pub adjustments: Vec<Adjustment>,
    pub outcome: AttemptOutcome,
}

/// A successfully rendered and stored image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedImage {
    pub template: TemplateId,
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub format: &'static str,
    /// Number of the attempt that succeeded.
    pub attempts: u8,
    /// Every attempt in order, ending with the successful one.
    pub attempt_log: Vec<RenderAttempt>,
    /// Final placeholder values, after any truncation.
    pub fields: BTreeMap<String, String>,
    pub font_sizes: BTreeMap<String, f32>,
}

/// Why an image could not be rendered, and what to change in the content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub template: TemplateId,
    pub problem: String,
    pub attempts: Vec<RenderAttempt>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Done(RenderedImage),
    /// Rendered, but the blob store rejected the write. `fields` holds the final values.
    NotPersisted {
        template: TemplateId,
        key: String,
        fields: BTreeMap<String, String>,
        error: String,
    },
    Failed(FailureReport),
}

// ────────────────────────────────────────────────────────────────────────────
// Phase machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum RenderPhase {
    Drafting,
    Checking,
    Resizing(Vec<String>),
    Rasterizing,
    Done(Vec<u8>),
    Failed,
}

/// Working copy of a target's values and sizes for one render.
struct Draft {
    template: TemplateId,
    values: BTreeMap<String, String>,
    sizes: BTreeMap<String, f32>,
    budgets: BTreeMap<String, (usize, f32)>,
}

impl Draft {
    fn new(target: &RenderTarget) -> Self {
        let mut values = BTreeMap::new();
        let mut sizes = BTreeMap::new();
        let mut budgets = BTreeMap::new();
        for p in &target.placeholders {
            values.insert(p.name.clone(), p.value.clone());
            sizes.insert(p.name.clone(), p.nominal_size);
            budgets.insert(p.name.clone(), (p.max_chars, p.nominal_size));
        }
        Self {
            template: target.template,
            values,
            sizes,
            budgets,
        }
    }

    /// Placeholders whose text exceeds their capacity at the current size.
    fn misfits(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(name, text)| {
                let (max_chars, nominal) = self.budgets[*name];
                let size = self.sizes[*name];
                char_len(text) > capacity_at(max_chars, nominal, size)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn adjust(&mut self, placeholder: &str) -> Option<Adjustment> {
        let (max_chars, nominal) = *self.budgets.get(placeholder)?;
        let text = self.values.get_mut(placeholder)?;
        let size = self.sizes.get_mut(placeholder)?;

        let fit = evaluate(text, max_chars, nominal);
        if fit.fits {
            return None;
        }

        if fit.needs_truncation || fit.suggested_size >= *size {
            let from_chars = char_len(text);
            *text = truncate(text, max_chars);
            *size = nominal;
            Some(Adjustment::Truncate {
                placeholder: placeholder.to_string(),
                from_chars,
                to_chars: char_len(text),
            })
        } else {
            let from_size = *size;
            *size = fit.suggested_size;
            Some(Adjustment::Resize {
                placeholder: placeholder.to_string(),
                from_size,
                to_size: fit.suggested_size,
            })
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

pub struct RenderController {
    rasterizer: Arc<dyn Rasterizer>,
    store: Arc<dyn BlobStore>,
}

impl RenderController {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, store: Arc<dyn BlobStore>) -> Self {
        Self { rasterizer, store }
    }

    /// Renders `target` and stores the PNG under `namespace`.
    pub async fn render(&self, target: &RenderTarget, namespace: &str) -> RenderOutcome {
        let mut draft = Draft::new(target);
        let mut attempts: Vec<RenderAttempt> = Vec::new();
        let mut number = 0u8;
        let mut phase = RenderPhase::Drafting;

        loop {
            phase = match phase {
                RenderPhase::Drafting => {
                    if number >= MAX_ATTEMPTS {
                        RenderPhase::Failed
                    } else {
                        number += 1;
                        debug!(template = %draft.template, attempt = number, "Render attempt started");
                        RenderPhase::Checking
                    }
                }

                RenderPhase::Checking => {
                    let misfits = draft.misfits();
                    if misfits.is_empty() {
                        RenderPhase::Rasterizing
                    } else {
                        RenderPhase::Resizing(misfits)
                    }
                }

                RenderPhase::Resizing(misfits) => {
                    let adjustments: Vec<Adjustment> =
                        misfits.iter().filter_map(|p| draft.adjust(p)).collect();
                    info!(
                        template = %draft.template,
                        attempt = number,
                        placeholders = ?misfits,
                        "Text overflow, adjusting"
                    );
                    attempts.push(RenderAttempt {
                        number,
                        adjustments,
                        outcome: AttemptOutcome::FitOverflow {
                            placeholders: misfits,
                        },
                    });
                    RenderPhase::Drafting
                }

                RenderPhase::Rasterizing => match self.rasterize(&draft).await {
                    Ok(png) => RenderPhase::Done(png),
                    Err(outcome) => {
                        warn!(
                            template = %draft.template,
                            attempt = number,
                            outcome = ?outcome,
                            "Render attempt failed"
                        );
                        attempts.push(RenderAttempt {
                            number,
                            adjustments: vec![],
                            outcome,
                        });
                        RenderPhase::Drafting
                    }
                },

                RenderPhase::Done(png) => {
                    return self.persist(draft, number, attempts, png, namespace).await;
                }

                RenderPhase::Failed => {
                    let report = failure_report(&draft, attempts);
                    warn!(
                        template = %report.template,
                        attempts = report.attempts.len(),
                        problem = %report.problem,
                        "Render failed after max attempts"
                    );
                    return RenderOutcome::Failed(report);
                }
            };
        }
    }

    async fn rasterize(&self, draft: &Draft) -> Result<Vec<u8>, AttemptOutcome> {
        let filled = fill(draft.template, &draft.values, &draft.sizes).map_err(|e| {
            AttemptOutcome::FillFailed {
                reason: e.to_string(),
            }
        })?;

        // CPU-bound: keep the async executor free.
        let rasterizer = Arc::clone(&self.rasterizer);
        tokio::task::spawn_blocking(move || rasterizer.render(&filled))
            .await
            .map_err(|e| AttemptOutcome::RasterFailed {
                reason: format!("raster task failed: {e}"),
            })?
            .map_err(|e| AttemptOutcome::RasterFailed {
                reason: e.to_string(),
            })
    }

    async fn persist(
        &self,
        draft: Draft,
        number: u8,
        mut attempts: Vec<RenderAttempt>,
        png: Vec<u8>,
        namespace: &str,
    ) -> RenderOutcome {
        let key = image_key(namespace, draft.template);
        let size = png.len();

        if let Err(e) = self
            .store
            .put(&key, Bytes::from(png), PNG_CONTENT_TYPE)
            .await
        {
            warn!(template = %draft.template, key = %key, error = %e, "Rendered image not persisted");
            return RenderOutcome::NotPersisted {
                template: draft.template,
                key,
                fields: draft.values,
                error: e.to_string(),
            };
        }

        info!(
            template = %draft.template,
            key = %key,
            attempts = number,
            bytes = size,
            backend = self.rasterizer.name(),
            "Image rendered"
        );
        attempts.push(RenderAttempt {
            number,
            adjustments: vec![],
            outcome: AttemptOutcome::Success { key: key.clone() },
        });
        RenderOutcome::Done(RenderedImage {
            template: draft.template,
            key,
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
            format: "png",
            attempts: number,
            attempt_log: attempts,
            fields: draft.values,
            font_sizes: draft.sizes,
        })
    }
}

fn failure_report(draft: &Draft, attempts: Vec<RenderAttempt>) -> FailureReport {
    let problem = match attempts.last().map(|a| &a.outcome) {
        Some(AttemptOutcome::FillFailed { reason }) => format!("template fill failed: {reason}"),
        Some(AttemptOutcome::RasterFailed { reason }) => format!("rasterization failed: {reason}"),
        Some(AttemptOutcome::FitOverflow { placeholders }) => {
            format!("text still overflows: {}", placeholders.join(", "))
        }
        Some(AttemptOutcome::Success { .. }) | None => "no successful attempt".to_string(),
    };

    let missing: Vec<&str> = draft
        .template
        .template()
        .slots
        .iter()
        .map(|slot| slot.name)
        .filter(|name| !draft.values.contains_key(*name))
        .collect();
    let fill_failed = matches!(
        attempts.last().map(|a| &a.outcome),
        Some(AttemptOutcome::FillFailed { .. })
    );

    // Longest text relative to its budget is the first thing to cut.
    let worst = draft
        .values
        .iter()
        .map(|(name, text)| {
            let (max_chars, _) = draft.budgets[name];
            (name, char_len(text), max_chars)
        })
        .max_by(|a, b| {
            let ra = a.1 as f32 / a.2.max(1) as f32;
            let rb = b.1 as f32 / b.2.max(1) as f32;
            ra.total_cmp(&rb)
        });

    let recommendation = match worst {
        _ if fill_failed && !missing.is_empty() => format!(
            "Provide a value for {} on {}, then regenerate it.",
            missing
                .iter()
                .map(|name| format!("'{name}'"))
                .collect::<Vec<_>>()
                .join(", "),
            draft.template
        ),
        Some((name, len, max_chars)) => format!(
            "Shorten '{name}' ({len} characters) to well under {max_chars} characters and \
             avoid unusual symbols, then regenerate {}.",
            draft.template
        ),
        None => format!("Provide a value for every placeholder of {}.", draft.template),
    };

    FailureReport {
        template: draft.template,
        problem,
        attempts,
        recommendation,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
