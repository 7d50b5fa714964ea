//! Workflow State Machine: drives one job's `WorkflowState` to a terminal stage.
//!
//! Stage policy:
//! - content: service error or unusable content fails the job. A failed `content.json`
//!   write is recorded and the job continues.
//! - images: cover first, then pages in order. A cover that cannot be rendered fails the
//!   job; a page that cannot be rendered is recorded and skipped.
//! - notification: never fails the job.
//!
//! Running the machine on a terminal state returns it unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::content::history::ContentHistory;
use crate::content::models::StructuredContent;
use crate::content::service::ContentService;
use crate::content::validation::validate;
use crate::layout::controller::{RenderController, RenderOutcome};
use crate::layout::raster::Rasterizer;
use crate::layout::templates::{RenderTarget, TemplateId};
use crate::notify::Notifier;
use crate::pipeline::workflow_state::{ErrorKind, NotificationStatus, Stage, WorkflowState};
use crate::storage::{content_key, BlobStore, JSON_CONTENT_TYPE};

/// Headlines from history included in each content prompt.
const HISTORY_PROMPT_LIMIT: usize = 10;

/// External collaborators shared by every job.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentService>,
    pub store: Arc<dyn BlobStore>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub history: Arc<ContentHistory>,
}

pub struct WorkflowMachine {
    content: Arc<dyn ContentService>,
    store: Arc<dyn BlobStore>,
    notifier: Option<Arc<dyn Notifier>>,
    history: Arc<ContentHistory>,
    renderer: RenderController,
    config: PipelineConfig,
}

impl WorkflowMachine {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        let renderer = RenderController::new(
            collaborators.rasterizer,
            Arc::clone(&collaborators.store),
        );
        Self {
            content: collaborators.content,
            store: collaborators.store,
            notifier: collaborators.notifier,
            history: collaborators.history,
            renderer,
            config,
        }
    }

    /// Runs stages until `state` is `Complete` or `Failed`.
    pub async fn run(&self, mut state: WorkflowState) -> WorkflowState {
        while !state.is_terminal() {
            let before = state.stage;
            match state.stage {
                Stage::Pending => self.content_stage(&mut state).await,
                Stage::ContentGenerated => self.images_stage(&mut state).await,
                Stage::ImagesGenerated => self.notification_stage(&mut state).await,
                Stage::Notified => {
                    state.advance(Stage::Complete);
                }
                Stage::Complete | Stage::Failed => break,
            }
            info!(
                job_id = %state.job_id,
                from = ?before,
                to = ?state.stage,
                errors = state.errors.len(),
                "Stage transition"
            );
        }
        state
    }

    // ── content ─────────────────────────────────────────────────────────────

    async fn content_stage(&self, state: &mut WorkflowState) {
        let history = self.history.recent(HISTORY_PROMPT_LIMIT).await;

        let result = self.content.generate(&state.request, &history).await;
        let generated = match result {
            Ok(content) => content,
            Err(e) => {
                error!(job_id = %state.job_id, "Content generation failed: {e}");
                state.fail(ErrorKind::ContentService, None, e.to_string());
                return;
            }
        };

        let (content, report) = match validate(generated, self.config.max_content_pages) {
            Ok(validated) => validated,
            Err(e) => {
                error!(job_id = %state.job_id, "Generated content rejected: {e}");
                state.fail(ErrorKind::ContentService, None, e.to_string());
                return;
            }
        };
        if !report.is_clean() {
            info!(
                job_id = %state.job_id,
                truncated = ?report.truncated_fields,
                dropped_pages = report.dropped_pages,
                warnings = ?report.warnings,
                "Content adjusted to schema"
            );
        }

        self.history.record(&content.headline()).await;
        self.persist_content(state, &content).await;
        state.content = Some(content);
        state.advance(Stage::ContentGenerated);
    }

    async fn persist_content(&self, state: &mut WorkflowState, content: &StructuredContent) {
        let key = content_key(&state.namespace);
        let body = match serde_json::to_vec_pretty(content) {
            Ok(body) => body,
            Err(e) => {
                state.record_error(ErrorKind::Store, Some("content.json".to_string()), e.to_string());
                return;
            }
        };

        match self.store.put(&key, Bytes::from(body), JSON_CONTENT_TYPE).await {
            Ok(()) => state.content_key = Some(key),
            Err(e) => {
                warn!(job_id = %state.job_id, key = %key, "Content not persisted: {e}");
                state.record_error(ErrorKind::Store, Some("content.json".to_string()), e.to_string());
            }
        }
    }

    // ── images ──────────────────────────────────────────────────────────────

    async fn images_stage(&self, state: &mut WorkflowState) {
        if state.options.content_only {
            info!(job_id = %state.job_id, "Content-only job, skipping images");
            state.advance(Stage::ImagesGenerated);
            return;
        }

        let Some(mut content) = state.content.clone() else {
            state.fail(ErrorKind::Render, None, "no content to render");
            return;
        };

        let mut targets = vec![RenderTarget::cover(&content.cover)];
        targets.extend(
            content
                .content_pages
                .iter()
                .zip(1u8..)
                .map(|(page, number)| RenderTarget::content_page(number, page)),
        );

        let mut changed = false;
        for target in &targets {
            let template = target.template;
            let outcome = self.renderer.render(target, &state.namespace).await;
            match outcome {
                RenderOutcome::Done(image) => {
                    changed |= write_back(&mut content, template, &image.fields);
                    state.images.push(image);
                }
                RenderOutcome::NotPersisted { key, fields, error, .. } => {
                    changed |= write_back(&mut content, template, &fields);
                    state.record_error(
                        ErrorKind::Store,
                        Some(template.to_string()),
                        format!("{key}: {error}"),
                    );
                }
                RenderOutcome::Failed(report) => {
                    let problem = report.problem.clone();
                    state.failures.push(report);
                    if template.is_cover() {
                        error!(job_id = %state.job_id, "Cover could not be rendered: {problem}");
                        state.content = Some(content);
                        state.fail(ErrorKind::Render, Some(template.to_string()), problem);
                        return;
                    }
                    warn!(job_id = %state.job_id, %template, "Skipping page: {problem}");
                    state.record_error(ErrorKind::Render, Some(template.to_string()), problem);
                }
            }
        }

        if changed {
            self.persist_content(state, &content).await;
        }
        state.content = Some(content);
        state.advance(Stage::ImagesGenerated);
    }

    // ── notification ────────────────────────────────────────────────────────

    async fn notification_stage(&self, state: &mut WorkflowState) {
        let recipient = state
            .options
            .recipient
            .clone()
            .or_else(|| self.config.default_recipient.clone())
            .filter(|r| !r.trim().is_empty());

        let ready = match (&self.notifier, &recipient, &state.content) {
            _ if state.options.content_only => None,
            (Some(notifier), Some(recipient), Some(content)) => Some((notifier, recipient, content)),
            _ => None,
        };

        let Some((notifier, recipient, content)) = ready else {
            info!(job_id = %state.job_id, "Notification not attempted");
            state.notification_status = NotificationStatus::NotAttempted;
            state.advance(Stage::Notified);
            return;
        };

        let recipient = recipient.clone();
        let result = notifier.send(&recipient, content, &state.images).await;
        state.notification_status = match result {
            Ok(receipt) => NotificationStatus::Sent { receipt },
            Err(e) => {
                warn!(job_id = %state.job_id, "Notification failed: {e}");
                let reason = e.to_string();
                state.record_error(ErrorKind::Notify, Some(recipient), reason.clone());
                NotificationStatus::Failed { reason }
            }
        };
        state.advance(Stage::Notified);
    }
}

/// Copies final render values back into `content`. Returns true if anything changed.
fn write_back(
    content: &mut StructuredContent,
    template: TemplateId,
    fields: &BTreeMap<String, String>,
) -> bool {
    let mut changed = false;
    let mut apply = |target: &mut String, name: &str| {
        if let Some(value) = fields.get(name) {
            if *target != *value {
                *target = value.clone();
                changed = true;
            }
        }
    };

    match template {
        TemplateId::Cover => {
            let cover = &mut content.cover;
            apply(&mut cover.hashtag, "hashtag");
            apply(&mut cover.heading_line1, "heading_line1");
            apply(&mut cover.heading_line2, "heading_line2");
            apply(&mut cover.grey_box_text, "grey_box_text");
        }
        TemplateId::ContentPage(n) => {
            if let Some(page) = content.content_pages.get_mut(usize::from(n).saturating_sub(1)) {
                apply(&mut page.title, "title");
                apply(&mut page.main_point, "main_point");
            }
        }
    }
    changed
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
