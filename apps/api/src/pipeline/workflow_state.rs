//! The mutable record one job carries through the workflow.
//!
//! `stage` only moves forward along `Pending → ContentGenerated → ImagesGenerated →
//! Notified → Complete`, or jumps to `Failed`. Once `Failed`, the only permitted mutation is
//! appending error records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::models::StructuredContent;
use crate::layout::controller::{FailureReport, RenderedImage};
use crate::notify::NotifyReceipt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    ContentGenerated,
    ImagesGenerated,
    Notified,
    Complete,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    NotAttempted,
    Sent { receipt: NotifyReceipt },
    Failed { reason: String },
}

/// Coarse error category, stable for API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ContentService,
    Render,
    Store,
    Notify,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub stage: Stage,
    pub kind: ErrorKind,
    /// The artifact or collaborator the error concerns, e.g. `content_02`.
    pub target: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Per-job switches supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Generate and persist content only; skip images and notification.
    #[serde(default)]
    pub content_only: bool,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub output_namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowState {
    pub job_id: Uuid,
    pub request: String,
    pub options: JobOptions,
    /// Blob-key prefix for every artifact of this job.
    pub namespace: String,
    pub stage: Stage,
    pub content: Option<StructuredContent>,
    pub content_key: Option<String>,
    pub images: Vec<RenderedImage>,
    pub failures: Vec<FailureReport>,
    pub notification_status: NotificationStatus,
    pub errors: Vec<ErrorRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(request: String, options: JobOptions, namespace: String) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            request,
            options,
            namespace,
            stage: Stage::Pending,
            content: None,
            content_key: None,
            images: Vec::new(),
            failures: Vec::new(),
            notification_status: NotificationStatus::NotAttempted,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Moves to `next` if it is strictly later in the happy path.
    /// Returns false (and changes nothing) otherwise, including from `Failed`.
    pub fn advance(&mut self, next: Stage) -> bool {
        if self.stage == Stage::Failed || next == Stage::Failed || next <= self.stage {
            return false;
        }
        self.stage = next;
        if next == Stage::Complete {
            self.finished_at = Some(Utc::now());
        }
        true
    }

    /// Records the error and transitions to `Failed`. No-op on the stage if already terminal.
    pub fn fail(&mut self, kind: ErrorKind, target: Option<String>, message: impl Into<String>) {
        self.record_error(kind, target, message);
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
            self.finished_at = Some(Utc::now());
        }
    }

    /// Appends an error record without touching the stage.
    pub fn record_error(
        &mut self,
        kind: ErrorKind,
        target: Option<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(ErrorRecord {
            stage: self.stage,
            kind,
            target,
            message: message.into(),
            at: Utc::now(),
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new("request".to_string(), JobOptions::default(), "ns".to_string())
    }

    #[test]
    fn test_advance_only_moves_forward() {
        let mut s = state();
        assert!(s.advance(Stage::ContentGenerated));
        assert!(s.advance(Stage::Notified), "skipping ahead is allowed");
        assert!(!s.advance(Stage::ImagesGenerated), "moving back is refused");
        assert!(!s.advance(Stage::Notified), "same stage is refused");
        assert_eq!(s.stage, Stage::Notified);
    }

    #[test]
    fn test_advance_refuses_failed_as_target() {
        let mut s = state();
        assert!(!s.advance(Stage::Failed));
        assert_eq!(s.stage, Stage::Pending);
    }

    #[test]
    fn test_failed_is_sticky() {
        let mut s = state();
        s.fail(ErrorKind::ContentService, None, "boom");
        assert_eq!(s.stage, Stage::Failed);
        assert!(s.finished_at.is_some());

        assert!(!s.advance(Stage::Complete));
        s.record_error(ErrorKind::Notify, None, "later");
        assert_eq!(s.stage, Stage::Failed);
        assert_eq!(s.errors.len(), 2, "errors may still be appended");
    }

    #[test]
    fn test_complete_sets_finished_at() {
        let mut s = state();
        assert!(s.finished_at.is_none());
        s.advance(Stage::Complete);
        assert!(s.finished_at.is_some());
        assert!(s.is_terminal());
    }

    #[test]
    fn test_error_record_captures_current_stage() {
        let mut s = state();
        s.advance(Stage::ContentGenerated);
        s.record_error(ErrorKind::Render, Some("content_02".to_string()), "overflow");
        assert_eq!(s.errors[0].stage, Stage::ContentGenerated);
        assert_eq!(s.errors[0].target.as_deref(), Some("content_02"));
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::ContentGenerated).unwrap(),
            "\"content_generated\""
        );
        let status = serde_json::to_value(NotificationStatus::NotAttempted).unwrap();
        assert_eq!(status["status"], "not_attempted");
    }
}
