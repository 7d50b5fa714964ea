//! Job Orchestrator: the entry point for one carousel job.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use crate::pipeline::machine::{Collaborators, WorkflowMachine};
use crate::pipeline::workflow_state::{JobOptions, WorkflowState};
use crate::storage::job_namespace;

#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub struct JobOrchestrator {
    machine: WorkflowMachine,
    config: PipelineConfig,
}

impl JobOrchestrator {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            machine: WorkflowMachine::new(collaborators, config.clone()),
            config,
        }
    }

    /// Validates the request, builds the initial state and runs it to a terminal stage.
    ///
    /// Job-level failures are reported in the returned state, not as `Err`.
    pub async fn run(
        &self,
        request: &str,
        options: JobOptions,
    ) -> Result<WorkflowState, JobError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(JobError::InvalidRequest("request cannot be empty".to_string()));
        }

        let prefix = options
            .output_namespace
            .as_deref()
            .or(self.config.default_namespace.as_deref());
        let namespace = job_namespace(prefix, Utc::now());

        let state = WorkflowState::new(request.to_string(), options, namespace);
        info!(
            job_id = %state.job_id,
            namespace = %state.namespace,
            content_only = state.options.content_only,
            "Job started"
        );

        let state = self.machine.run(state).await;
        info!(
            job_id = %state.job_id,
            stage = ?state.stage,
            images = state.images.len(),
            errors = state.errors.len(),
            "Job finished"
        );
        Ok(state)
    }

    /// Resumes a state produced earlier. Terminal states come back unchanged.
    pub async fn resume(&self, state: WorkflowState) -> WorkflowState {
        self.machine.run(state).await
    }
}
