//! Axum route handlers for the Jobs API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::pipeline::workflow_state::{JobOptions, WorkflowState};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub request: String,
    #[serde(flatten)]
    pub options: JobOptions,
}

/// POST /api/v1/jobs
///
/// Runs one carousel job to completion and returns its terminal state.
/// A job that fails in a stage is still a 200: inspect `stage` and `errors`.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    if body.request.trim().is_empty() {
        return Err(AppError::Validation("request cannot be empty".to_string()));
    }

    let job = state.orchestrator.run(&body.request, body.options).await?;
    Ok(Json(job))
}
