use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::orchestrator::JobOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<JobOrchestrator>,
    pub config: Arc<Config>,
}
