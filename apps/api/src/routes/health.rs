use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a status object with service version and the configured backends.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "carousel",
        "storage": format!("{:?}", state.config.storage_backend).to_lowercase(),
        "raster": format!("{:?}", state.config.raster_backend).to_lowercase(),
        "notifications": state.config.smtp.is_some(),
    }))
}
