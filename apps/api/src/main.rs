mod config;
mod content;
mod errors;
mod layout;
mod llm_client;
mod notify;
mod pipeline;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::content::history::{ContentHistory, DEFAULT_HISTORY_CAPACITY, HISTORY_KEY};
use crate::content::service::LlmContentService;
use crate::layout::raster::build_rasterizer;
use crate::llm_client::LlmClient;
use crate::notify::{Notifier, SmtpNotifier};
use crate::pipeline::machine::Collaborators;
use crate::pipeline::orchestrator::JobOrchestrator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore, StoreBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting carousel API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.xai_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize blob store
    let store: Arc<dyn BlobStore> = match (&config.storage_backend, &config.s3) {
        (StoreBackend::S3, Some(settings)) => Arc::new(S3BlobStore::connect(settings).await),
        (StoreBackend::S3, None) => anyhow::bail!("S3 storage selected without S3 settings"),
        (StoreBackend::Local, _) => Arc::new(LocalBlobStore::new(&config.output_dir)),
    };
    info!("Blob store initialized ({})", store.backend());

    let rasterizer = build_rasterizer(config.raster_backend);
    info!("Rasterizer initialized ({})", rasterizer.name());

    // Notifications are optional; a broken SMTP config disables them rather than startup.
    let notifier: Option<Arc<dyn Notifier>> = match &config.smtp {
        Some(settings) => match SmtpNotifier::new(settings) {
            Ok(notifier) => Some(Arc::new(notifier)),
            Err(e) => {
                warn!("Email notifications disabled: {e}");
                None
            }
        },
        None => {
            info!("EMAIL_USER / EMAIL_PASSWORD not set, email notifications disabled");
            None
        }
    };

    let history =
        ContentHistory::open(Arc::clone(&store), HISTORY_KEY, DEFAULT_HISTORY_CAPACITY).await;

    let collaborators = Collaborators {
        content: Arc::new(LlmContentService::new(llm, config.pipeline.max_content_pages)),
        store,
        rasterizer,
        notifier,
        history: Arc::new(history),
    };
    let orchestrator = JobOrchestrator::new(collaborators, config.pipeline.clone());

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
