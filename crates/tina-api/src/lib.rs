//! Tina API: HTTP front for the insurance interview
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tina_core::{InMemorySessionStore, InterviewError, InterviewService, TurnEngine};
use tina_gemini::{GeminiClient, GeminiConfig};

pub use config::ServerConfig;
pub use metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InterviewService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(service: InterviewService) -> Result<Self, InterviewError> {
        let metrics = Metrics::new()
            .map_err(|e| InterviewError::Misconfiguration(format!("metrics registry: {}", e)))?;
        Ok(Self {
            service: Arc::new(service),
            metrics: Arc::new(metrics),
        })
    }

    /// Wire catalog, Gemini client, engine and in-memory store from config
    pub fn from_config(config: &ServerConfig) -> Result<Self, InterviewError> {
        let catalog = tina_stages::load_catalog(config.prompts_path.as_deref())?;
        let generator = GeminiClient::new(
            GeminiConfig::new(config.google_api_key.clone())
                .with_model(config.gemini_model.clone())
                .with_base_url(config.gemini_base_url.clone()),
        );
        let engine = TurnEngine::new(Arc::new(catalog), Arc::new(generator))
            .with_timeout(config.generation_timeout);

        Self::new(InterviewService::new(
            engine,
            Arc::new(InMemorySessionStore::new()),
        ))
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/sessions/:id", get(handlers::get_session))
        .route("/api/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    tracing::info!(
        addr = %config.addr,
        model = %config.gemini_model,
        "Tina API listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
