mod config;
mod db;
mod errors;
mod llm_client;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screening::agents::{
    LlmAssessmentCapability, LlmIncrementalSearchCapability, LlmParserCapability,
    LlmResearchCapability,
};
use crate::screening::capabilities::CapabilitySet;
use crate::screening::session::{PgSessionStore, SessionStateStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screening API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Wire the LLM-backed capability set
    let capabilities = Arc::new(CapabilitySet {
        research: Arc::new(LlmResearchCapability::new(llm.clone())),
        parser: Arc::new(LlmParserCapability::new(llm.clone())),
        incremental: Arc::new(LlmIncrementalSearchCapability::new(llm.clone())),
        assessment: Arc::new(LlmAssessmentCapability::new(llm)),
    });

    // Session snapshots persist to Postgres, one row per (screen, candidate)
    let sessions: Arc<dyn SessionStateStore> = Arc::new(PgSessionStore::new(db.clone()));

    info!(
        "Quality gate threshold: {} distinct citations",
        config.min_citations
    );

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        capabilities,
        sessions,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
