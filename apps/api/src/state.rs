use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::screening::capabilities::CapabilitySet;
use crate::screening::session::SessionStateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// The four pluggable screening capabilities, LLM-backed at startup.
    pub capabilities: Arc<CapabilitySet>,
    /// Session snapshot store, Postgres-backed at startup.
    pub sessions: Arc<dyn SessionStateStore>,
}
