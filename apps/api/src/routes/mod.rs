pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening API
        .route("/api/v1/screens/run", post(handlers::handle_run_screen))
        .route(
            "/api/v1/screens/:screen_id/candidates/:candidate_id/session",
            get(handlers::handle_get_session),
        )
        .with_state(state)
}
