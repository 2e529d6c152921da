use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::screening::service::{process_screen, ScreenRequest, ScreenResponse};
use crate::screening::session::{SessionKey, SessionSnapshot};
use crate::state::AppState;

/// POST /api/v1/screens/run
pub async fn handle_run_screen(
    State(state): State<AppState>,
    Json(request): Json<ScreenRequest>,
) -> Result<Json<ScreenResponse>, AppError> {
    let response = process_screen(
        &state.db,
        Arc::clone(&state.capabilities),
        Arc::clone(&state.sessions),
        state.config.min_citations,
        request,
    )
    .await?;
    Ok(Json(response))
}

/// GET /api/v1/screens/:screen_id/candidates/:candidate_id/session
/// Diagnostic view of a candidate's pipeline progress snapshot.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path((screen_id, candidate_id)): Path<(String, String)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let key = SessionKey::new(&screen_id, &candidate_id);
    let snapshot = state.sessions.get(&key).await.map_err(AppError::Internal)?;
    snapshot.map(Json).ok_or_else(|| {
        AppError::NotFound(format!(
            "No session for screen {screen_id}, candidate {candidate_id}"
        ))
    })
}
