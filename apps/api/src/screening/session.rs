//! Session state persistence — one JSON-safe progress snapshot per
//! (screen, candidate), written after every pipeline stage transition.
//!
//! Snapshots must survive a process crash mid-screen, so each write is a
//! single atomic upsert and the payload is plain JSON: research and
//! assessment are stored as already-serialized values, and every timestamp
//! inside them is an ISO-8601 string by the time it reaches this layer.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::screening::models::CandidateContext;
use crate::screening::pipeline::PipelineStep;

/// Composite key identifying one candidate's run within one screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub screen_id: String,
    pub candidate_id: String,
}

impl SessionKey {
    pub fn new(screen_id: &str, candidate_id: &str) -> Self {
        Self {
            screen_id: screen_id.to_string(),
            candidate_id: candidate_id.to_string(),
        }
    }
}

/// Progress record for one candidate's pipeline run.
/// `last_step` always names the last *completed* step, so a crashed or failed
/// run shows exactly how far it got.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub screen_id: String,
    pub candidate_id: String,
    pub candidate_name: String,
    pub last_step: PipelineStep,
    pub quality_gate_triggered: bool,
    pub research: Option<Value>,
    pub assessment: Option<Value>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn new(screen_id: &str, candidate: &CandidateContext) -> Self {
        Self {
            screen_id: screen_id.to_string(),
            candidate_id: candidate.candidate_id.clone(),
            candidate_name: candidate.candidate_name.clone(),
            last_step: PipelineStep::Start,
            quality_gate_triggered: false,
            research: None,
            assessment: None,
            last_error: None,
        }
    }
}

/// Persistence contract for session snapshots. One row per key; `put`
/// replaces the previous snapshot atomically.
#[async_trait]
pub trait SessionStateStore: Send + Sync {
    async fn put(&self, key: &SessionKey, snapshot: &SessionSnapshot) -> Result<()>;
    async fn get(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>>;
}

/// Postgres-backed store: one upsert per stage transition.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStateStore for PgSessionStore {
    async fn put(&self, key: &SessionKey, snapshot: &SessionSnapshot) -> Result<()> {
        let payload = serde_json::to_value(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO screen_sessions (screen_id, candidate_id, snapshot, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (screen_id, candidate_id)
            DO UPDATE SET snapshot = EXCLUDED.snapshot, updated_at = NOW()
            "#,
        )
        .bind(&key.screen_id)
        .bind(&key.candidate_id)
        .bind(&payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>> {
        let row: Option<(Value,)> = sqlx::query_as(
            "SELECT snapshot FROM screen_sessions WHERE screen_id = $1 AND candidate_id = $2",
        )
        .bind(&key.screen_id)
        .bind(&key.candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

/// In-memory store for tests and database-less local runs.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStateStore for InMemorySessionStore {
    async fn put(&self, key: &SessionKey, snapshot: &SessionSnapshot) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(key.clone(), snapshot.clone());
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>> {
        Ok(self.sessions.lock().await.get(key).cloned())
    }
}
