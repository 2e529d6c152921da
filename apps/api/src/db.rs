use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the tables the screening service writes to, if they don't exist.
/// Snapshots are one row per (screen_id, candidate_id); assessments are append-only.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS screen_sessions (
            screen_id    TEXT        NOT NULL,
            candidate_id TEXT        NOT NULL,
            snapshot     JSONB       NOT NULL,
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (screen_id, candidate_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id                 UUID        PRIMARY KEY,
            screen_id          TEXT        NOT NULL,
            candidate_id       TEXT        NOT NULL,
            candidate_name     TEXT        NOT NULL,
            overall_score      DOUBLE PRECISION,
            overall_confidence TEXT        NOT NULL,
            assessment         JSONB       NOT NULL,
            research           JSONB       NOT NULL,
            inline_markdown    TEXT        NOT NULL,
            report_markdown    TEXT        NOT NULL,
            created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema verified");
    Ok(())
}
