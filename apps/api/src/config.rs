use anyhow::{Context, Result};

/// Default minimum distinct-URL citations required by the research quality gate.
pub const DEFAULT_MIN_CITATIONS: usize = 3;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Quality gate threshold: distinct cited URLs required before a research
    /// result is considered sufficient without supplemental search.
    pub min_citations: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            min_citations: std::env::var("MIN_CITATIONS")
                .unwrap_or_else(|_| DEFAULT_MIN_CITATIONS.to_string())
                .parse::<usize>()
                .context("MIN_CITATIONS must be a non-negative integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
