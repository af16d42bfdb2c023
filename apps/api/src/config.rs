use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration loaded from environment variables.
/// Only `PORT` parsing can fail; every external credential is optional and its
/// absence disables the feature that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub model_dir: PathBuf,
    pub embedding_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub request_timeout: Duration,
    pub engine: EngineSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            model_dir: std::env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
            embedding_url: optional_env("EMBEDDING_URL"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
            embedding_dimensions: parse_env("EMBEDDING_DIMENSIONS", 384)?,
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 3600)?),
            max_sessions: parse_env("MAX_SESSIONS", 64)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120)?),
            engine: EngineSettings::default(),
        })
    }
}

/// Tunables shared by the ranking, graph, retrieval and generation engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Minimum cosine similarity for an edge in the candidate graph.
    pub graph_threshold: f64,
    pub duplicate_threshold: f64,
    pub shortlist_size: usize,
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks.
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
    pub max_candidates: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub suggested_wait_buffer: Duration,
    pub question_count: usize,
    pub pagerank_damping: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            graph_threshold: 0.1,
            duplicate_threshold: 0.8,
            shortlist_size: 5,
            chunk_size: 400,
            chunk_overlap: 50,
            retrieval_k: 10,
            max_candidates: 10,
            max_attempts: 5,
            initial_backoff: Duration::from_secs(10),
            suggested_wait_buffer: Duration::from_secs(2),
            question_count: 5,
            pagerank_damping: 0.85,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk overlap ({}) must be smaller than chunk size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        for (name, value) in [
            ("graph_threshold", self.graph_threshold),
            ("duplicate_threshold", self.duplicate_threshold),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be within [0, 1], got {value}"
            );
        }
        anyhow::ensure!(
            (0.0..1.0).contains(&self.pagerank_damping),
            "pagerank_damping must be within [0, 1)"
        );
        anyhow::ensure!(self.max_attempts > 0, "max_attempts must be at least 1");
        Ok(())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
