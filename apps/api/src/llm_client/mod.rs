//! LLM Client: the single point of entry for all generative backend calls.
//!
//! No other module may call the Gemini API directly. The grounding orchestrator
//! talks to a `GenerativeBackend`; this module provides the production impl.
//!
//! The client makes exactly one HTTP call per `generate`. Retrying belongs to the
//! orchestrator, so failures are classified here and nothing sleeps.
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const QUOTA_EXCEEDED: &str = "Quota exceeded";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Wait the backend asked for, parsed from its error text.
        suggested_wait: Option<Duration>,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl BackendError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::RateLimited { .. })
    }

    /// Classifies a failed call. A 429 status or a quota message counts as rate
    /// limiting whatever the status code says.
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 429 || message.contains(QUOTA_EXCEEDED) {
            let suggested_wait = parse_suggested_wait(&message);
            BackendError::RateLimited {
                message,
                suggested_wait,
            }
        } else {
            BackendError::Api { status, message }
        }
    }
}

/// Extracts the `retry in <seconds>s` hint from backend error text.
pub fn parse_suggested_wait(message: &str) -> Option<Duration> {
    static RETRY_IN: OnceLock<Regex> = OnceLock::new();
    let re = RETRY_IN.get_or_init(|| {
        Regex::new(r"retry in ([0-9.]+)s").expect("retry hint pattern is valid")
    });
    let seconds: f64 = re.captures(message)?.get(1)?.as_str().parse().ok()?;
    // Hints too large for a Duration are ignored and the default backoff applies.
    Duration::try_from_secs_f64(seconds).ok()
}

/// A text-in, text-out generative model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Model name, for logging.
    fn name(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini generateContent wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini REST client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl GenerativeBackend for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let err = BackendError::from_status(status.as_u16(), message);
            warn!("Gemini call failed: {err}");
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text = parsed.text().ok_or(BackendError::EmptyContent)?;
        debug!("Gemini call succeeded: {} chars generated", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
