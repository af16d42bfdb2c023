//! Text embedding models.
//!
//! [`HashingEmbedder`] is a deterministic local model: word unigrams and character
//! trigrams are hashed into signed buckets and the result is L2-normalised. It needs
//! no network and keeps retrieval available when no embedding service is configured.
//! [`HttpEmbedder`] talks to any OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use rayon::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding model returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding client misconfigured: {0}")]
    Config(String),

    #[error("Embedding worker failed: {0}")]
    Worker(String),
}

/// Maps texts to fixed-dimension vectors. One instance must embed documents and
/// queries alike so their vectors are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Largest number of texts sent in one `embed_batch` call.
    fn batch_size(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Local hashing model
// ────────────────────────────────────────────────────────────────────────────

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.accumulate(&mut vector, word.as_bytes(), 1.0);

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut vector, trigram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimension as u64) as usize;
        // High bit picks the sign so colliding features tend to cancel.
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn batch_size(&self) -> usize {
        256
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts
                .par_iter()
                .map(|text| embedder.embed(text))
                .collect()
        })
        .await
        .map_err(|e| EmbedError::Worker(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: Option<usize>,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        if model.trim().is_empty() {
            return Err(EmbedError::Config("missing embedding model name".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimensions,
            batch_size: 64,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        debug!("Embedded batch of {} texts via {}", texts.len(), self.model);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(128);
        let a = embedder.embed("Senior Python developer");
        let b = embedder.embed("senior python DEVELOPER");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_blank_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(32);
        assert!(embedder.embed("  ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_shared_words_are_closer_than_unrelated_words() {
        let embedder = HashingEmbedder::new(512);
        let query = embedder.embed("python data analysis");
        let related = embedder.embed("python sql data analysis dashboards");
        let unrelated = embedder.embed("forklift warehouse logistics safety");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed("alpha"));
        assert_eq!(vectors[1], embedder.embed("beta"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_embed_batch_leaves_runtime_responsive() {
        let embedder = HashingEmbedder::new(384);
        let texts: Vec<String> = (0..512)
            .map(|i| format!("senior rust engineer with {i} years of async tokio experience"))
            .collect();

        let ticker = tokio::spawn(async {
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            true
        });
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert!(ticker.await.unwrap());
        assert_eq!(vectors.len(), texts.len());
        assert_eq!(vectors[511], embedder.embed(&texts[511]));
    }

    #[test]
    fn test_http_embedder_requires_model() {
        let err = HttpEmbedder::new("http://localhost:1", None, " ".into(), None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, EmbedError::Config(_)));
    }

    #[test]
    fn test_http_embedder_endpoint_trims_trailing_slash() {
        let embedder = HttpEmbedder::new(
            "http://localhost:8000/v1/",
            None,
            "mini".into(),
            Some(384),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:8000/v1/embeddings");
    }
}
