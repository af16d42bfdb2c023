// Chunking & retrieval engine.
// Candidate pages are split into overlapping word windows, embedded in batches and
// held in a flat L2 index that is rebuilt wholesale for each screening.

pub mod chunker;
pub mod embedder;
pub mod index;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::documents::CandidateProfile;

pub use chunker::{ChunkError, Chunker};
pub use embedder::{EmbedError, Embedder, HashingEmbedder, HttpEmbedder};
pub use index::{RetrievalResult, VectorIndex};

/// A window of one candidate page. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub candidate_id: String,
    pub page: u32,
    /// Position of the window within its page.
    pub sequence: usize,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

/// Builds indexes and answers nearest-neighbour queries with one embedding model.
#[derive(Clone)]
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self { embedder, chunker }
    }

    /// Chunks every non-blank page, embeds the chunks in batches and returns the
    /// index together with the number of chunks indexed.
    pub async fn build_index(
        &self,
        candidates: &[CandidateProfile],
    ) -> Result<(VectorIndex, usize), EmbedError> {
        let chunks: Vec<Chunk> = candidates
            .iter()
            .flat_map(|candidate| {
                candidate
                    .page_texts
                    .iter()
                    .filter(|(_, text)| !text.trim().is_empty())
                    .flat_map(move |(&page, text)| {
                        self.chunker
                            .chunk(text)
                            .enumerate()
                            .map(move |(sequence, text)| Chunk {
                                candidate_id: candidate.candidate_id.clone(),
                                page,
                                sequence,
                                text,
                            })
                    })
            })
            .collect();

        let mut index = VectorIndex::new();
        let batch_size = self.embedder.batch_size().max(1);
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }
            for (chunk, embedding) in batch.iter().cloned().zip(embeddings) {
                index.add(chunk, embedding)?;
            }
        }

        let count = index.len();
        info!(
            "Vector index built: {count} chunks from {} candidates",
            candidates.len()
        );
        Ok((index, count))
    }

    /// Up to `k` chunks nearest to `query`, closest first. An empty index returns
    /// nothing without calling the embedding model.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let mut embeddings = self.embedder.embed_batch(&[query.to_string()]).await?;
        let query_embedding = embeddings.pop().ok_or(EmbedError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
        Ok(index.search(&query_embedding, k)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::ranker::tests::candidate;
    use std::collections::BTreeMap;

    fn engine() -> RetrievalEngine {
        RetrievalEngine::new(
            Arc::new(HashingEmbedder::new(256)),
            Chunker::new(5, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_candidate_set_builds_empty_index() {
        let (index, count) = engine().build_index(&[]).await.unwrap();
        assert_eq!(count, 0);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_blank_pages_are_skipped() {
        let mut profile = candidate("CV_01", "python sql");
        profile.page_texts = BTreeMap::from([(1, "   ".to_string()), (2, "python sql".to_string())]);
        let (index, count) = engine().build_index(&[profile]).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.chunks().next().unwrap().page, 2);
    }

    #[tokio::test]
    async fn test_retrieve_bounded_by_k_and_members_of_index() {
        let candidates = vec![
            candidate("CV_01", "python sql data analysis dashboards reporting etl pipelines"),
            candidate("CV_02", "forklift operation warehouse logistics safety"),
            candidate("CV_03", "kubernetes docker cloud infrastructure terraform"),
        ];
        let engine = engine();
        let (index, count) = engine.build_index(&candidates).await.unwrap();
        assert!(count >= 3);

        let results = engine.retrieve(&index, "python data analysis", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.candidate_id, "CV_01");
        assert!(results[0].distance <= results[1].distance);
        for result in &results {
            assert!(index.chunks().any(|c| c == &result.chunk));
        }

        let all = engine.retrieve(&index, "python", 100).await.unwrap();
        assert_eq!(all.len(), count);
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_index_is_empty() {
        let results = engine()
            .retrieve(&VectorIndex::new(), "anything", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let err = engine().retrieve(&VectorIndex::new(), "  ", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyQuery));
    }
}
