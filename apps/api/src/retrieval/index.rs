//! Exact nearest-neighbour index over chunk embeddings.

use rayon::prelude::*;
use serde::Serialize;

use super::embedder::EmbedError;
use super::Chunk;

/// A chunk returned by a search together with its Euclidean distance to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Insertion position of the chunk in the index.
    pub position: usize,
    pub distance: f32,
}

/// Flat L2 index. Every stored vector has the dimension of the first one added.
#[derive(Debug, Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<(), EmbedError> {
        self.check_dimension(embedding.len())?;
        self.dimension.get_or_insert(embedding.len());
        self.entries.push((chunk, embedding));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }

    /// The `min(k, len)` nearest chunks. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>, EmbedError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .par_iter()
            .enumerate()
            .map(|(position, (_, vector))| (position, euclidean(query, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| RetrievalResult {
                chunk: self.entries[position].0.clone(),
                position,
                distance,
            })
            .collect())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), EmbedError> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(EmbedError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
