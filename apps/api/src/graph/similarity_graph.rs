//! Undirected, weighted candidate similarity graph.
//!
//! Nodes live in an arena (`Vec<String>`) and edges reference them by index.
//! Invariants: no self-loops, at most one edge per unordered pair, every weight is
//! within [0, 1] and at or above the build threshold.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ranking::tfidf::{cosine_similarity, TfidfOptions, TfidfSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    nodes: Vec<String>,
    /// (node a, node b, weight) with a < b.
    edges: Vec<(usize, usize, f64)>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl SimilarityGraph {
    pub fn with_nodes<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for id in ids {
            let id = id.into();
            if seen.insert(id.clone()) {
                nodes.push(id);
            } else {
                warn!("Duplicate graph node '{id}' ignored");
            }
        }
        let adjacency = vec![Vec::new(); nodes.len()];
        Self {
            nodes,
            edges: Vec::new(),
            adjacency,
        }
    }

    /// Adds an undirected edge. Self-loops and repeated pairs are rejected.
    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        if self.adjacency[a].iter().any(|&(n, _)| n == b) {
            return false;
        }
        let weight = weight.clamp(0.0, 1.0);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.edges.push((lo, hi, weight));
        self.adjacency[a].push((b, weight));
        self.adjacency[b].push((a, weight));
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n == id)
    }

    pub fn neighbors(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }

    pub fn degree(&self, index: usize) -> usize {
        self.adjacency[index].len()
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let (a, b) = (self.node_index(a)?, self.node_index(b)?);
        self.adjacency[a]
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, w)| w)
    }

    pub fn raw_edges(&self) -> &[(usize, usize, f64)] {
        &self.edges
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .map(|&(a, b, weight)| Edge {
                source: self.nodes[a].clone(),
                target: self.nodes[b].clone(),
                weight,
            })
            .collect()
    }
}

/// Builds the graph from `(candidate_id, cleaned_text)` pairs using a TF-IDF space
/// fitted over the candidate texts only. An edge is added iff similarity ≥ `threshold`.
pub fn build_graph(documents: &[(&str, &str)], threshold: f64) -> SimilarityGraph {
    let mut graph = SimilarityGraph::with_nodes(documents.iter().map(|(id, _)| *id));
    if graph.node_count() < documents.len() {
        // Duplicate ids were dropped; keep only the first text for each id.
        let kept: Vec<(&str, &str)> = graph
            .nodes()
            .iter()
            .filter_map(|id| documents.iter().find(|(d, _)| d == id).copied())
            .collect();
        return build_graph(&kept, threshold);
    }

    let texts: Vec<&str> = documents.iter().map(|(_, text)| *text).collect();
    let (_, vectors) = TfidfSpace::fit_transform(&texts, TfidfOptions::default());

    let n = vectors.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let weighted: Vec<(usize, usize, f64)> = pairs
        .par_iter()
        .map(|&(i, j)| (i, j, cosine_similarity(&vectors[i], &vectors[j])))
        .filter(|&(_, _, sim)| sim >= threshold)
        .collect();

    for (i, j, sim) in weighted {
        graph.add_edge(i, j, sim);
    }
    debug!(
        "Similarity graph built: {} nodes, {} edges (threshold {threshold})",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}
