//! Duplicate and outlier detection, plus the combined graph report.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineSettings;
use crate::documents::CandidateProfile;
use crate::graph::centrality::{centrality, CentralityMetrics};
use crate::graph::similarity_graph::{build_graph, Edge, SimilarityGraph};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub candidate_1: String,
    pub candidate_2: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub candidate_id: String,
    pub degree: usize,
}

/// Node/edge/metric tables handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphReport {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub metrics: CentralityMetrics,
    pub duplicates: Vec<DuplicatePair>,
    pub outliers: Vec<Outlier>,
}

/// Every edge with weight ≥ `threshold`, strongest first.
pub fn find_duplicates(graph: &SimilarityGraph, threshold: f64) -> Vec<DuplicatePair> {
    let mut duplicates: Vec<DuplicatePair> = graph
        .edges()
        .into_iter()
        .filter(|edge| edge.weight >= threshold)
        .map(|edge| DuplicatePair {
            candidate_1: edge.source,
            candidate_2: edge.target,
            similarity: edge.weight,
        })
        .collect();
    duplicates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    duplicates
}

/// Nodes that are isolated or hang off a single edge.
pub fn find_outliers(graph: &SimilarityGraph) -> Vec<Outlier> {
    graph
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let degree = graph.degree(i);
            (degree <= 1).then(|| Outlier {
                candidate_id: id.clone(),
                degree,
            })
        })
        .collect()
}

/// Builds the graph and every derived signal for one screening.
pub fn analyze_candidates(candidates: &[CandidateProfile], settings: &EngineSettings) -> GraphReport {
    let documents: Vec<(&str, &str)> = candidates
        .iter()
        .map(|c| (c.candidate_id.as_str(), c.cleaned_text.as_str()))
        .collect();
    let graph = build_graph(&documents, settings.graph_threshold);
    let metrics = centrality(&graph, settings.pagerank_damping);
    let duplicates = find_duplicates(&graph, settings.duplicate_threshold);
    let outliers = find_outliers(&graph);

    info!(
        "Graph analysis: {} nodes, {} edges, {} duplicate pairs, {} outliers",
        graph.node_count(),
        graph.edge_count(),
        duplicates.len(),
        outliers.len()
    );

    GraphReport {
        nodes: graph.nodes().to_vec(),
        edges: graph.edges(),
        metrics,
        duplicates,
        outliers,
    }
}
