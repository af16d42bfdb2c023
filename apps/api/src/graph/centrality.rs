//! Weighted centrality metrics over the similarity graph.
//!
//! - PageRank: edge weight is the transition weight; dangling mass is spread uniformly.
//! - Degree: degree / (n - 1).
//! - Betweenness / closeness: shortest paths over distance = 1 / similarity, so the
//!   strongest similarities are the shortest hops and every hop costs at least 1.
//!
//! Per-source shortest-path passes run in parallel; partial results are combined in
//! source order so parallel and sequential runs produce identical sums.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::similarity_graph::SimilarityGraph;

const PAGERANK_MAX_ITER: usize = 100;
const PAGERANK_TOLERANCE: f64 = 1.0e-6;
/// Floor applied before inverting a similarity into a distance.
const MIN_SIMILARITY: f64 = 1.0e-6;
const PATH_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCentrality {
    pub candidate_id: String,
    pub pagerank: f64,
    pub degree_centrality: f64,
    pub betweenness: f64,
    pub closeness: f64,
}

/// Metrics for every node, ordered by descending PageRank (ties keep node order).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralityMetrics {
    pub nodes: Vec<NodeCentrality>,
}

impl CentralityMetrics {
    pub fn get(&self, candidate_id: &str) -> Option<&NodeCentrality> {
        self.nodes.iter().find(|n| n.candidate_id == candidate_id)
    }

    pub fn pagerank_sum(&self) -> f64 {
        self.nodes.iter().map(|n| n.pagerank).sum()
    }
}

pub fn centrality(graph: &SimilarityGraph, damping: f64) -> CentralityMetrics {
    let n = graph.node_count();
    if n == 0 {
        return CentralityMetrics::default();
    }
    if n == 1 {
        return CentralityMetrics {
            nodes: vec![NodeCentrality {
                candidate_id: graph.nodes()[0].clone(),
                pagerank: 1.0,
                degree_centrality: 0.0,
                betweenness: 0.0,
                closeness: 0.0,
            }],
        };
    }

    let pagerank = pagerank(graph, damping);
    let degree = degree_centrality(graph);
    let betweenness = betweenness_centrality(graph);
    let closeness = closeness_centrality(graph);

    let mut nodes: Vec<NodeCentrality> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, id)| NodeCentrality {
            candidate_id: id.clone(),
            pagerank: pagerank[i],
            degree_centrality: degree[i],
            betweenness: betweenness[i],
            closeness: closeness[i],
        })
        .collect();
    nodes.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));
    CentralityMetrics { nodes }
}

/// Power iteration. Sums to 1 over the graph.
pub fn pagerank(graph: &SimilarityGraph, damping: f64) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = (0..n)
        .map(|i| graph.neighbors(i).iter().map(|&(_, w)| w).sum())
        .collect();

    let mut rank = vec![uniform; n];
    for _ in 0..PAGERANK_MAX_ITER {
        let dangling: f64 = (0..n)
            .filter(|&i| out_weight[i] <= 0.0)
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;

        let mut next = vec![base; n];
        for (u, &r) in rank.iter().enumerate() {
            if out_weight[u] <= 0.0 {
                continue;
            }
            for &(v, w) in graph.neighbors(u) {
                next[v] += damping * r * w / out_weight[u];
            }
        }

        let err: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if err < n as f64 * PAGERANK_TOLERANCE {
            return rank;
        }
    }
    warn!("PageRank did not converge in {PAGERANK_MAX_ITER} iterations");
    rank
}

pub fn degree_centrality(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    (0..n).map(|i| graph.degree(i) as f64 * scale).collect()
}

fn distance(similarity: f64) -> f64 {
    1.0 / similarity.max(MIN_SIMILARITY)
}

#[derive(PartialEq)]
struct QueueEntry {
    dist: f64,
    node: usize,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on distance, then node index for determinism.
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest paths: settle order, path counts, predecessors, distances.
struct ShortestPaths {
    order: Vec<usize>,
    sigma: Vec<f64>,
    predecessors: Vec<Vec<usize>>,
    dist: Vec<f64>,
}

fn dijkstra(graph: &SimilarityGraph, source: usize) -> ShortestPaths {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0; n];
    let mut predecessors = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    sigma[source] = 1.0;
    heap.push(QueueEntry {
        dist: 0.0,
        node: source,
    });

    while let Some(QueueEntry { dist: d, node: u }) = heap.pop() {
        if settled[u] {
            continue;
        }
        settled[u] = true;
        order.push(u);
        for &(v, w) in graph.neighbors(u) {
            let candidate = d + distance(w);
            if candidate + PATH_EPSILON < dist[v] {
                dist[v] = candidate;
                sigma[v] = sigma[u];
                predecessors[v] = vec![u];
                heap.push(QueueEntry {
                    dist: candidate,
                    node: v,
                });
            } else if (candidate - dist[v]).abs() <= PATH_EPSILON && !settled[v] {
                sigma[v] += sigma[u];
                predecessors[v].push(u);
            }
        }
    }

    ShortestPaths {
        order,
        sigma,
        predecessors,
        dist,
    }
}

/// Brandes' algorithm, normalised to [0, 1] by 1 / ((n - 1)(n - 2)).
pub fn betweenness_centrality(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 2 {
        return vec![0.0; n];
    }

    let contributions: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|source| {
            let paths = dijkstra(graph, source);
            let mut delta = vec![0.0; n];
            for &w in paths.order.iter().rev() {
                for &v in &paths.predecessors[w] {
                    delta[v] += paths.sigma[v] / paths.sigma[w] * (1.0 + delta[w]);
                }
            }
            delta[source] = 0.0;
            delta
        })
        .collect();

    let mut betweenness = vec![0.0; n];
    for delta in &contributions {
        for (total, d) in betweenness.iter_mut().zip(delta) {
            *total += d;
        }
    }
    // Each unordered pair was counted from both endpoints.
    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    betweenness.iter().map(|b| (b * scale).clamp(0.0, 1.0)).collect()
}

/// Inverse of the summed shortest-path distance to reachable nodes, scaled by the
/// reachable fraction of the graph. Isolated nodes score 0.
pub fn closeness_centrality(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![0.0; n];
    }
    (0..n)
        .into_par_iter()
        .map(|source| {
            let paths = dijkstra(graph, source);
            let reachable: Vec<f64> = paths.dist.iter().copied().filter(|d| d.is_finite()).collect();
            let total: f64 = reachable.iter().sum();
            let others = (reachable.len() - 1) as f64;
            if total <= 0.0 || others == 0.0 {
                return 0.0;
            }
            let closeness = others / total * (others / (n - 1) as f64);
            closeness.clamp(0.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::similarity_graph::build_graph;

    fn graph(nodes: &[&str], edges: &[(usize, usize, f64)]) -> SimilarityGraph {
        let mut g = SimilarityGraph::with_nodes(nodes.iter().copied());
        for &(a, b, w) in edges {
            g.add_edge(a, b, w);
        }
        g
    }

    #[test]
    fn test_empty_graph_has_no_metrics() {
        assert!(centrality(&SimilarityGraph::default(), 0.85).nodes.is_empty());
    }

    #[test]
    fn test_single_node_baseline() {
        let metrics = centrality(&graph(&["A"], &[]), 0.85);
        let a = metrics.get("A").unwrap();
        assert_eq!(a.pagerank, 1.0);
        assert_eq!(a.degree_centrality, 0.0);
        assert_eq!(a.betweenness, 0.0);
        assert_eq!(a.closeness, 0.0);
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[(0, 1, 0.9), (1, 2, 0.3), (2, 0, 0.5)],
        );
        let metrics = centrality(&g, 0.85);
        assert!((metrics.pagerank_sum() - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_pagerank_sums_to_one_without_edges() {
        let g = graph(&["A", "B", "C"], &[]);
        let ranks = pagerank(&g, 0.85);
        assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(ranks.iter().all(|r| (r - 1.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_star_centre_has_highest_metrics() {
        let g = graph(
            &["hub", "a", "b", "c"],
            &[(0, 1, 0.5), (0, 2, 0.5), (0, 3, 0.5)],
        );
        let metrics = centrality(&g, 0.85);
        assert_eq!(metrics.nodes[0].candidate_id, "hub");
        let hub = metrics.get("hub").unwrap();
        assert_eq!(hub.degree_centrality, 1.0);
        assert!((hub.betweenness - 1.0).abs() < 1e-9, "{}", hub.betweenness);
        assert_eq!(metrics.get("a").unwrap().betweenness, 0.0);
        assert!(hub.closeness > metrics.get("a").unwrap().closeness);
    }

    #[test]
    fn test_betweenness_prefers_strong_similarity_path() {
        // A-B-C via strong edges beats the weak direct A-C edge.
        let g = graph(&["A", "B", "C"], &[(0, 1, 0.9), (1, 2, 0.9), (0, 2, 0.2)]);
        let b = betweenness_centrality(&g);
        assert!(b[1] > 0.0);
        assert_eq!(b[0], 0.0);
    }

    #[test]
    fn test_metrics_are_bounded() {
        let docs = [
            ("A", "python sql data analysis"),
            ("B", "python sql data"),
            ("C", "python cloud"),
            ("D", "forklift warehouse"),
            ("E", "cloud aws azure"),
        ];
        let metrics = centrality(&build_graph(&docs, 0.05), 0.85);
        for node in &metrics.nodes {
            for value in [node.degree_centrality, node.betweenness, node.closeness] {
                assert!((0.0..=1.0).contains(&value), "{node:?}");
            }
        }
        assert!((metrics.pagerank_sum() - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_isolated_node_has_zero_closeness() {
        let g = graph(&["A", "B", "C"], &[(0, 1, 1.0)]);
        let closeness = closeness_centrality(&g);
        assert_eq!(closeness[2], 0.0);
        // distance 1 to one of two other nodes: 1/1 * 1/2
        assert!((closeness[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_centrality_is_deterministic() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[(0, 1, 0.4), (1, 2, 0.6), (2, 3, 0.2), (0, 3, 0.8)],
        );
        let first = centrality(&g, 0.85);
        let second = centrality(&g, 0.85);
        assert_eq!(first.nodes, second.nodes);
    }
}
