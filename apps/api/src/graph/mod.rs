// Graph analytics engine.
// Builds the candidate similarity graph (arena of nodes + adjacency lists) and derives
// centrality, duplicate and outlier signals. All computation is CPU-bound; callers in
// async context run `analyze_candidates` inside tokio::task::spawn_blocking.

pub mod analysis;
pub mod centrality;
pub mod similarity_graph;

pub use analysis::{analyze_candidates, find_duplicates, find_outliers, DuplicatePair, GraphReport, Outlier};
pub use centrality::{centrality, CentralityMetrics, NodeCentrality};
pub use similarity_graph::{build_graph, Edge, SimilarityGraph};
