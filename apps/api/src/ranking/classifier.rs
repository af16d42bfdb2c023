//! Vacancy classification against the pretrained vocabulary + cluster centroids.
//!
//! Artifacts are loaded once at startup and shared read-only (`Arc`) across sessions.
//! A missing artifact disables classification only: `Classifier::classify` then
//! reports `ModelUnavailable` and the rest of the pipeline carries on.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ranking::tfidf::{SparseVector, TfidfOptions, TfidfSpace};

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";
pub const CLUSTER_MODEL_FILE: &str = "kmeans_model.json";

/// Cluster labels produced by the offline clustering run.
const CLUSTER_LABELS: &[(usize, &str)] = &[
    (0, "Medical & Lab Science"),
    (1, "Project/Product Management"),
    (2, "Data Engineering & Cloud"),
    (3, "Data Science & Analytics"),
    (4, "AI & Machine Learning"),
];

const CLUSTER_KEYWORDS: &[(usize, &[&str])] = &[
    (0, &["laboratory", "medical", "technologist", "mlt", "ascp", "clinical", "testing", "specimens", "chemistry"]),
    (1, &["data", "management", "skills", "database", "communication", "project", "business", "analysis", "team"]),
    (2, &["data", "azure", "aws", "cloud", "engineering", "spark", "etl", "pipeline", "warehouse"]),
    (3, &["data", "analysis", "business", "management", "analytics", "reporting", "sql", "insights"]),
    (4, &["learning", "machine", "data", "ml", "ai", "model", "science", "python", "deep"]),
];

const FALLBACK_LABEL: &str = "General IT";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classification model unavailable")]
    ModelUnavailable,

    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}

/// Persisted form of the fitted global vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_stop_words")]
    pub stop_words: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

fn default_stop_words() -> bool {
    true
}

/// Persisted form of the fitted cluster model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterModelArtifact {
    pub centroids: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    pub cluster_label: String,
    pub cluster_keywords: Vec<String>,
}

/// Global vocabulary plus nearest-centroid cluster model.
#[derive(Debug)]
pub struct PretrainedModel {
    vectorizer: TfidfSpace,
    centroids: Vec<Vec<f64>>,
    centroid_norms_sq: Vec<f64>,
}

impl PretrainedModel {
    pub fn from_artifacts(
        vectorizer: VectorizerArtifact,
        clusters: ClusterModelArtifact,
    ) -> Result<Self, ClassifierError> {
        let dimension = vectorizer.idf.len();
        if clusters.centroids.is_empty() {
            return Err(ClassifierError::Invalid("cluster model has no centroids".to_string()));
        }
        if let Some(bad) = clusters.centroids.iter().position(|c| c.len() != dimension) {
            return Err(ClassifierError::Invalid(format!(
                "centroid {bad} has {} dimensions, vocabulary has {dimension}",
                clusters.centroids[bad].len()
            )));
        }

        let options = TfidfOptions {
            max_features: dimension,
            ngram_range: vectorizer.ngram_range,
            stop_words: vectorizer.stop_words,
        };
        let space = TfidfSpace::from_parts(vectorizer.vocabulary, vectorizer.idf, options)
            .map_err(ClassifierError::Invalid)?;

        let centroid_norms_sq = clusters
            .centroids
            .iter()
            .map(|c| c.iter().map(|v| v * v).sum())
            .collect();

        Ok(Self {
            vectorizer: space,
            centroids: clusters.centroids,
            centroid_norms_sq,
        })
    }

    /// Loads `tfidf_vectorizer.json` and `kmeans_model.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ClassifierError> {
        let vectorizer: VectorizerArtifact = read_artifact(&dir.join(VECTORIZER_FILE))?;
        let clusters: ClusterModelArtifact = read_artifact(&dir.join(CLUSTER_MODEL_FILE))?;
        let model = Self::from_artifacts(vectorizer, clusters)?;
        info!(
            "Pretrained model loaded: {} terms, {} clusters",
            model.vectorizer.len(),
            model.centroids.len()
        );
        Ok(model)
    }

    pub fn vectorizer(&self) -> &TfidfSpace {
        &self.vectorizer
    }

    /// Nearest centroid by squared Euclidean distance; ties go to the lowest id.
    pub fn predict(&self, vector: &SparseVector) -> usize {
        let x_norm_sq: f64 = vector.entries().iter().map(|(_, v)| v * v).sum();
        let mut best = (0, f64::INFINITY);
        for (id, centroid) in self.centroids.iter().enumerate() {
            let dot: f64 = vector
                .entries()
                .iter()
                .map(|&(index, v)| v * centroid[index])
                .sum();
            let distance = x_norm_sq - 2.0 * dot + self.centroid_norms_sq[id];
            if distance < best.1 {
                best = (id, distance);
            }
        }
        best.0
    }
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ClassifierError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ClassifierError::Parse {
        path: display,
        source,
    })
}

/// Assigns vacancies to pretrained clusters. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    model: Option<Arc<PretrainedModel>>,
}

impl Classifier {
    pub fn new(model: Option<Arc<PretrainedModel>>) -> Self {
        Self { model }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&self, vacancy_cleaned_text: &str) -> Result<ClusterAssignment, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::ModelUnavailable)?;
        let vector = model.vectorizer.transform(vacancy_cleaned_text);
        let cluster_id = model.predict(&vector);
        debug!("Vacancy assigned to cluster {cluster_id}");
        Ok(describe_cluster(cluster_id))
    }
}

fn describe_cluster(cluster_id: usize) -> ClusterAssignment {
    let cluster_label = CLUSTER_LABELS
        .iter()
        .find(|(id, _)| *id == cluster_id)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| FALLBACK_LABEL.to_string());
    let cluster_keywords = CLUSTER_KEYWORDS
        .iter()
        .find(|(id, _)| *id == cluster_id)
        .map(|(_, kws)| kws.iter().map(|k| k.to_string()).collect())
        .unwrap_or_default();
    ClusterAssignment {
        cluster_id,
        cluster_label,
        cluster_keywords,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-cluster model: cluster 0 around "laboratory", cluster 1 around "python".
    pub(crate) fn toy_model() -> PretrainedModel {
        let vectorizer = VectorizerArtifact {
            vocabulary: HashMap::from([
                ("laboratory".to_string(), 0),
                ("python".to_string(), 1),
                ("sql".to_string(), 2),
            ]),
            idf: vec![1.0, 1.0, 1.5],
            ngram_range: (1, 1),
            stop_words: true,
        };
        let clusters = ClusterModelArtifact {
            centroids: vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.7, 0.7]],
        };
        PretrainedModel::from_artifacts(vectorizer, clusters).unwrap()
    }

    #[test]
    fn test_classify_without_model_is_unavailable() {
        let classifier = Classifier::new(None);
        assert!(matches!(
            classifier.classify("python sql"),
            Err(ClassifierError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_classify_picks_nearest_centroid() {
        let classifier = Classifier::new(Some(Arc::new(toy_model())));
        let lab = classifier.classify("senior laboratory technologist").unwrap();
        assert_eq!(lab.cluster_id, 0);
        assert_eq!(lab.cluster_label, "Medical & Lab Science");

        let data = classifier.classify("python and sql developer").unwrap();
        assert_eq!(data.cluster_id, 1);
        assert!(data.cluster_keywords.contains(&"project".to_string()));
    }

    #[test]
    fn test_classify_never_fails_on_unknown_text() {
        let classifier = Classifier::new(Some(Arc::new(toy_model())));
        assert!(classifier.classify("").is_ok());
        assert!(classifier.classify("zzz qqq").is_ok());
    }

    #[test]
    fn test_unknown_cluster_falls_back_to_general_it() {
        let assignment = describe_cluster(42);
        assert_eq!(assignment.cluster_label, "General IT");
        assert!(assignment.cluster_keywords.is_empty());
    }

    #[test]
    fn test_centroid_dimension_mismatch_rejected() {
        let vectorizer = VectorizerArtifact {
            vocabulary: HashMap::from([("python".to_string(), 0)]),
            idf: vec![1.0],
            ngram_range: (1, 1),
            stop_words: true,
        };
        let clusters = ClusterModelArtifact {
            centroids: vec![vec![1.0, 2.0]],
        };
        assert!(matches!(
            PretrainedModel::from_artifacts(vectorizer, clusters),
            Err(ClassifierError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_reads_artifacts_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(VECTORIZER_FILE),
            r#"{"vocabulary": {"python": 0, "nurse": 1}, "idf": [1.0, 1.2]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(CLUSTER_MODEL_FILE),
            r#"{"centroids": [[0.0, 1.0], [1.0, 0.0]]}"#,
        )
        .unwrap();

        let model = PretrainedModel::load(dir.path()).unwrap();
        let classifier = Classifier::new(Some(Arc::new(model)));
        assert_eq!(classifier.classify("python engineer").unwrap().cluster_id, 1);
    }

    #[test]
    fn test_load_missing_directory_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PretrainedModel::load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io { .. }));
    }
}
