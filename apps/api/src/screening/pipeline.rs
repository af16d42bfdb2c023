//! The screening pipeline: vacancy → classification → CV profiles → ranking and
//! shortlist → graph analytics → vector index.
//!
//! # spawn_blocking pattern
//! Extraction, TF-IDF fitting and centrality are CPU-bound. They run inside
//! `tokio::task::spawn_blocking` and use rayon for per-document parallelism.
//! Local chunk embedding moves to the blocking pool inside `HashingEmbedder`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineSettings;
use crate::documents::profile::candidate_id_for;
use crate::documents::{CandidateProfile, DocumentProcessor, VacancyProfile};
use crate::errors::AppError;
use crate::graph::{analyze_candidates, GraphReport};
use crate::ranking::{rank, shortlist, Classifier, ClusterAssignment, RankedCandidate, ShortlistEntry};
use crate::retrieval::{RetrievalEngine, VectorIndex};

/// One uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn is_pdf(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".pdf")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    Assigned(ClusterAssignment),
    Unavailable { message: String },
}

/// Everything a screening produced, in presentation form.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub vacancy: VacancyProfile,
    pub classification: ClassificationOutcome,
    pub rankings: Vec<RankedCandidate>,
    pub shortlist: Vec<ShortlistEntry>,
    pub graph: GraphReport,
    pub chunk_count: usize,
    /// Uploads ignored because they were not PDFs.
    pub skipped_files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A finished screening. Immutable; chat and question requests read from it.
pub struct ScreeningSession {
    pub report: ScreeningReport,
    pub candidates: Vec<CandidateProfile>,
    pub index: VectorIndex,
}

impl ScreeningSession {
    pub fn candidate(&self, candidate_id: &str) -> Option<&CandidateProfile> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }
}

#[derive(Clone)]
pub struct ScreeningPipeline {
    processor: DocumentProcessor,
    classifier: Classifier,
    retrieval: RetrievalEngine,
    settings: EngineSettings,
}

impl ScreeningPipeline {
    pub fn new(
        processor: DocumentProcessor,
        classifier: Classifier,
        retrieval: RetrievalEngine,
        settings: EngineSettings,
    ) -> Self {
        Self {
            processor,
            classifier,
            retrieval,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn classification_available(&self) -> bool {
        self.classifier.is_available()
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    /// Builds the vacancy profile and classifies it. A missing model degrades to
    /// `ClassificationOutcome::Unavailable`.
    pub fn prepare_vacancy(
        &self,
        title: &str,
        description: &str,
    ) -> Result<(VacancyProfile, ClassificationOutcome), AppError> {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(AppError::Validation(
                "Please provide vacancy title and description".to_string(),
            ));
        }
        let vacancy = self.processor.process_vacancy(title, description);
        let classification = match self.classifier.classify(&vacancy.cleaned_text) {
            Ok(assignment) => ClassificationOutcome::Assigned(assignment),
            Err(e) => {
                warn!("Vacancy classification skipped: {e}");
                ClassificationOutcome::Unavailable {
                    message: e.to_string(),
                }
            }
        };
        Ok((vacancy, classification))
    }

    pub async fn run(
        &self,
        title: &str,
        description: &str,
        uploads: Vec<UploadedDocument>,
    ) -> Result<ScreeningSession, AppError> {
        let (vacancy, classification) = self.prepare_vacancy(title, description)?;

        if uploads.is_empty() {
            return Err(AppError::Validation("Please upload at least one CV".to_string()));
        }
        if uploads.len() > self.settings.max_candidates {
            return Err(AppError::Validation(format!(
                "Maximum {} CVs allowed",
                self.settings.max_candidates
            )));
        }

        // Ids follow upload position, so skipped files leave gaps in the numbering.
        let mut accepted: Vec<(usize, UploadedDocument)> = Vec::new();
        let mut skipped_files = Vec::new();
        for (idx, upload) in uploads.into_iter().enumerate() {
            if upload.is_pdf() {
                accepted.push((idx, upload));
            } else {
                skipped_files.push(upload.filename);
            }
        }

        let processor = self.processor.clone();
        let candidates: Vec<CandidateProfile> = tokio::task::spawn_blocking(move || {
            accepted
                .par_iter()
                .map(|(idx, upload)| processor.process_document(&upload.bytes, &candidate_id_for(*idx)))
                .collect()
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))?;

        if candidates.is_empty() {
            return Err(AppError::Validation("No valid PDF files processed".to_string()));
        }

        let settings = self.settings.clone();
        let vacancy_cleaned = vacancy.cleaned_text.clone();
        let vacancy_description = vacancy.description.clone();
        let (candidates, rankings, shortlist_entries, graph) =
            tokio::task::spawn_blocking(move || {
                let rankings = rank(&vacancy_cleaned, &candidates);
                let top_n = settings.shortlist_size.min(rankings.len());
                let shortlist_entries =
                    shortlist(&rankings, &candidates, &vacancy_description, top_n);
                let graph = analyze_candidates(&candidates, &settings);
                (candidates, rankings, shortlist_entries, graph)
            })
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in analysis: {e}")))?;

        let (index, chunk_count) = self.retrieval.build_index(&candidates).await?;

        info!(
            "Screening complete: {} candidates, {} shortlisted, {} chunks indexed",
            candidates.len(),
            shortlist_entries.len(),
            chunk_count
        );

        Ok(ScreeningSession {
            report: ScreeningReport {
                vacancy,
                classification,
                rankings,
                shortlist: shortlist_entries,
                graph,
                chunk_count,
                skipped_files,
                created_at: Utc::now(),
            },
            candidates,
            index,
        })
    }
}
