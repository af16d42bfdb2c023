//! Grounding checks that decide which retrieved chunks an answer cites.

use regex::Regex;
use serde::Serialize;

use crate::retrieval::RetrievalResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub candidate_id: String,
    pub page: u32,
}

pub trait CitationStrategy: Send + Sync {
    /// Citations for `answer`, in retrieval order, at most one per (candidate, page).
    fn extract(&self, answer: &str, evidence: &[RetrievalResult]) -> Vec<Citation>;

    fn name(&self) -> &'static str;
}

/// Cites a chunk when its candidate id appears anywhere in the answer. Over-cites
/// every page of a mentioned candidate and misses paraphrased references.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringCitations;

impl CitationStrategy for SubstringCitations {
    fn extract(&self, answer: &str, evidence: &[RetrievalResult]) -> Vec<Citation> {
        collect_unique(evidence, |result| answer.contains(&result.chunk.candidate_id))
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}

/// Cites a chunk only when the answer carries a `Candidate <id>, Page <n>` label
/// for that chunk's candidate and page.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabeledCitations;

impl CitationStrategy for LabeledCitations {
    fn extract(&self, answer: &str, evidence: &[RetrievalResult]) -> Vec<Citation> {
        collect_unique(evidence, |result| {
            let pattern = format!(
                r"(?i)Candidate\s+{}\s*,\s*Page\s+{}\b",
                regex::escape(&result.chunk.candidate_id),
                result.chunk.page
            );
            Regex::new(&pattern)
                .map(|re| re.is_match(answer))
                .unwrap_or(false)
        })
    }

    fn name(&self) -> &'static str {
        "labeled"
    }
}

fn collect_unique<F>(evidence: &[RetrievalResult], mut cited: F) -> Vec<Citation>
where
    F: FnMut(&RetrievalResult) -> bool,
{
    let mut citations: Vec<Citation> = Vec::new();
    for result in evidence {
        let citation = Citation {
            candidate_id: result.chunk.candidate_id.clone(),
            page: result.chunk.page,
        };
        if !citations.contains(&citation) && cited(result) {
            citations.push(citation);
        }
    }
    citations
}
