//! Vacancy and candidate profiles. Both are built once and never mutated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::cleaning::clean_text;
use crate::documents::extractor::{PageTexts, TextExtractor};
use crate::ranking::classifier::PretrainedModel;
use crate::ranking::tfidf::TfidfSpace;

const CANDIDATE_KEYWORDS: usize = 15;
const VACANCY_KEYWORDS: usize = 10;
/// Keywords that get an evidence snippet.
const EVIDENCE_KEYWORDS: usize = 10;
const SNIPPET_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub keyword: String,
    pub page: u32,
    pub snippet: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacancyProfile {
    pub title: String,
    pub description: String,
    pub cleaned_text: String,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub page_texts: PageTexts,
    pub full_text: String,
    pub cleaned_text: String,
    pub keywords: Vec<Keyword>,
    pub evidence_snippets: Vec<EvidenceSnippet>,
}

/// Candidate ids follow upload position: `CV_01`, `CV_02`, …
pub fn candidate_id_for(upload_index: usize) -> String {
    format!("CV_{:02}", upload_index + 1)
}

/// Turns raw documents into profiles. Keyword extraction uses the pretrained
/// vocabulary when one is loaded; without it keyword lists stay empty.
#[derive(Clone)]
pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    model: Option<Arc<PretrainedModel>>,
}

impl DocumentProcessor {
    pub fn new(extractor: Arc<dyn TextExtractor>, model: Option<Arc<PretrainedModel>>) -> Self {
        Self { extractor, model }
    }

    pub fn process_vacancy(&self, title: &str, description: &str) -> VacancyProfile {
        let cleaned_text = clean_text(&format!("{title} {description}"));
        let keywords = self.keywords(&cleaned_text, VACANCY_KEYWORDS);
        VacancyProfile {
            title: title.to_string(),
            description: description.to_string(),
            cleaned_text,
            keywords,
        }
    }

    pub fn process_document(&self, bytes: &[u8], candidate_id: &str) -> CandidateProfile {
        let pages = self.extractor.extract_pages(bytes);
        self.process_pages(pages, candidate_id)
    }

    pub fn process_pages(&self, page_texts: PageTexts, candidate_id: &str) -> CandidateProfile {
        let full_text = page_texts
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let cleaned_text = clean_text(&full_text);
        let keywords = self.keywords(&cleaned_text, CANDIDATE_KEYWORDS);
        let top: Vec<Keyword> = keywords.iter().take(EVIDENCE_KEYWORDS).cloned().collect();
        let evidence_snippets = find_evidence_snippets(&page_texts, &top, SNIPPET_LENGTH);
        debug!(
            "Processed {candidate_id}: {} pages, {} keywords, {} snippets",
            page_texts.len(),
            keywords.len(),
            evidence_snippets.len()
        );
        CandidateProfile {
            candidate_id: candidate_id.to_string(),
            page_texts,
            full_text,
            cleaned_text,
            keywords,
            evidence_snippets,
        }
    }

    fn keywords(&self, cleaned_text: &str, top_n: usize) -> Vec<Keyword> {
        self.model
            .as_ref()
            .map(|m| extract_keywords(m.vectorizer(), cleaned_text, top_n))
            .unwrap_or_default()
    }
}

/// Top-weighted terms of `text` in `space`; zero weights are dropped.
pub fn extract_keywords(space: &TfidfSpace, text: &str, top_n: usize) -> Vec<Keyword> {
    let vector = space.transform(text);
    let mut scored: Vec<(usize, f64)> = vector
        .entries()
        .iter()
        .copied()
        .filter(|(_, w)| *w > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
        .into_iter()
        .take(top_n)
        .filter_map(|(index, weight)| {
            space.feature_name(index).map(|term| Keyword {
                term: term.to_string(),
                weight,
            })
        })
        .collect()
}

/// First case-insensitive occurrence of each keyword, searched page by page, with
/// `snippet_length / 2` characters of context on each side.
pub fn find_evidence_snippets(
    page_texts: &PageTexts,
    keywords: &[Keyword],
    snippet_length: usize,
) -> Vec<EvidenceSnippet> {
    let half = snippet_length / 2;
    let mut evidence = Vec::new();

    for keyword in keywords {
        let needle: Vec<char> = keyword.term.chars().map(lower_char).collect();
        if needle.is_empty() {
            continue;
        }
        for (&page, text) in page_texts {
            let original: Vec<char> = text.chars().collect();
            let lowered: Vec<char> = original.iter().copied().map(lower_char).collect();
            let Some(pos) = lowered
                .windows(needle.len())
                .position(|window| window == needle.as_slice())
            else {
                continue;
            };

            let start = pos.saturating_sub(half);
            let end = (pos + needle.len() + half).min(original.len());
            let mut snippet: String = original[start..end].iter().collect::<String>().trim().to_string();
            if start > 0 {
                snippet = format!("...{snippet}");
            }
            if end < original.len() {
                snippet.push_str("...");
            }
            evidence.push(EvidenceSnippet {
                keyword: keyword.term.clone(),
                page,
                snippet,
                weight: keyword.weight,
            });
            break;
        }
    }
    evidence
}

fn lower_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::documents::extractor::empty_document;
    use crate::ranking::classifier::tests::toy_model;
    use std::collections::BTreeMap;

    /// Reads bytes as UTF-8 text with form feeds separating pages.
    pub(crate) struct Utf8Extractor;

    impl TextExtractor for Utf8Extractor {
        fn extract_pages(&self, bytes: &[u8]) -> PageTexts {
            match std::str::from_utf8(bytes) {
                Ok(text) => text
                    .split('\u{c}')
                    .enumerate()
                    .map(|(i, page)| (i as u32 + 1, page.to_string()))
                    .collect(),
                Err(_) => empty_document(),
            }
        }
    }

    fn keyword(term: &str) -> Keyword {
        Keyword {
            term: term.to_string(),
            weight: 0.5,
        }
    }

    #[test]
    fn test_candidate_ids_are_zero_padded() {
        assert_eq!(candidate_id_for(0), "CV_01");
        assert_eq!(candidate_id_for(11), "CV_12");
    }

    #[test]
    fn test_process_document_joins_pages() {
        let processor = DocumentProcessor::new(Arc::new(Utf8Extractor), None);
        let profile = processor.process_document("Python Developer\u{c}SQL, Spark".as_bytes(), "CV_01");
        assert_eq!(profile.page_texts.len(), 2);
        assert_eq!(profile.full_text, "Python Developer SQL, Spark");
        assert_eq!(profile.cleaned_text, "python developer sql spark");
        assert!(profile.keywords.is_empty(), "no pretrained vocabulary loaded");
    }

    #[test]
    fn test_keywords_use_pretrained_vocabulary() {
        let processor = DocumentProcessor::new(Arc::new(Utf8Extractor), Some(Arc::new(toy_model())));
        let profile = processor.process_document(b"Python and SQL in the laboratory", "CV_02");
        let terms: Vec<&str> = profile.keywords.iter().map(|k| k.term.as_str()).collect();
        assert_eq!(terms[0], "sql", "highest idf term first");
        assert_eq!(terms.len(), 3);
        assert!(!profile.evidence_snippets.is_empty());
    }

    #[test]
    fn test_vacancy_combines_title_and_description() {
        let processor = DocumentProcessor::new(Arc::new(Utf8Extractor), None);
        let vacancy = processor.process_vacancy("Data Analyst", "SQL & dashboards");
        assert_eq!(vacancy.cleaned_text, "data analyst sql dashboards");
        assert_eq!(vacancy.title, "Data Analyst");
    }

    #[test]
    fn test_snippet_found_on_first_matching_page() {
        let pages = BTreeMap::from([
            (1, "Summary of experience".to_string()),
            (2, "Built Kafka pipelines".to_string()),
            (3, "More Kafka".to_string()),
        ]);
        let snippets = find_evidence_snippets(&pages, &[keyword("kafka")], 100);
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].page, 2);
        assert_eq!(snippets[0].snippet, "Built Kafka pipelines");
    }

    #[test]
    fn test_snippet_adds_ellipsis_when_truncated() {
        let text = format!("{}rust{}", "a".repeat(60), "b".repeat(60));
        let pages = BTreeMap::from([(1, text)]);
        let snippets = find_evidence_snippets(&pages, &[keyword("rust")], 20);
        let snippet = &snippets[0].snippet;
        assert!(snippet.starts_with("...aaaaaaaaaarust"), "{snippet}");
        assert!(snippet.ends_with("bbbbbbbbbb..."), "{snippet}");
    }

    #[test]
    fn test_missing_keyword_has_no_snippet() {
        let pages = BTreeMap::from([(1, "nothing relevant".to_string())]);
        assert!(find_evidence_snippets(&pages, &[keyword("haskell")], 100).is_empty());
    }
}
