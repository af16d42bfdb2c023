//! Candidate ranking and shortlisting.
//!
//! Ranking fits a session-local TF-IDF space over the vacancy plus every candidate
//! for each call. Scores are comparable within one screening, not across screenings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::documents::{CandidateProfile, Keyword};
use crate::ranking::skills::match_skills;
use crate::ranking::tfidf::{cosine_similarity, TfidfOptions, TfidfSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    /// Cosine similarity to the vacancy, 0.0 – 1.0.
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub candidate_id: String,
    pub similarity_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub match_percentage: f64,
    pub keywords: Vec<Keyword>,
}

/// Ranks candidates by similarity to the vacancy, highest first. The sort is
/// stable, so equal scores keep input order.
pub fn rank(vacancy_cleaned_text: &str, candidates: &[CandidateProfile]) -> Vec<RankedCandidate> {
    let documents: Vec<&str> = std::iter::once(vacancy_cleaned_text)
        .chain(candidates.iter().map(|c| c.cleaned_text.as_str()))
        .collect();
    let (_, vectors) = TfidfSpace::fit_transform(&documents, TfidfOptions::default());
    let (vacancy_vector, candidate_vectors) = match vectors.split_first() {
        Some(split) => split,
        None => return Vec::new(),
    };

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .zip(candidate_vectors)
        .map(|(candidate, vector)| RankedCandidate {
            candidate_id: candidate.candidate_id.clone(),
            similarity_score: cosine_similarity(vacancy_vector, vector),
        })
        .collect();
    ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    ranked
}

/// Takes the first `top_n` rankings (fewer when fewer are available) and attaches
/// skill-gap detail computed from the raw vacancy and candidate texts.
pub fn shortlist(
    rankings: &[RankedCandidate],
    candidates: &[CandidateProfile],
    vacancy_text: &str,
    top_n: usize,
) -> Vec<ShortlistEntry> {
    let by_id: HashMap<&str, &CandidateProfile> = candidates
        .iter()
        .map(|c| (c.candidate_id.as_str(), c))
        .collect();

    rankings
        .iter()
        .take(top_n)
        .filter_map(|ranked| {
            let profile = by_id.get(ranked.candidate_id.as_str())?;
            let skills = match_skills(vacancy_text, &profile.full_text);
            Some(ShortlistEntry {
                candidate_id: ranked.candidate_id.clone(),
                similarity_score: ranked.similarity_score,
                matched_skills: skills.matched_skills,
                missing_skills: skills.missing_skills,
                match_percentage: skills.match_percentage,
                keywords: profile.keywords.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn candidate(id: &str, text: &str) -> CandidateProfile {
        CandidateProfile {
            candidate_id: id.to_string(),
            page_texts: BTreeMap::from([(1, text.to_string())]),
            full_text: text.to_string(),
            cleaned_text: crate::documents::clean_text(text),
            keywords: vec![],
            evidence_snippets: vec![],
        }
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let candidates = vec![
            candidate("CV_01", "forklift operation warehouse logistics"),
            candidate("CV_02", "python sql data analysis"),
            candidate("CV_03", "python developer"),
        ];
        let ranked = rank("data analyst python sql", &candidates);
        let ids: Vec<&str> = ranked.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["CV_02", "CV_03", "CV_01"]);
        assert_eq!(ranked[2].similarity_score, 0.0);
        assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.similarity_score)));
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let candidates = vec![
            candidate("CV_01", "nursing"),
            candidate("CV_02", "carpentry"),
            candidate("CV_03", "plumbing"),
        ];
        let ranked = rank("python", &candidates);
        let ids: Vec<&str> = ranked.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["CV_01", "CV_02", "CV_03"]);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let candidates = vec![
            candidate("CV_01", "rust kafka distributed systems"),
            candidate("CV_02", "python kafka streaming"),
            candidate("CV_03", "java spring kafka"),
        ];
        let first = rank("kafka streaming engineer", &candidates);
        let second = rank("kafka streaming engineer", &candidates);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rank_empty_vocabulary_scores_zero() {
        let candidates = vec![candidate("CV_01", "the and of"), candidate("CV_02", "")];
        let ranked = rank("", &candidates);
        assert!(ranked.iter().all(|r| r.similarity_score == 0.0));
    }

    #[test]
    fn test_shortlist_caps_at_available_candidates() {
        let candidates = vec![
            candidate("CV_01", "Python and SQL"),
            candidate("CV_02", "Excel"),
        ];
        let ranked = rank("python sql excel", &candidates);
        let entries = shortlist(&ranked, &candidates, "Python, SQL, Excel", 5);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].candidate_id, "CV_01");
        assert_eq!(entries[0].matched_skills, vec!["python", "sql"]);
        assert_eq!(entries[0].missing_skills, vec!["excel"]);
    }

    #[test]
    fn test_shortlist_takes_top_n() {
        let candidates: Vec<_> = (0..4)
            .map(|i| candidate(&format!("CV_0{}", i + 1), "python"))
            .collect();
        let ranked = rank("python", &candidates);
        assert_eq!(shortlist(&ranked, &candidates, "python", 2).len(), 2);
    }
}
