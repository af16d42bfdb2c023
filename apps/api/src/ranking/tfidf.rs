//! Term weighting with an sklearn-compatible TF-IDF space. The same type serves as
//! the pretrained global vocabulary for classification and keywords, the per-session
//! ranking space over vacancy plus candidates, and the per-session graph space over
//! candidates only.
//!
//! Analyzer: lowercase, token pattern `\b\w\w+\b`, English stop words removed,
//! unigrams + bigrams. Weighting: raw term counts × smooth idf, rows L2-normalised.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Vocabulary cap applied when fitting a session space.
pub const MAX_FEATURES: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TfidfOptions {
    pub max_features: usize,
    pub ngram_range: (usize, usize),
    pub stop_words: bool,
}

impl Default for TfidfOptions {
    fn default() -> Self {
        Self {
            max_features: MAX_FEATURES,
            ngram_range: (1, 2),
            stop_words: true,
        }
    }
}

/// Sparse, index-sorted term-weight vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_val) = self.entries[i];
            let (b_idx, b_val) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }
}

/// Cosine similarity clamped to [0, 1]. Zero vectors are similar to nothing.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

/// A fitted vocabulary with per-term inverse document frequencies.
#[derive(Debug, Clone)]
pub struct TfidfSpace {
    vocabulary: HashMap<String, usize>,
    feature_names: Vec<String>,
    idf: Vec<f64>,
    options: TfidfOptions,
}

impl TfidfSpace {
    /// Fits a fresh vocabulary over `documents`. An all-empty corpus yields an
    /// empty space whose vectors are all zero.
    pub fn fit(documents: &[&str], options: TfidfOptions) -> Self {
        let analyzed: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| analyze(doc, options.ngram_range, options.stop_words))
            .collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &analyzed {
            let mut seen = BTreeSet::new();
            for term in terms {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        // Keep the most frequent terms; ties resolved alphabetically.
        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        if ranked.len() > options.max_features {
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked.truncate(options.max_features);
        }
        let mut feature_names: Vec<String> = ranked.iter().map(|(t, _)| t.to_string()).collect();
        feature_names.sort();

        let n_docs = documents.len() as f64;
        let idf = feature_names
            .iter()
            .map(|term| {
                let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = feature_names
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Self {
            vocabulary,
            feature_names,
            idf,
            options,
        }
    }

    /// Fits and transforms in one pass; rows line up with `documents`.
    pub fn fit_transform(documents: &[&str], options: TfidfOptions) -> (Self, Vec<SparseVector>) {
        let space = Self::fit(documents, options);
        let vectors = space.transform_many(documents);
        (space, vectors)
    }

    /// Rebuilds a space from a persisted vocabulary. Fails when an index has no idf.
    pub fn from_parts(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        options: TfidfOptions,
    ) -> Result<Self, String> {
        let mut feature_names = vec![String::new(); idf.len()];
        for (term, &index) in &vocabulary {
            let slot = feature_names
                .get_mut(index)
                .ok_or_else(|| format!("term '{term}' has index {index} beyond idf length {}", idf.len()))?;
            *slot = term.clone();
        }
        Ok(Self {
            vocabulary,
            feature_names,
            idf,
            options,
        })
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze(text, self.options.ngram_range, self.options.stop_words) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }
        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }
        SparseVector { entries }
    }

    pub fn transform_many(&self, documents: &[&str]) -> Vec<SparseVector> {
        documents.par_iter().map(|doc| self.transform(doc)).collect()
    }

    pub fn feature_name(&self, index: usize) -> Option<&str> {
        self.feature_names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }
}

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("Invalid token regex"))
}

/// Splits text into the analyzer's terms: filtered unigrams followed by n-grams.
pub fn analyze(text: &str, ngram_range: (usize, usize), stop_words: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = token_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !stop_words || !is_stop_word(t))
        .collect();

    let (min_n, max_n) = ngram_range;
    let mut terms = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

fn is_stop_word(token: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&token).is_ok()
}

/// English stop words (sorted for binary search).
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "be", "became", "because", "become", "becomes", "becoming", "been",
    "before", "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "but", "by", "can", "cannot", "could", "do", "done", "down", "due", "during", "each",
    "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever", "every", "everyone",
    "everything", "everywhere", "except", "few", "for", "former", "formerly", "from", "further",
    "had", "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
    "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "ie", "if", "in",
    "inc", "indeed", "into", "is", "it", "its", "itself", "last", "latter", "latterly", "least",
    "less", "ltd", "many", "may", "me", "meanwhile", "might", "more", "moreover", "most",
    "mostly", "much", "must", "my", "myself", "namely", "neither", "never", "nevertheless",
    "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "re",
    "same", "seem", "seemed", "seeming", "seems", "several", "she", "should", "since", "so",
    "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still",
    "such", "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
    "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "this",
    "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
    "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
    "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
    "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
    "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];
