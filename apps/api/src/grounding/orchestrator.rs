use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::citations::{Citation, CitationStrategy, SubstringCitations};
use super::prompts::{answer_prompt, format_context, interview_questions_prompt, NOT_FOUND_SENTINEL};
use super::retry::{call_with_retry, RetryError, RetryPolicy};
use crate::llm_client::GenerativeBackend;
use crate::retrieval::RetrievalResult;

const NOT_CONFIGURED_MESSAGE: &str =
    "Generative backend not configured. Set GEMINI_API_KEY to enable this feature.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    NotConfigured,
    NoEvidence,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub has_evidence: bool,
    pub status: AnswerStatus,
    /// Backend calls made; 0 when the call was short-circuited.
    pub attempts: u32,
    pub evidence: Vec<RetrievalResult>,
}

impl AnswerResult {
    fn without_call(answer: &str, status: AnswerStatus) -> Self {
        Self {
            answer: answer.to_string(),
            citations: Vec::new(),
            has_evidence: false,
            status,
            attempts: 0,
            evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestions {
    pub candidate_id: String,
    pub questions: Vec<String>,
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Builds evidence-only prompts and runs them through the retry policy.
#[derive(Clone)]
pub struct GroundedGenerator {
    backend: Option<Arc<dyn GenerativeBackend>>,
    policy: RetryPolicy,
    citations: Arc<dyn CitationStrategy>,
}

impl GroundedGenerator {
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            citations: Arc::new(SubstringCitations),
        }
    }

    pub fn with_citations(mut self, citations: Arc<dyn CitationStrategy>) -> Self {
        self.citations = citations;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn generate_answer(
        &self,
        query: &str,
        evidence: &[RetrievalResult],
        cancel: &CancellationToken,
    ) -> AnswerResult {
        let Some(backend) = &self.backend else {
            return AnswerResult::without_call(NOT_CONFIGURED_MESSAGE, AnswerStatus::NotConfigured);
        };
        if evidence.is_empty() {
            return AnswerResult::without_call(NOT_FOUND_SENTINEL, AnswerStatus::NoEvidence);
        }

        let prompt = answer_prompt(query, &format_context(evidence));
        match call_with_retry(backend.as_ref(), &prompt, &self.policy, cancel).await {
            Ok(outcome) => {
                let citations = self.citations.extract(&outcome.text, evidence);
                info!(
                    "Grounded answer generated: {} chunks, {} citations ({}), {} attempts",
                    evidence.len(),
                    citations.len(),
                    self.citations.name(),
                    outcome.attempts
                );
                AnswerResult {
                    answer: outcome.text,
                    citations,
                    has_evidence: true,
                    status: AnswerStatus::Answered,
                    attempts: outcome.attempts,
                    evidence: evidence.to_vec(),
                }
            }
            Err(err) => {
                warn!("Grounded answer failed: {err}");
                AnswerResult {
                    answer: format!("Error generating response: {err}"),
                    citations: Vec::new(),
                    has_evidence: false,
                    status: AnswerStatus::Failed,
                    attempts: attempts_made(&err),
                    evidence: Vec::new(),
                }
            }
        }
    }

    pub async fn generate_interview_questions(
        &self,
        candidate_id: &str,
        candidate_text: &str,
        vacancy_text: &str,
        count: usize,
        cancel: &CancellationToken,
    ) -> InterviewQuestions {
        let Some(backend) = &self.backend else {
            return InterviewQuestions {
                candidate_id: candidate_id.to_string(),
                questions: Vec::new(),
                status: AnswerStatus::NotConfigured,
                message: Some(NOT_CONFIGURED_MESSAGE.to_string()),
            };
        };

        let prompt = interview_questions_prompt(candidate_text, vacancy_text, count);
        match call_with_retry(backend.as_ref(), &prompt, &self.policy, cancel).await {
            Ok(outcome) => InterviewQuestions {
                candidate_id: candidate_id.to_string(),
                questions: parse_question_lines(&outcome.text),
                status: AnswerStatus::Answered,
                message: None,
            },
            Err(err) => {
                warn!("Interview questions for {candidate_id} failed: {err}");
                InterviewQuestions {
                    candidate_id: candidate_id.to_string(),
                    questions: Vec::new(),
                    status: AnswerStatus::Failed,
                    message: Some(format!("Error generating questions: {err}")),
                }
            }
        }
    }
}

fn attempts_made(err: &RetryError) -> u32 {
    match err {
        RetryError::Exhausted { attempts, .. } => *attempts,
        RetryError::Permanent(_) => 1,
        RetryError::Cancelled => 0,
    }
}

/// Trimmed lines starting with a digit or a dash. Falls back to the whole text
/// as a single entry when no line qualifies.
pub fn parse_question_lines(text: &str) -> Vec<String> {
    let questions: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with('-') || line.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        vec![text.to_string()]
    } else {
        questions
    }
}
