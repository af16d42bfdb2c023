// Grounded generation orchestrator.
// Answers are built only from retrieved evidence, the backend is called under a
// cancellable retry policy and citations are checked by a pluggable strategy.

pub mod citations;
pub mod orchestrator;
pub mod prompts;
pub mod retry;

pub use citations::{Citation, CitationStrategy, LabeledCitations, SubstringCitations};
pub use orchestrator::{AnswerResult, AnswerStatus, GroundedGenerator, InterviewQuestions};
pub use retry::{call_with_retry, RetryError, RetryPolicy};
