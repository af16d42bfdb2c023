//! Prompt templates for grounded answers and interview questions.

use crate::retrieval::RetrievalResult;

/// Answer the backend must give when the evidence does not support one.
pub const NOT_FOUND_SENTINEL: &str = "Not found in CV.";

/// Characters of candidate text included in an interview-question prompt.
pub const QUESTION_CONTEXT_CHARS: usize = 2000;

/// Labels each retrieved chunk with its rank, candidate and page, in retrieval order.
pub fn format_context(results: &[RetrievalResult]) -> String {
    let mut context = String::from("Retrieved Evidence:\n\n");
    for (i, result) in results.iter().enumerate() {
        context.push_str(&format!(
            "[Source {}: Candidate {}, Page {}]\n{}\n\n",
            i + 1,
            result.chunk.candidate_id,
            result.chunk.page,
            result.chunk.text
        ));
    }
    context
}

pub fn answer_prompt(query: &str, context: &str) -> String {
    format!(
        r#"You are a recruitment assistant. Answer the question ONLY based on the retrieved evidence below.

{context}

Question: {query}

IMPORTANT RULES:
1. Answer ONLY using information from the retrieved evidence above
2. Cite your sources using format: (Candidate [ID], Page [NUM], "[short quote]")
3. If the evidence doesn't contain the answer, respond with: "{NOT_FOUND_SENTINEL}"
4. Be concise and precise

Answer:"#
    )
}

pub fn interview_questions_prompt(candidate_text: &str, vacancy_text: &str, count: usize) -> String {
    let excerpt: String = candidate_text.chars().take(QUESTION_CONTEXT_CHARS).collect();
    format!(
        r#"Based on the candidate's CV and the job vacancy, generate {count} tailored interview questions.

Vacancy: {vacancy_text}

Candidate CV Key Points:
{excerpt}

Generate {count} specific interview questions that:
1. Probe the candidate's experience mentioned in their CV
2. Relate to the vacancy requirements
3. Include technical and behavioral questions
4. Reference specific skills or projects from the CV

Format:
1. [Question Text]
   - Evidence: [Quote specific project/experience from CV]

2. [Question Text] ..."#
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::retrieval::Chunk;

    pub(crate) fn result(id: &str, page: u32, text: &str, distance: f32) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk {
                candidate_id: id.to_string(),
                page,
                sequence: 0,
                text: text.to_string(),
            },
            position: 0,
            distance,
        }
    }

    #[test]
    fn test_format_context_labels_in_retrieval_order() {
        let context = format_context(&[
            result("CV_02", 3, "kubernetes", 0.1),
            result("CV_01", 1, "python", 0.2),
        ]);
        assert_eq!(
            context,
            "Retrieved Evidence:\n\n[Source 1: Candidate CV_02, Page 3]\nkubernetes\n\n\
             [Source 2: Candidate CV_01, Page 1]\npython\n\n"
        );
    }

    #[test]
    fn test_answer_prompt_carries_rules() {
        let prompt = answer_prompt("Who knows SQL?", "ctx");
        assert!(prompt.contains("Question: Who knows SQL?"));
        assert!(prompt.contains("(Candidate [ID], Page [NUM], \"[short quote]\")"));
        assert!(prompt.contains("\"Not found in CV.\""));
    }

    #[test]
    fn test_question_prompt_truncates_candidate_text() {
        let long = "x".repeat(5000);
        let prompt = interview_questions_prompt(&long, "Data engineer", 3);
        assert!(prompt.contains(&"x".repeat(QUESTION_CONTEXT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(QUESTION_CONTEXT_CHARS + 1)));
        assert!(prompt.starts_with("Based on the candidate's CV and the job vacancy, generate 3"));
    }
}
