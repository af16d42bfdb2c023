//! Skill-gap matching over a fixed, controlled skill vocabulary.

use serde::{Deserialize, Serialize};

/// Controlled vocabulary, matched by case-insensitive substring search.
pub const SKILL_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "c++", "sql", "nosql",
    "machine learning", "deep learning", "ai", "data science",
    "aws", "azure", "cloud", "docker", "kubernetes",
    "react", "angular", "vue", "node",
    "mysql", "postgresql", "mongodb",
    "git", "agile", "scrum",
    "pandas", "numpy", "tensorflow", "pytorch",
    "spark", "hadoop", "etl", "pipeline",
    "tableau", "power bi", "excel",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// 0 – 100; 0 when the vacancy names no recognised skill.
    pub match_percentage: f64,
}

/// Skills from the vocabulary found in `text`, in vocabulary order.
pub fn extract_skills(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .copied()
        .filter(|skill| lowered.contains(skill))
        .collect()
}

pub fn match_skills(vacancy_text: &str, candidate_text: &str) -> SkillMatch {
    let vacancy_skills = extract_skills(vacancy_text);
    let candidate_skills = extract_skills(candidate_text);

    let vacancy_count = vacancy_skills.len();

    let (matched, missing): (Vec<&str>, Vec<&str>) = vacancy_skills
        .into_iter()
        .partition(|skill| candidate_skills.contains(skill));

    let match_percentage = if vacancy_count == 0 {
        0.0
    } else {
        matched.len() as f64 / vacancy_count as f64 * 100.0
    };

    SkillMatch {
        matched_skills: matched.into_iter().map(String::from).collect(),
        missing_skills: missing.into_iter().map(String::from).collect(),
        match_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_skills_case_insensitive() {
        let skills = extract_skills("Experienced with PYTHON, Docker and Power BI");
        assert_eq!(skills, vec!["python", "docker", "power bi"]);
    }

    #[test]
    fn test_match_percentage() {
        let result = match_skills("Python, SQL, AWS, Docker", "I use python and docker daily");
        assert_eq!(result.matched_skills, vec!["python", "docker"]);
        assert_eq!(result.missing_skills, vec!["sql", "aws"]);
        assert!((result.match_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_vacancy_without_skills_scores_zero() {
        let result = match_skills("Friendly receptionist wanted", "python sql");
        assert!(result.matched_skills.is_empty());
        assert!(result.missing_skills.is_empty());
        assert_eq!(result.match_percentage, 0.0);
    }

    #[test]
    fn test_full_match_is_one_hundred() {
        let result = match_skills("kubernetes", "Ran Kubernetes clusters");
        assert_eq!(result.match_percentage, 100.0);
    }
}
