//! Core data model types for lessonrun.
//!
//! These mirror the payloads exchanged with the learning-module backend.
//! Correctness flags never appear on the client-side [`Choice`]; the only
//! place a correct answer shows up is an [`AnswerOutcome`], after the student
//! has committed to a choice.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reference to a subject or grade attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A learning unit containing an ordered set of quiz questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identifier; used to key the persisted session record.
    pub id: String,
    /// URL-safe identifier; used in backend paths.
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "is_published")]
    pub published: bool,
    #[serde(default, rename = "questions_count")]
    pub question_count: usize,
    #[serde(default)]
    pub subject: Option<Taxon>,
    #[serde(default)]
    pub grade: Option<Taxon>,
}

impl Module {
    /// The description, if it carries any non-whitespace text.
    pub fn summary_source(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// One answer option, as shown before answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub content: String,
}

/// A single quiz question with its ordered choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Question {
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// Returned when an attempt is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStart {
    /// Attempt identity used on every later call.
    pub code: String,
    pub first_question_slug: String,
}

/// The backend's verdict on a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_choice_id: String,
    pub correct_choice_content: String,
    #[serde(default)]
    pub next_question_slug: Option<String>,
}

/// Terminal score of a finalized attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub student_name: String,
    pub score: u32,
    pub total: u32,
    pub status: String,
}

impl fmt::Display for FinalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.score, self.total)
    }
}

/// Pagination metadata returned by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u32,
    pub total_pages: u32,
}

/// One page of the module catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePage {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Filters for listing modules. `"all"` in a taxon filter means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFilter {
    pub keyword: Option<String>,
    pub grade_id: Option<String>,
    pub subject_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ModuleFilter {
    /// Query pairs in the order the backend documents them, empty filters omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        if let Some(grade) = self.grade_id.as_deref().filter(|g| is_taxon_filter(g)) {
            pairs.push(("grade_id", grade.to_string()));
        }
        if let Some(subject) = self.subject_id.as_deref().filter(|s| is_taxon_filter(s)) {
            pairs.push(("subject_id", subject.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        pairs
    }
}

fn is_taxon_filter(value: &str) -> bool {
    !value.is_empty() && value != "all"
}

/// Minimal module reference attached to a submissions listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub grade: Option<Taxon>,
    #[serde(default)]
    pub subject: Option<Taxon>,
}

/// A finalized attempt as seen by the module author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionItem {
    pub student_name: String,
    pub total_correct: u32,
    pub total_questions: u32,
    pub submitted_at: DateTime<Utc>,
}

/// All submissions for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSubmissions {
    pub module: ModuleRef,
    pub total_submissions: u32,
    #[serde(default)]
    pub submissions: Vec<SubmissionItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_deserializes_backend_field_names() {
        let json = serde_json::json!({
            "id": "m-1",
            "slug": "fractions",
            "title": "Fractions",
            "description": "  ",
            "is_published": true,
            "questions_count": 2,
            "subject": {"id": "s-1", "name": "Math"}
        });
        let module: Module = serde_json::from_value(json).unwrap();
        assert!(module.published);
        assert_eq!(module.question_count, 2);
        assert_eq!(module.subject.unwrap().name, "Math");
        assert!(module.grade.is_none());
    }

    #[test]
    fn blank_description_is_not_a_summary_source() {
        let mut module = Module {
            id: "m".into(),
            slug: "m".into(),
            title: "M".into(),
            description: Some("   ".into()),
            published: true,
            question_count: 1,
            subject: None,
            grade: None,
        };
        assert_eq!(module.summary_source(), None);
        module.description = Some(" Plants need light. ".into());
        assert_eq!(module.summary_source(), Some("Plants need light."));
    }

    #[test]
    fn choice_payload_ignores_correctness_flag() {
        let json = r#"{"id":"c1","content":"4","is_correct_answer":true}"#;
        let choice: Choice = serde_json::from_str(json).unwrap();
        assert_eq!(choice.content, "4");
        let back = serde_json::to_value(&choice).unwrap();
        assert!(back.get("is_correct_answer").is_none());
    }

    #[test]
    fn final_score_displays_backend_values() {
        let score = FinalScore {
            student_name: "Ani".into(),
            score: 1,
            total: 2,
            status: "finalized".into(),
        };
        assert_eq!(score.to_string(), "1/2");
    }

    #[test]
    fn filter_skips_all_and_empty_values() {
        let filter = ModuleFilter {
            keyword: Some("frac".into()),
            grade_id: Some("all".into()),
            subject_id: Some("s-1".into()),
            page: Some(2),
            per_page: None,
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("keyword", "frac".to_string()),
                ("subject_id", "s-1".to_string()),
                ("page", "2".to_string()),
            ]
        );
        assert!(ModuleFilter::default().query_pairs().is_empty());
    }

    #[test]
    fn submission_timestamp_parses() {
        let json = serde_json::json!({
            "student_name": "Ani",
            "total_correct": 1,
            "total_questions": 2,
            "submitted_at": "2026-03-01T10:00:00Z"
        });
        let item: SubmissionItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.submitted_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }
}
