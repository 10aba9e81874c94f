//! Core trait definitions for the backend collaborator and side channels.
//!
//! `QuizBackend` is implemented by the HTTP client in `lessonrun-client`
//! (and by its `MockBackend` for tests). The runner only ever sees these
//! traits, injected as `Arc<dyn ...>`.

use async_trait::async_trait;

use crate::error::QuizError;
use crate::model::{
    AnswerOutcome, AttemptStart, FinalScore, Module, ModuleFilter, ModulePage, ModuleSubmissions,
    Question,
};

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The REST backend that owns modules, attempts and grading.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Look up a module by slug.
    async fn get_module(&self, module_slug: &str) -> Result<Module, QuizError>;

    /// Create an attempt for `student_name`.
    async fn create_attempt(
        &self,
        module_slug: &str,
        student_name: &str,
    ) -> Result<AttemptStart, QuizError>;

    /// Fetch one question, without correctness flags.
    async fn get_question(
        &self,
        module_slug: &str,
        question_slug: &str,
    ) -> Result<Question, QuizError>;

    /// Submit a single choice for a single question of an attempt.
    async fn submit_answer(
        &self,
        module_slug: &str,
        attempt_code: &str,
        question_slug: &str,
        choice_id: &str,
    ) -> Result<AnswerOutcome, QuizError>;

    /// Close the attempt and obtain its terminal score.
    async fn finalize(&self, module_slug: &str, attempt_code: &str)
        -> Result<FinalScore, QuizError>;

    /// List modules of the authenticated author.
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<ModulePage, QuizError>;

    /// Flip a module's published flag.
    async fn toggle_publish(&self, module_slug: &str) -> Result<(), QuizError>;

    /// Delete a module with its questions.
    async fn delete_module(&self, module_slug: &str) -> Result<(), QuizError>;

    /// Submissions grouped by module.
    async fn list_submissions(&self) -> Result<Vec<ModuleSubmissions>, QuizError>;
}

// ---------------------------------------------------------------------------
// Summary side channel
// ---------------------------------------------------------------------------

/// Shown in place of a summary when generation fails.
pub const SUMMARY_FALLBACK: &str = "Summary is not available right now.";

/// Generates a short study summary from a module description.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Human-readable generator name (e.g. "anthropic").
    fn name(&self) -> &str;

    async fn summarize(&self, module_description: &str) -> anyhow::Result<String>;
}

/// Summary generator used when none is configured; always falls back.
pub struct DisabledSummary;

#[async_trait]
impl SummaryGenerator for DisabledSummary {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn summarize(&self, _module_description: &str) -> anyhow::Result<String> {
        anyhow::bail!("no summary generator configured")
    }
}

// ---------------------------------------------------------------------------
// Location side channel
// ---------------------------------------------------------------------------

/// Receives the current location whenever a question is displayed.
pub trait Navigator: Send + Sync {
    fn show_question(&self, module_slug: &str, question_slug: &str);
}

/// Navigator that ignores location updates.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn show_question(&self, _: &str, _: &str) {}
}

/// Shareable link for a question of a module.
pub fn question_link(public_url: &str, module_slug: &str, question_slug: &str) -> String {
    format!(
        "{}/m/{module_slug}?question={question_slug}",
        public_url.trim_end_matches('/')
    )
}
