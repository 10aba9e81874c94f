//! Backend-facing steps of a quiz attempt.
//!
//! Each step is a free function over the injected collaborators so the
//! runner can call it while holding a mutable borrow of its own stage.
//! None of them retry; a failure is returned untouched and leaves the
//! session store as it was.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::QuizError;
use crate::model::{AnswerOutcome, FinalScore, Module, Question};
use crate::session::{SessionRecord, SessionStore};
use crate::traits::{Navigator, QuizBackend, SummaryGenerator, SUMMARY_FALLBACK};

/// Identity of a started attempt, as the runner carries it between steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub code: String,
    pub student_name: String,
}

/// Fetch a module that students are allowed to take.
///
/// Unpublished modules are reported as not found, like missing ones.
pub async fn load_published_module(
    backend: &dyn QuizBackend,
    module_slug: &str,
) -> Result<Module, QuizError> {
    let module = backend.get_module(module_slug).await?;
    if !module.published {
        return Err(QuizError::NotFound(format!("Module '{module_slug}'")));
    }
    Ok(module)
}

/// Retrieve one question and publish its location.
#[instrument(skip(backend, navigator))]
pub async fn fetch_question(
    backend: &dyn QuizBackend,
    navigator: &dyn Navigator,
    module_slug: &str,
    question_slug: &str,
) -> Result<Question, QuizError> {
    let question = backend.get_question(module_slug, question_slug).await?;
    navigator.show_question(module_slug, &question.slug);
    Ok(question)
}

/// Submit `choice_id` for the question at `index` and move the stored
/// pointer accordingly.
///
/// With a next question the record is rewritten to point at it; without one
/// the record is cleared, leaving finalize as the only way forward.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(backend, store, module, attempt), fields(module = %module.slug))]
pub async fn evaluate_answer(
    backend: &dyn QuizBackend,
    store: &dyn SessionStore,
    module: &Module,
    attempt: &Attempt,
    question_slug: &str,
    index: usize,
    choice_id: &str,
) -> Result<AnswerOutcome, QuizError> {
    let outcome = backend
        .submit_answer(&module.slug, &attempt.code, question_slug, choice_id)
        .await?;

    match &outcome.next_question_slug {
        Some(next) => store.save(&SessionRecord {
            attempt_code: attempt.code.clone(),
            module_id: module.id.clone(),
            student_name: attempt.student_name.clone(),
            question_slug: next.clone(),
            question_index: index + 1,
        }),
        None => {
            debug!("last question answered; clearing session record");
            store.clear();
        }
    }

    Ok(outcome)
}

/// Close the attempt. The stored record is cleared only on success.
#[instrument(skip(backend, store))]
pub async fn finalize_attempt(
    backend: &dyn QuizBackend,
    store: &dyn SessionStore,
    module_slug: &str,
    attempt_code: &str,
) -> Result<FinalScore, QuizError> {
    let score = backend.finalize(module_slug, attempt_code).await?;
    store.clear();
    Ok(score)
}

/// Start summary generation on its own task.
///
/// The task always yields text: generator errors become [`SUMMARY_FALLBACK`].
pub fn spawn_summary(generator: Arc<dyn SummaryGenerator>, description: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        match generator.summarize(&description).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                warn!(generator = generator.name(), "summary generator returned nothing");
                SUMMARY_FALLBACK.to_string()
            }
            Err(e) => {
                warn!(generator = generator.name(), "summary generation failed: {e:#}");
                SUMMARY_FALLBACK.to_string()
            }
        }
    })
}
