//! Quiz session runner.
//!
//! A linear state machine, `Intro -> Quiz -> Results`, driven by explicit
//! transition methods. Every transition takes `&mut self`, so at most one
//! backend call is ever in flight for a runner. A transition that fails
//! leaves the stage exactly as it was and records the error in
//! [`QuizRunner::last_error`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::attempt::{self, Attempt};
use crate::error::QuizError;
use crate::model::{AnswerOutcome, FinalScore, Module, Question};
use crate::session::{SessionRecord, SessionStore};
use crate::traits::{
    DisabledSummary, Navigator, NoopNavigator, QuizBackend, SummaryGenerator, SUMMARY_FALLBACK,
};

/// Where the student is in the quiz.
#[derive(Debug)]
pub enum Stage {
    /// Waiting for a display name.
    Intro,
    /// Answering questions one at a time.
    Quiz(QuizState),
    /// Every question answered; the score is pending until finalized.
    Results(ResultsState),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Quiz(_) => "quiz",
            Stage::Results(_) => "results",
        }
    }
}

/// Progress of the answer control for the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerState {
    Unanswered,
    /// A check is in flight; the control is locked.
    Submitting,
    Answered(AnswerOutcome),
}

#[derive(Debug)]
pub struct QuizState {
    attempt: Attempt,
    question: Question,
    index: usize,
    selected: Option<String>,
    answer: AnswerState,
}

impl QuizState {
    pub fn attempt_code(&self) -> &str {
        &self.attempt.code
    }

    pub fn student_name(&self) -> &str {
        &self.attempt.student_name
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Zero-based position of the current question.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn answer(&self) -> &AnswerState {
        &self.answer
    }

    /// The answer control accepts input only before a check is issued.
    pub fn is_locked(&self) -> bool {
        !matches!(self.answer, AnswerState::Unanswered)
    }

    /// `true` once the last question has been answered.
    pub fn is_last(&self) -> bool {
        matches!(
            &self.answer,
            AnswerState::Answered(outcome) if outcome.next_question_slug.is_none()
        )
    }
}

/// Summary side channel as seen from the results screen.
#[derive(Debug)]
pub enum SummaryState {
    /// The module has no description to summarize.
    Unavailable,
    NotStarted,
    Pending(JoinHandle<String>),
    Ready(String),
}

#[derive(Debug)]
pub struct ResultsState {
    attempt: Attempt,
    last_index: usize,
    score: Option<FinalScore>,
    summary: SummaryState,
}

impl ResultsState {
    pub fn student_name(&self) -> &str {
        &self.attempt.student_name
    }

    /// `None` while finalization has not resolved.
    pub fn score(&self) -> Option<&FinalScore> {
        self.score.as_ref()
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }
}

/// How [`QuizRunner::mount`] left the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// No usable record; the runner waits in intro.
    Fresh,
    /// Jumped straight into the quiz at the stored index.
    Resumed { index: usize },
    /// The stored question no longer exists; the record was dropped.
    Discarded,
}

fn invalid(action: &'static str, stage: &'static str) -> QuizError {
    QuizError::InvalidTransition { action, stage }
}

/// Drives one student through one module.
pub struct QuizRunner {
    module: Module,
    backend: Arc<dyn QuizBackend>,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    summary: Arc<dyn SummaryGenerator>,
    stage: Stage,
    mounted: bool,
    last_error: Option<QuizError>,
}

impl QuizRunner {
    pub fn new(module: Module, backend: Arc<dyn QuizBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            module,
            backend,
            store,
            navigator: Arc::new(NoopNavigator),
            summary: Arc::new(DisabledSummary),
            stage: Stage::Intro,
            mounted: false,
            last_error: None,
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_summary(mut self, summary: Arc<dyn SummaryGenerator>) -> Self {
        self.summary = summary;
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn last_error(&self) -> Option<&QuizError> {
        self.last_error.as_ref()
    }

    /// Fraction of questions behind the student.
    ///
    /// Reads `index / total` during the quiz and only reaches 1.0 once the
    /// final score has been received.
    pub fn progress(&self) -> f64 {
        let total = self.module.question_count;
        if total == 0 {
            return 0.0;
        }
        let done = match &self.stage {
            Stage::Intro => 0,
            Stage::Quiz(quiz) => quiz.index,
            Stage::Results(results) if results.score.is_some() => total,
            Stage::Results(results) => results.last_index,
        };
        (done as f64 / total as f64).min(1.0)
    }

    fn record<T>(&mut self, result: Result<T, QuizError>) -> Result<T, QuizError> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.clone()),
        }
        result
    }

    /// Resume a stored attempt for this module, if there is one.
    ///
    /// Only the first call does anything; later calls report `Fresh`.
    pub async fn mount(&mut self) -> Result<MountOutcome, QuizError> {
        if self.mounted || !matches!(self.stage, Stage::Intro) {
            return Ok(MountOutcome::Fresh);
        }
        self.mounted = true;

        let Some(record) = self.store.load(&self.module.id) else {
            return Ok(MountOutcome::Fresh);
        };

        let fetched = attempt::fetch_question(
            self.backend.as_ref(),
            self.navigator.as_ref(),
            &self.module.slug,
            &record.question_slug,
        )
        .await;

        match fetched {
            Ok(question) => {
                info!(
                    attempt = %record.attempt_code,
                    index = record.question_index,
                    "resuming attempt"
                );
                let index = record.question_index;
                self.stage = Stage::Quiz(QuizState {
                    attempt: Attempt {
                        code: record.attempt_code,
                        student_name: record.student_name,
                    },
                    question,
                    index,
                    selected: None,
                    answer: AnswerState::Unanswered,
                });
                self.last_error = None;
                Ok(MountOutcome::Resumed { index })
            }
            Err(e) if e.is_not_found() => {
                info!(question = %record.question_slug, "stored question is gone; starting fresh");
                self.store.clear();
                Ok(MountOutcome::Discarded)
            }
            Err(e) => self.record(Err(e)),
        }
    }

    /// Create an attempt for `student_name` and load the first question.
    pub async fn start(&mut self, student_name: &str) -> Result<(), QuizError> {
        if !matches!(self.stage, Stage::Intro) {
            return Err(invalid("start", self.stage.name()));
        }
        let result = self.start_inner(student_name.trim()).await;
        self.record(result)
    }

    async fn start_inner(&mut self, student_name: &str) -> Result<(), QuizError> {
        if student_name.is_empty() {
            return Err(QuizError::validation("Please enter your name."));
        }
        if self.module.question_count == 0 {
            return Err(QuizError::validation("This module has no questions yet."));
        }

        let started = self
            .backend
            .create_attempt(&self.module.slug, student_name)
            .await?;
        let question = attempt::fetch_question(
            self.backend.as_ref(),
            self.navigator.as_ref(),
            &self.module.slug,
            &started.first_question_slug,
        )
        .await?;

        self.store.save(&SessionRecord {
            attempt_code: started.code.clone(),
            module_id: self.module.id.clone(),
            student_name: student_name.to_string(),
            question_slug: question.slug.clone(),
            question_index: 0,
        });
        debug!(attempt = %started.code, "attempt started");

        self.stage = Stage::Quiz(QuizState {
            attempt: Attempt {
                code: started.code,
                student_name: student_name.to_string(),
            },
            question,
            index: 0,
            selected: None,
            answer: AnswerState::Unanswered,
        });
        Ok(())
    }

    /// Pick a choice for the current question.
    pub fn select(&mut self, choice_id: &str) -> Result<(), QuizError> {
        let stage = self.stage.name();
        let Stage::Quiz(quiz) = &mut self.stage else {
            return Err(invalid("select", stage));
        };
        if quiz.is_locked() {
            return Err(invalid("select", "answered"));
        }
        if quiz.question.choice(choice_id).is_none() {
            return Err(QuizError::validation(format!("Unknown choice '{choice_id}'.")));
        }
        quiz.selected = Some(choice_id.to_string());
        Ok(())
    }

    /// Submit the selected choice and reveal whether it was correct.
    ///
    /// The control locks before the request goes out. A second check for the
    /// same question is rejected without contacting the backend.
    pub async fn check(&mut self) -> Result<AnswerOutcome, QuizError> {
        let stage = self.stage.name();
        let Stage::Quiz(quiz) = &mut self.stage else {
            return Err(invalid("check", stage));
        };
        if quiz.is_locked() {
            return Err(invalid("check", "answered"));
        }
        let Some(choice_id) = quiz.selected.clone() else {
            return Err(QuizError::validation("Choose an answer first."));
        };

        quiz.answer = AnswerState::Submitting;
        let result = attempt::evaluate_answer(
            self.backend.as_ref(),
            self.store.as_ref(),
            &self.module,
            &quiz.attempt,
            &quiz.question.slug,
            quiz.index,
            &choice_id,
        )
        .await;

        quiz.answer = match &result {
            Ok(outcome) => AnswerState::Answered(outcome.clone()),
            Err(_) => AnswerState::Unanswered,
        };
        self.record(result)
    }

    /// Move past an answered question.
    ///
    /// Loads the next question when there is one; otherwise enters
    /// [`Stage::Results`] with the score pending until [`finish`](Self::finish).
    pub async fn advance(&mut self) -> Result<(), QuizError> {
        let stage = self.stage.name();
        let Stage::Quiz(quiz) = &mut self.stage else {
            return Err(invalid("advance", stage));
        };
        let AnswerState::Answered(outcome) = &quiz.answer else {
            return Err(QuizError::validation("Check your answer first."));
        };

        if let Some(next) = outcome.next_question_slug.clone() {
            let fetched = attempt::fetch_question(
                self.backend.as_ref(),
                self.navigator.as_ref(),
                &self.module.slug,
                &next,
            )
            .await;
            if let Ok(question) = &fetched {
                quiz.question = question.clone();
                quiz.index += 1;
                quiz.selected = None;
                quiz.answer = AnswerState::Unanswered;
            }
            return self.record(fetched.map(|_| ()));
        }

        let summary = if self.module.summary_source().is_some() {
            SummaryState::NotStarted
        } else {
            SummaryState::Unavailable
        };
        if let Stage::Quiz(quiz) = std::mem::replace(&mut self.stage, Stage::Intro) {
            self.stage = Stage::Results(ResultsState {
                attempt: quiz.attempt,
                last_index: quiz.index,
                score: None,
                summary,
            });
        }
        self.last_error = None;
        Ok(())
    }

    /// Finalize the attempt and obtain the authoritative score.
    ///
    /// Also kicks off the summary side channel, which never affects the
    /// outcome of this call. On failure the score stays pending and the
    /// session record is left alone, so calling again retries.
    pub async fn finish(&mut self) -> Result<FinalScore, QuizError> {
        let stage = self.stage.name();
        let Stage::Results(results) = &mut self.stage else {
            return Err(invalid("finish", stage));
        };
        if let Some(score) = &results.score {
            return Ok(score.clone());
        }

        if matches!(results.summary, SummaryState::NotStarted) {
            if let Some(description) = self.module.summary_source() {
                results.summary = SummaryState::Pending(attempt::spawn_summary(
                    Arc::clone(&self.summary),
                    description.to_string(),
                ));
            }
        }

        let result = attempt::finalize_attempt(
            self.backend.as_ref(),
            self.store.as_ref(),
            &self.module.slug,
            &results.attempt.code,
        )
        .await;
        if let Ok(score) = &result {
            info!(score = %score, "attempt finalized");
            results.score = Some(score.clone());
        }
        self.record(result)
    }

    /// Wait for the summary side channel and return its text.
    ///
    /// `None` outside the results stage, when the module has nothing to
    /// summarize, or before [`finish`](Self::finish) has started it.
    pub async fn summary(&mut self) -> Option<&str> {
        let Stage::Results(results) = &mut self.stage else {
            return None;
        };
        if let SummaryState::Pending(handle) = &mut results.summary {
            let text = handle.await.unwrap_or_else(|e| {
                tracing::warn!("summary task failed: {e}");
                SUMMARY_FALLBACK.to_string()
            });
            results.summary = SummaryState::Ready(text);
        }
        match &results.summary {
            SummaryState::Ready(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Drop all progress, in memory and persisted, and return to intro.
    pub fn restart(&mut self) {
        if let Stage::Results(ResultsState {
            summary: SummaryState::Pending(handle),
            ..
        }) = &self.stage
        {
            handle.abort();
        }
        if !matches!(self.stage, Stage::Intro) {
            debug!(from = self.stage.name(), "restarting");
        }
        self.stage = Stage::Intro;
        self.last_error = None;
        self.store.clear();
    }
}
