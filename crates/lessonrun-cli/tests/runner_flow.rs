//! End-to-end runner tests against the in-memory mock backend.
//!
//! These walk the quiz runner through complete attempts, reloads and
//! failure injection, checking both the visible stage and what ends up in
//! the session store.

use std::sync::Arc;

use async_trait::async_trait;

use lessonrun_client::mock::{Call, MockBackend};
use lessonrun_core::attempt::{finalize_attempt, load_published_module};
use lessonrun_core::model::Module;
use lessonrun_core::publish::{PublishState, PublishToggle};
use lessonrun_core::runner::{AnswerState, SummaryState};
use lessonrun_core::traits::{SummaryGenerator, SUMMARY_FALLBACK};
use lessonrun_core::{
    MemorySessionStore, MountOutcome, QuizError, QuizRunner, SessionRecord, SessionStore, Stage,
};

fn setup() -> (Arc<MockBackend>, Arc<MemorySessionStore>, QuizRunner) {
    let backend = Arc::new(MockBackend::sample());
    let store = Arc::new(MemorySessionStore::new());
    let runner = QuizRunner::new(backend.module(), backend.clone(), store.clone());
    (backend, store, runner)
}

fn reload(backend: &Arc<MockBackend>, store: &Arc<MemorySessionStore>) -> QuizRunner {
    QuizRunner::new(backend.module(), backend.clone(), store.clone())
}

fn current_slug(runner: &QuizRunner) -> String {
    match runner.stage() {
        Stage::Quiz(quiz) => quiz.question().slug.clone(),
        other => panic!("expected quiz stage, got {}", other.name()),
    }
}

struct FixedSummary(&'static str);

#[async_trait]
impl SummaryGenerator for FixedSummary {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn summarize(&self, _: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct BrokenSummary;

#[async_trait]
impl SummaryGenerator for BrokenSummary {
    fn name(&self) -> &str {
        "broken"
    }

    async fn summarize(&self, _: &str) -> anyhow::Result<String> {
        anyhow::bail!("model overloaded")
    }
}

// --- Full attempts ---

#[tokio::test]
async fn two_question_attempt_shows_backend_score() {
    let (backend, store, mut runner) = setup();
    assert_eq!(runner.mount().await.unwrap(), MountOutcome::Fresh);

    runner.start("  Ani ").await.unwrap();
    assert_eq!(current_slug(&runner), "half-plus-half");
    assert_eq!(runner.progress(), 0.0);
    let saved = store.load("mod-fractions").unwrap();
    assert_eq!(saved.student_name, "Ani");
    assert_eq!(saved.question_index, 0);

    runner.select("a").unwrap();
    let first = runner.check().await.unwrap();
    assert!(first.is_correct);
    let saved = store.load("mod-fractions").unwrap();
    assert_eq!(saved.question_slug, "bigger-fraction");
    assert_eq!(saved.question_index, 1);

    runner.advance().await.unwrap();
    assert_eq!(current_slug(&runner), "bigger-fraction");
    assert_eq!(runner.progress(), 0.5);

    runner.select("b").unwrap();
    let second = runner.check().await.unwrap();
    assert!(!second.is_correct);
    assert_eq!(second.correct_choice_content, "1/3");
    assert!(store.is_empty(), "no next question clears the record");

    runner.advance().await.unwrap();
    match runner.stage() {
        Stage::Results(results) => assert!(results.score().is_none(), "score pending"),
        other => panic!("expected results, got {}", other.name()),
    }
    assert!(runner.progress() < 1.0);

    let score = runner.finish().await.unwrap();
    assert_eq!(score.to_string(), "1/2");
    assert_eq!(score.student_name, "Ani");
    assert_eq!(runner.progress(), 1.0);
    assert_eq!(backend.calls(Call::Finalize), 1);
}

#[tokio::test]
async fn summary_side_channel_reports_text() {
    let (_backend, _store, runner) = setup();
    let mut runner = runner.with_summary(Arc::new(FixedSummary("Halves make a whole.")));

    runner.start("Ani").await.unwrap();
    for choice in ["a", "a"] {
        runner.select(choice).unwrap();
        runner.check().await.unwrap();
        runner.advance().await.unwrap();
    }
    runner.finish().await.unwrap();
    assert_eq!(runner.summary().await, Some("Halves make a whole."));
}

#[tokio::test]
async fn summary_failure_never_blocks_finalize() {
    let (_backend, _store, runner) = setup();
    let mut runner = runner.with_summary(Arc::new(BrokenSummary));

    runner.start("Ani").await.unwrap();
    for choice in ["a", "b"] {
        runner.select(choice).unwrap();
        runner.check().await.unwrap();
        runner.advance().await.unwrap();
    }
    let score = runner.finish().await.unwrap();
    assert_eq!(score.score, 1);
    assert_eq!(runner.summary().await, Some(SUMMARY_FALLBACK));
}

#[tokio::test]
async fn module_without_description_has_no_summary() {
    let backend = Arc::new(MockBackend::new(Module {
        id: "mod-plain".into(),
        slug: "plain".into(),
        title: "Plain".into(),
        description: None,
        published: true,
        question_count: 0,
        subject: None,
        grade: None,
    })
    .with_question("only", "2 + 2 = ?", &[("x", "4"), ("y", "5")], "x"));
    let store = Arc::new(MemorySessionStore::new());
    let mut runner = QuizRunner::new(backend.module(), backend.clone(), store.clone())
        .with_summary(Arc::new(FixedSummary("unused")));

    runner.start("Ani").await.unwrap();
    runner.select("x").unwrap();
    runner.check().await.unwrap();
    runner.advance().await.unwrap();
    runner.finish().await.unwrap();

    match runner.stage() {
        Stage::Results(results) => assert!(matches!(results.summary(), SummaryState::Unavailable)),
        other => panic!("expected results, got {}", other.name()),
    }
    assert_eq!(runner.summary().await, None);
}

// --- Answer control ---

#[tokio::test]
async fn second_check_sends_no_request() {
    let (backend, _store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    runner.select("a").unwrap();
    runner.check().await.unwrap();

    let err = runner.check().await.unwrap_err();
    assert!(matches!(err, QuizError::InvalidTransition { .. }));
    assert!(runner.select("b").is_err(), "control stays locked");
    assert_eq!(backend.calls(Call::SubmitAnswer), 1);
}

#[tokio::test]
async fn failed_check_unlocks_control() {
    let (backend, store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    let before = store.load("mod-fractions");

    backend.fail_next(Call::SubmitAnswer, QuizError::Network("connection reset".into()));
    runner.select("a").unwrap();
    let err = runner.check().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(runner.last_error(), Some(&err));
    assert_eq!(store.load("mod-fractions"), before, "store untouched on failure");
    match runner.stage() {
        Stage::Quiz(quiz) => assert_eq!(quiz.answer(), &AnswerState::Unanswered),
        other => panic!("expected quiz, got {}", other.name()),
    }

    runner.check().await.unwrap();
    assert!(runner.last_error().is_none());
    assert_eq!(backend.calls(Call::SubmitAnswer), 2);
}

#[tokio::test]
async fn check_requires_a_selection() {
    let (backend, _store, mut runner) = setup();
    runner.start("Ani").await.unwrap();

    assert!(matches!(
        runner.check().await,
        Err(QuizError::Validation { .. })
    ));
    assert!(matches!(
        runner.select("zzz"),
        Err(QuizError::Validation { .. })
    ));
    assert_eq!(backend.calls(Call::SubmitAnswer), 0);
}

#[tokio::test]
async fn failed_advance_stays_on_answered_question() {
    let (backend, _store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    runner.select("a").unwrap();
    runner.check().await.unwrap();

    backend.fail_next(Call::GetQuestion, QuizError::Network("timeout".into()));
    assert!(runner.advance().await.is_err());
    assert_eq!(current_slug(&runner), "half-plus-half");

    runner.advance().await.unwrap();
    assert_eq!(current_slug(&runner), "bigger-fraction");
}

// --- Intro ---

#[tokio::test]
async fn blank_name_is_rejected_locally() {
    let (backend, store, mut runner) = setup();

    let err = runner.start("   ").await.unwrap_err();
    assert!(matches!(err, QuizError::Validation { .. }));
    assert!(matches!(runner.stage(), Stage::Intro));
    assert_eq!(backend.calls(Call::CreateAttempt), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_start_stays_in_intro() {
    let (backend, store, mut runner) = setup();
    backend.fail_next(Call::CreateAttempt, QuizError::Network("offline".into()));

    assert!(runner.start("Ani").await.is_err());
    assert!(matches!(runner.stage(), Stage::Intro));
    assert!(store.is_empty());

    runner.start("Ani").await.unwrap();
    assert!(matches!(runner.stage(), Stage::Quiz(_)));
}

#[tokio::test]
async fn module_without_questions_cannot_start() {
    let backend = Arc::new(MockBackend::new(Module {
        id: "mod-empty".into(),
        slug: "empty".into(),
        title: "Empty".into(),
        description: None,
        published: true,
        question_count: 0,
        subject: None,
        grade: None,
    }));
    let store = Arc::new(MemorySessionStore::new());
    let mut runner = QuizRunner::new(backend.module(), backend.clone(), store);

    assert!(matches!(
        runner.start("Ani").await,
        Err(QuizError::Validation { .. })
    ));
    assert_eq!(backend.calls(Call::CreateAttempt), 0);
}

#[tokio::test]
async fn transitions_from_wrong_stage_are_rejected() {
    let (backend, _store, mut runner) = setup();

    assert!(matches!(
        runner.finish().await,
        Err(QuizError::InvalidTransition {
            action: "finish",
            stage: "intro"
        })
    ));
    assert!(matches!(
        runner.advance().await,
        Err(QuizError::InvalidTransition { .. })
    ));

    runner.start("Ani").await.unwrap();
    assert!(matches!(
        runner.advance().await,
        Err(QuizError::Validation { .. })
    ));
    assert!(matches!(
        runner.start("Budi").await,
        Err(QuizError::InvalidTransition { .. })
    ));
    assert_eq!(backend.calls(Call::Finalize), 0);
    assert_eq!(backend.calls(Call::CreateAttempt), 1);
}

// --- Resume on load ---

#[tokio::test]
async fn reload_resumes_at_stored_question() {
    let (backend, store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    runner.select("a").unwrap();
    runner.check().await.unwrap();
    drop(runner);

    let mut reloaded = reload(&backend, &store);
    assert_eq!(
        reloaded.mount().await.unwrap(),
        MountOutcome::Resumed { index: 1 }
    );
    match reloaded.stage() {
        Stage::Quiz(quiz) => {
            assert_eq!(quiz.student_name(), "Ani");
            assert_eq!(quiz.index(), 1);
            assert_eq!(quiz.question().slug, "bigger-fraction");
            assert!(!quiz.is_locked());
        }
        other => panic!("expected quiz, got {}", other.name()),
    }
    assert_eq!(backend.calls(Call::CreateAttempt), 1, "no new attempt");

    reloaded.select("a").unwrap();
    reloaded.check().await.unwrap();
    reloaded.advance().await.unwrap();
    assert_eq!(reloaded.finish().await.unwrap().to_string(), "2/2");
}

#[tokio::test]
async fn record_for_another_module_is_ignored() {
    let (backend, store, mut runner) = setup();
    store.save(&SessionRecord {
        attempt_code: "ATT-77".into(),
        module_id: "mod-other".into(),
        student_name: "Budi".into(),
        question_slug: "bigger-fraction".into(),
        question_index: 1,
    });

    assert_eq!(runner.mount().await.unwrap(), MountOutcome::Fresh);
    assert!(matches!(runner.stage(), Stage::Intro));
    assert_eq!(backend.calls(Call::GetQuestion), 0);
}

#[tokio::test]
async fn removed_question_discards_record() {
    let (backend, store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    runner.select("a").unwrap();
    runner.check().await.unwrap();

    backend.remove_question("bigger-fraction");
    let mut reloaded = reload(&backend, &store);
    assert_eq!(reloaded.mount().await.unwrap(), MountOutcome::Discarded);
    assert!(matches!(reloaded.stage(), Stage::Intro));
    assert!(store.is_empty());
}

#[tokio::test]
async fn transient_resume_failure_keeps_record() {
    let (backend, store, mut runner) = setup();
    runner.start("Ani").await.unwrap();

    backend.fail_next(Call::GetQuestion, QuizError::Network("offline".into()));
    let mut reloaded = reload(&backend, &store);
    assert!(reloaded.mount().await.is_err());
    assert!(matches!(reloaded.stage(), Stage::Intro));
    assert!(store.load("mod-fractions").is_some());

    let mut again = reload(&backend, &store);
    assert_eq!(
        again.mount().await.unwrap(),
        MountOutcome::Resumed { index: 0 }
    );
}

#[tokio::test]
async fn corrupt_record_starts_fresh() {
    let (_backend, store, mut runner) = setup();
    store.put_raw("{\"attempt_code\": 42");
    assert_eq!(runner.mount().await.unwrap(), MountOutcome::Fresh);
}

// --- Finalize ---

#[tokio::test]
async fn failed_finalize_keeps_pending_score_and_retries() {
    let (backend, _store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    for choice in ["a", "b"] {
        runner.select(choice).unwrap();
        runner.check().await.unwrap();
        runner.advance().await.unwrap();
    }

    backend.fail_next(
        Call::Finalize,
        QuizError::Api {
            status: 503,
            message: "maintenance".into(),
        },
    );
    assert!(runner.finish().await.is_err());
    match runner.stage() {
        Stage::Results(results) => assert!(results.score().is_none()),
        other => panic!("expected results, got {}", other.name()),
    }

    let score = runner.finish().await.unwrap();
    assert_eq!(score.to_string(), "1/2");
    assert_eq!(backend.calls(Call::Finalize), 2);

    // Already finalized: no further request.
    runner.finish().await.unwrap();
    assert_eq!(backend.calls(Call::Finalize), 2);
}

#[tokio::test]
async fn finalize_clears_store_only_on_success() {
    let backend = MockBackend::sample();
    let store = MemorySessionStore::new();
    let start = {
        use lessonrun_core::traits::QuizBackend;
        backend.create_attempt("fractions", "Ani").await.unwrap()
    };
    let record = SessionRecord {
        attempt_code: start.code.clone(),
        module_id: "mod-fractions".into(),
        student_name: "Ani".into(),
        question_slug: "half-plus-half".into(),
        question_index: 0,
    };
    store.save(&record);

    backend.fail_next(Call::Finalize, QuizError::Network("offline".into()));
    assert!(finalize_attempt(&backend, &store, "fractions", &start.code)
        .await
        .is_err());
    assert_eq!(store.load("mod-fractions"), Some(record));

    finalize_attempt(&backend, &store, "fractions", &start.code)
        .await
        .unwrap();
    assert!(store.is_empty());
}

// --- Restart ---

#[tokio::test]
async fn restart_is_idempotent() {
    let (backend, store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    assert!(!store.is_empty());

    runner.restart();
    assert!(matches!(runner.stage(), Stage::Intro));
    assert!(store.is_empty());
    assert_eq!(runner.progress(), 0.0);

    runner.restart();
    assert!(matches!(runner.stage(), Stage::Intro));
    assert!(store.is_empty());
    assert_eq!(backend.calls(Call::CreateAttempt), 1);
}

#[tokio::test]
async fn restart_from_results_allows_new_attempt() {
    let (backend, _store, mut runner) = setup();
    runner.start("Ani").await.unwrap();
    for choice in ["a", "a"] {
        runner.select(choice).unwrap();
        runner.check().await.unwrap();
        runner.advance().await.unwrap();
    }
    runner.finish().await.unwrap();

    runner.restart();
    runner.start("Ani").await.unwrap();
    assert_eq!(current_slug(&runner), "half-plus-half");
    assert_eq!(backend.calls(Call::CreateAttempt), 2);
}

// --- Catalogue ---

#[tokio::test]
async fn unpublished_module_is_not_found() {
    let backend = MockBackend::sample();
    let mut toggle = PublishToggle::new("fractions", true);
    assert!(!toggle.toggle(&backend).await.unwrap());
    assert_eq!(toggle.state(), &PublishState::Confirmed(false));

    let err = load_published_module(&backend, "fractions")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_publish_toggle_rolls_back() {
    let backend = MockBackend::sample();
    backend.fail_next(
        Call::TogglePublish,
        QuizError::NotFound("Module 'fractions'".into()),
    );

    let mut toggle = PublishToggle::new("fractions", true);
    assert!(toggle.toggle(&backend).await.is_err());
    match toggle.state() {
        PublishState::RolledBack { value, reason } => {
            assert!(*value);
            assert_eq!(reason, "Module 'fractions' was not found.");
        }
        other => panic!("expected rollback, got {other:?}"),
    }
    assert!(backend.module().published);
}
