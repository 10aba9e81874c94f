//! Mock backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use lessonrun_core::model::{
    AnswerOutcome, AttemptStart, Choice, FinalScore, Module, ModuleFilter, ModulePage, ModuleRef,
    ModuleSubmissions, Pagination, Question, SubmissionItem,
};
use lessonrun_core::traits::QuizBackend;
use lessonrun_core::QuizError;

/// Backend operations, used to count calls and script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    GetModule,
    CreateAttempt,
    GetQuestion,
    SubmitAnswer,
    Finalize,
    ListModules,
    TogglePublish,
    DeleteModule,
    ListSubmissions,
}

struct MockQuestion {
    question: Question,
    correct_choice_id: String,
}

#[derive(Default)]
struct MockAttempt {
    student_name: String,
    answers: HashMap<String, bool>,
    finalized: bool,
}

/// An in-memory backend serving a single module.
///
/// Grades answers like the real backend: one scored answer per question per
/// attempt, score counted at finalize.
pub struct MockBackend {
    module: Mutex<Module>,
    questions: Mutex<Vec<MockQuestion>>,
    attempts: Mutex<HashMap<String, MockAttempt>>,
    /// One-shot failures keyed by operation.
    failures: Mutex<HashMap<Call, QuizError>>,
    calls: Mutex<HashMap<Call, u32>>,
    next_code: AtomicU32,
    deleted: AtomicBool,
}

impl MockBackend {
    /// Create a backend serving `module` with no questions yet.
    pub fn new(module: Module) -> Self {
        Self {
            module: Mutex::new(Module {
                question_count: 0,
                ..module
            }),
            questions: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            next_code: AtomicU32::new(1),
            deleted: AtomicBool::new(false),
        }
    }

    /// Append a question. `choices` are `(id, content)` pairs.
    pub fn with_question(self, slug: &str, content: &str, choices: &[(&str, &str)], correct: &str) -> Self {
        {
            let mut questions = self.questions.lock().unwrap();
            let id = (questions.len() + 1).to_string();
            questions.push(MockQuestion {
                question: Question {
                    id,
                    slug: slug.to_string(),
                    content: content.to_string(),
                    choices: choices
                        .iter()
                        .map(|(id, content)| Choice {
                            id: id.to_string(),
                            content: content.to_string(),
                        })
                        .collect(),
                },
                correct_choice_id: correct.to_string(),
            });
            self.module.lock().unwrap().question_count = questions.len();
        }
        self
    }

    /// A published two-question module about fractions.
    pub fn sample() -> Self {
        Self::new(Module {
            id: "mod-fractions".into(),
            slug: "fractions".into(),
            title: "Fractions".into(),
            description: Some("Adding and comparing simple fractions.".into()),
            published: true,
            question_count: 0,
            subject: None,
            grade: None,
        })
        .with_question(
            "half-plus-half",
            "1/2 + 1/2 = ?",
            &[("a", "1"), ("b", "2"), ("c", "1/4")],
            "a",
        )
        .with_question(
            "bigger-fraction",
            "Which is bigger?",
            &[("a", "1/3"), ("b", "1/4")],
            "a",
        )
    }

    /// The module as currently stored.
    pub fn module(&self) -> Module {
        self.module.lock().unwrap().clone()
    }

    /// Make the next call of `call` fail with `error`.
    pub fn fail_next(&self, call: Call, error: QuizError) {
        self.failures.lock().unwrap().insert(call, error);
    }

    /// Remove a question, as if an author deleted it.
    pub fn remove_question(&self, slug: &str) {
        let mut questions = self.questions.lock().unwrap();
        questions.retain(|q| q.question.slug != slug);
        self.module.lock().unwrap().question_count = questions.len();
    }

    /// Number of times `call` has been invoked.
    pub fn calls(&self, call: Call) -> u32 {
        self.calls.lock().unwrap().get(&call).copied().unwrap_or(0)
    }

    fn enter(&self, call: Call) -> Result<(), QuizError> {
        *self.calls.lock().unwrap().entry(call).or_insert(0) += 1;
        match self.failures.lock().unwrap().remove(&call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_module(&self, module_slug: &str) -> Result<(), QuizError> {
        if !self.deleted.load(Ordering::Relaxed) && self.module.lock().unwrap().slug == module_slug {
            Ok(())
        } else {
            Err(QuizError::NotFound(format!("Module '{module_slug}'")))
        }
    }
}

#[async_trait]
impl QuizBackend for MockBackend {
    async fn get_module(&self, module_slug: &str) -> Result<Module, QuizError> {
        self.enter(Call::GetModule)?;
        self.check_module(module_slug)?;
        Ok(self.module())
    }

    async fn create_attempt(
        &self,
        module_slug: &str,
        student_name: &str,
    ) -> Result<AttemptStart, QuizError> {
        self.enter(Call::CreateAttempt)?;
        self.check_module(module_slug)?;
        if student_name.trim().is_empty() {
            return Err(QuizError::Validation {
                message: "Validation failed".into(),
                fields: vec!["student_name: is required".into()],
            });
        }
        let first = self
            .questions
            .lock()
            .unwrap()
            .first()
            .map(|q| q.question.slug.clone())
            .ok_or_else(|| QuizError::validation("module has no questions"))?;

        let code = format!("ATT-{}", self.next_code.fetch_add(1, Ordering::Relaxed));
        self.attempts.lock().unwrap().insert(
            code.clone(),
            MockAttempt {
                student_name: student_name.to_string(),
                ..Default::default()
            },
        );
        Ok(AttemptStart {
            code,
            first_question_slug: first,
        })
    }

    async fn get_question(
        &self,
        module_slug: &str,
        question_slug: &str,
    ) -> Result<Question, QuizError> {
        self.enter(Call::GetQuestion)?;
        self.check_module(module_slug)?;
        self.questions
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.question.slug == question_slug)
            .map(|q| q.question.clone())
            .ok_or_else(|| QuizError::NotFound(format!("Question '{question_slug}'")))
    }

    async fn submit_answer(
        &self,
        module_slug: &str,
        attempt_code: &str,
        question_slug: &str,
        choice_id: &str,
    ) -> Result<AnswerOutcome, QuizError> {
        self.enter(Call::SubmitAnswer)?;
        self.check_module(module_slug)?;

        let questions = self.questions.lock().unwrap();
        let position = questions
            .iter()
            .position(|q| q.question.slug == question_slug)
            .ok_or_else(|| QuizError::NotFound(format!("Question '{question_slug}'")))?;
        let entry = &questions[position];
        let correct = entry
            .question
            .choice(&entry.correct_choice_id)
            .cloned()
            .ok_or_else(|| QuizError::Api {
                status: 500,
                message: "question has no correct choice".into(),
            })?;
        if entry.question.choice(choice_id).is_none() {
            return Err(QuizError::validation(format!("unknown choice '{choice_id}'")));
        }

        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .get_mut(attempt_code)
            .filter(|a| !a.finalized)
            .ok_or_else(|| QuizError::NotFound(format!("Submission '{attempt_code}'")))?;
        if attempt.answers.contains_key(question_slug) {
            return Err(QuizError::validation("question already answered"));
        }
        let is_correct = choice_id == correct.id;
        attempt.answers.insert(question_slug.to_string(), is_correct);

        Ok(AnswerOutcome {
            is_correct,
            correct_choice_id: correct.id,
            correct_choice_content: correct.content,
            next_question_slug: questions.get(position + 1).map(|q| q.question.slug.clone()),
        })
    }

    async fn finalize(&self, module_slug: &str, attempt_code: &str) -> Result<FinalScore, QuizError> {
        self.enter(Call::Finalize)?;
        self.check_module(module_slug)?;

        let total = self.questions.lock().unwrap().len() as u32;
        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .get_mut(attempt_code)
            .ok_or_else(|| QuizError::NotFound(format!("Submission '{attempt_code}'")))?;
        attempt.finalized = true;
        Ok(FinalScore {
            student_name: attempt.student_name.clone(),
            score: attempt.answers.values().filter(|c| **c).count() as u32,
            total,
            status: "finalized".into(),
        })
    }

    async fn list_modules(&self, filter: &ModuleFilter) -> Result<ModulePage, QuizError> {
        self.enter(Call::ListModules)?;
        let module = self.module();
        let matches = !self.deleted.load(Ordering::Relaxed)
            && filter
                .keyword
                .as_deref()
                .map(|k| module.title.to_lowercase().contains(&k.to_lowercase()))
                .unwrap_or(true);
        let modules: Vec<Module> = if matches { vec![module] } else { Vec::new() };
        Ok(ModulePage {
            pagination: Pagination {
                page: filter.page.unwrap_or(1),
                per_page: filter.per_page.unwrap_or(10),
                total: modules.len() as u32,
                total_pages: 1,
            },
            modules,
        })
    }

    async fn toggle_publish(&self, module_slug: &str) -> Result<(), QuizError> {
        self.enter(Call::TogglePublish)?;
        self.check_module(module_slug)?;
        let mut module = self.module.lock().unwrap();
        module.published = !module.published;
        Ok(())
    }

    async fn delete_module(&self, module_slug: &str) -> Result<(), QuizError> {
        self.enter(Call::DeleteModule)?;
        self.check_module(module_slug)?;
        self.deleted.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn list_submissions(&self) -> Result<Vec<ModuleSubmissions>, QuizError> {
        self.enter(Call::ListSubmissions)?;
        let module = self.module();
        let total = self.questions.lock().unwrap().len() as u32;
        let submissions: Vec<SubmissionItem> = self
            .attempts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.finalized)
            .map(|a| SubmissionItem {
                student_name: a.student_name.clone(),
                total_correct: a.answers.values().filter(|c| **c).count() as u32,
                total_questions: total,
                submitted_at: Utc::now(),
            })
            .collect();
        Ok(vec![ModuleSubmissions {
            module: ModuleRef {
                id: module.id,
                title: module.title,
                slug: module.slug,
                grade: module.grade,
                subject: module.subject,
            },
            total_submissions: submissions.len() as u32,
            submissions,
        }])
    }
}
