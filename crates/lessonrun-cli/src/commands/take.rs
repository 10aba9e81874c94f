//! The `lessonrun take` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use lessonrun_client::config::load_config_from;
use lessonrun_client::{create_backend, create_session_store, create_summary};
use lessonrun_core::attempt::load_published_module;
use lessonrun_core::runner::{AnswerState, QuizState};
use lessonrun_core::traits::{question_link, Navigator};
use lessonrun_core::{MountOutcome, QuizError, QuizRunner, Stage};

/// Prints a resumable link whenever a question is shown.
struct ConsoleNavigator {
    public_url: String,
}

impl Navigator for ConsoleNavigator {
    fn show_question(&self, module_slug: &str, question_slug: &str) {
        tracing::info!(
            link = %question_link(&self.public_url, module_slug, question_slug),
            "question loaded"
        );
    }
}

/// Line-oriented reader over stdin.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `label` and read one trimmed line; `None` at end of input.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        eprint!("{label}");
        let line = self
            .lines
            .next_line()
            .await
            .context("failed to read from stdin")?;
        Ok(line.map(|l| l.trim().to_string()))
    }
}

pub async fn execute(
    module_slug: String,
    name: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = Arc::new(create_backend(&config)?);
    let store = Arc::new(create_session_store(&config));
    let summary = create_summary(&config)?;

    let module = load_published_module(backend.as_ref(), &module_slug)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let mut runner = QuizRunner::new(module, backend, store)
        .with_navigator(Arc::new(ConsoleNavigator {
            public_url: config.public_url.clone(),
        }))
        .with_summary(summary);
    let mut prompt = Prompt::new();

    print_intro(&runner);

    match runner.mount().await {
        Ok(MountOutcome::Resumed { index }) => {
            if let Stage::Quiz(quiz) = runner.stage() {
                println!(
                    "Welcome back, {}! Resuming at question {}.",
                    quiz.student_name(),
                    index + 1
                );
            }
        }
        Ok(MountOutcome::Discarded) => {
            println!("Your previous attempt can no longer be continued. Starting over.");
        }
        Ok(MountOutcome::Fresh) => {}
        Err(e) => eprintln!("Could not resume your attempt: {}", e.user_message()),
    }

    if matches!(runner.stage(), Stage::Intro) {
        if !start(&mut runner, &mut prompt, name).await? {
            return Ok(());
        }
    }

    if !answer_questions(&mut runner, &mut prompt).await? {
        return Ok(());
    }

    show_results(&mut runner, &mut prompt).await
}

fn print_intro(runner: &QuizRunner) {
    let module = runner.module();
    println!("{}", module.title);
    println!(
        "{}",
        module
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("A new learning module.")
    );
    println!("{} questions", module.question_count);
    println!();
}

/// Collect a name and start the attempt. Returns `false` if the user quit.
async fn start(runner: &mut QuizRunner, prompt: &mut Prompt, name: Option<String>) -> Result<bool> {
    let mut name = name;
    loop {
        let candidate = match name.take() {
            Some(n) => n,
            None => match prompt.ask("Your name: ").await? {
                Some(n) => n,
                None => return Ok(false),
            },
        };
        match runner.start(&candidate).await {
            Ok(()) => return Ok(true),
            Err(e @ QuizError::Validation { .. }) if runner.module().question_count > 0 => {
                eprintln!("{}", e.user_message());
            }
            Err(e) if e.is_retryable() => {
                eprintln!("{}", e.user_message());
            }
            Err(e) => anyhow::bail!(e.user_message()),
        }
    }
}

fn print_question(quiz: &QuizState, total: usize, progress: f64) {
    println!();
    println!(
        "Question {} of {total}  [{:>3.0}%]",
        quiz.index() + 1,
        progress * 100.0
    );
    println!("{}", quiz.question().content);
    for (i, choice) in quiz.question().choices.iter().enumerate() {
        println!("  {}) {}", i + 1, choice.content);
    }
}

/// Run question rounds until the results stage. Returns `false` if the user quit.
async fn answer_questions(runner: &mut QuizRunner, prompt: &mut Prompt) -> Result<bool> {
    loop {
        let (choice_ids, answered) = match runner.stage() {
            Stage::Quiz(quiz) => {
                if !quiz.is_locked() {
                    print_question(quiz, runner.module().question_count, runner.progress());
                }
                let ids: Vec<String> = quiz.question().choices.iter().map(|c| c.id.clone()).collect();
                (ids, matches!(quiz.answer(), AnswerState::Answered(_)))
            }
            _ => return Ok(true),
        };

        if !answered {
            let Some(input) = prompt.ask("Your answer (number, q to quit): ").await? else {
                return Ok(false);
            };
            if input.eq_ignore_ascii_case("q") {
                println!("Progress saved. Run the same command again to continue.");
                return Ok(false);
            }
            let Some(choice_id) = input
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| choice_ids.get(i))
            else {
                eprintln!("Please enter a number between 1 and {}.", choice_ids.len());
                continue;
            };
            runner.select(choice_id)?;

            match runner.check().await {
                Ok(outcome) if outcome.is_correct => println!("Correct!"),
                Ok(outcome) => println!(
                    "Incorrect. The correct answer is \"{}\".",
                    outcome.correct_choice_content
                ),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    if !e.is_retryable() {
                        anyhow::bail!(e.user_message());
                    }
                    continue;
                }
            }
        }

        if let Err(e) = runner.advance().await {
            eprintln!("{}", e.user_message());
            if !e.is_retryable() {
                anyhow::bail!(e.user_message());
            }
            if prompt.ask("Press Enter to retry: ").await?.is_none() {
                return Ok(false);
            }
        }
    }
}

async fn show_results(runner: &mut QuizRunner, prompt: &mut Prompt) -> Result<()> {
    println!();
    println!("Module complete!");

    let score = loop {
        println!("Submitting your answers...");
        match runner.finish().await {
            Ok(score) => break score,
            Err(e) if e.is_retryable() => {
                eprintln!("{}", e.user_message());
                if prompt.ask("Press Enter to retry: ").await?.is_none() {
                    return Ok(());
                }
            }
            Err(e) => anyhow::bail!(e.user_message()),
        }
    };

    println!("Well done, {}!", score.student_name);
    println!("Your score: {score}");

    if let Some(summary) = runner.summary().await {
        println!();
        println!("Key points:");
        println!("{summary}");
    }
    Ok(())
}
