//! The `lessonrun submissions` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lessonrun_client::config::load_config_from;
use lessonrun_client::create_backend;
use lessonrun_core::traits::QuizBackend;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config)?;

    let groups = backend.list_submissions().await?;
    if groups.iter().all(|g| g.submissions.is_empty()) {
        println!("No submissions yet.");
        return Ok(());
    }

    for group in groups.iter().filter(|g| !g.submissions.is_empty()) {
        println!(
            "{} ({} submissions)",
            group.module.title, group.total_submissions
        );

        let mut table = Table::new();
        table.set_header(vec!["Student", "Score", "Submitted"]);
        for item in &group.submissions {
            table.add_row(vec![
                Cell::new(&item.student_name),
                Cell::new(format!("{}/{}", item.total_correct, item.total_questions)),
                Cell::new(item.submitted_at.format("%Y-%m-%d %H:%M")),
            ]);
        }
        println!("{table}\n");
    }
    Ok(())
}
