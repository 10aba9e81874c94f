//! The `lessonrun modules` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lessonrun_client::config::load_config_from;
use lessonrun_client::create_backend;
use lessonrun_core::model::ModuleFilter;
use lessonrun_core::traits::QuizBackend;

pub async fn execute(
    keyword: Option<String>,
    grade_id: Option<String>,
    subject_id: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(per_page) = per_page {
        anyhow::ensure!(per_page >= 1, "per-page must be at least 1");
    }

    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config)?;

    let filter = ModuleFilter {
        keyword,
        grade_id,
        subject_id,
        page,
        per_page,
    };
    let listing = backend.list_modules(&filter).await?;

    if listing.modules.is_empty() {
        println!("No modules found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Slug",
        "Title",
        "Subject",
        "Grade",
        "Questions",
        "Published",
    ]);
    for module in &listing.modules {
        table.add_row(vec![
            Cell::new(&module.slug),
            Cell::new(&module.title),
            Cell::new(module.subject.as_ref().map(|s| s.name.as_str()).unwrap_or("-")),
            Cell::new(module.grade.as_ref().map(|g| g.name.as_str()).unwrap_or("-")),
            Cell::new(module.question_count),
            Cell::new(if module.published { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");

    let p = listing.pagination;
    println!(
        "Page {} of {} ({} modules)",
        p.page,
        p.total_pages.max(1),
        p.total
    );
    Ok(())
}
