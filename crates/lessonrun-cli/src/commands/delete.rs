//! The `lessonrun delete` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use lessonrun_client::config::load_config_from;
use lessonrun_client::{create_backend, create_session_store};
use lessonrun_core::traits::QuizBackend;
use lessonrun_core::SessionStore;

pub async fn execute(module_slug: String, yes: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config)?;

    let module = backend
        .get_module(&module_slug)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if !yes && !confirm(&module.title).await? {
        println!("Cancelled.");
        return Ok(());
    }

    backend
        .delete_module(&module.slug)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    // A saved attempt for a deleted module can never be resumed.
    let store = create_session_store(&config);
    if store.load(&module.id).is_some() {
        store.clear();
    }

    println!("Deleted {}.", module.title);
    Ok(())
}

async fn confirm(title: &str) -> Result<bool> {
    eprint!("Delete {title} and all of its questions? [y/N]: ");
    let line = BufReader::new(tokio::io::stdin())
        .lines()
        .next_line()
        .await
        .context("failed to read from stdin")?;
    Ok(matches!(
        line.as_deref().map(str::trim),
        Some("y") | Some("Y") | Some("yes")
    ))
}
