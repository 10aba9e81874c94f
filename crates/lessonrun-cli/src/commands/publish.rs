//! The `lessonrun publish` command.

use std::path::PathBuf;

use anyhow::Result;

use lessonrun_client::config::load_config_from;
use lessonrun_client::create_backend;
use lessonrun_core::publish::{PublishState, PublishToggle};
use lessonrun_core::traits::QuizBackend;

pub async fn execute(module_slug: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config)?;

    let module = backend
        .get_module(&module_slug)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let mut toggle = PublishToggle::new(&module.slug, module.published);

    match toggle.toggle(&backend).await {
        Ok(true) => println!("{} is now published.", module.title),
        Ok(false) => println!("{} is now unpublished.", module.title),
        Err(e) => match toggle.state() {
            PublishState::RolledBack { value, reason } => anyhow::bail!(
                "could not change publish state of {} (still {}): {reason}",
                module.title,
                if *value { "published" } else { "unpublished" }
            ),
            _ => anyhow::bail!(e.user_message()),
        },
    }
    Ok(())
}
