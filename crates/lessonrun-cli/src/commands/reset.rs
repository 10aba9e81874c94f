//! The `lessonrun reset` command.

use std::path::PathBuf;

use anyhow::Result;

use lessonrun_client::config::load_config_from;
use lessonrun_client::create_session_store;
use lessonrun_core::SessionStore;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_session_store(&config);

    let existed = store.path().exists();
    store.clear();

    if existed {
        println!("Cleared saved attempt at {}", store.path().display());
    } else {
        println!("No saved attempt.");
    }
    Ok(())
}
