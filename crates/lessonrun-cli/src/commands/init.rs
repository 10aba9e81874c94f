//! The `lessonrun init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("lessonrun.toml").exists() {
        println!("lessonrun.toml already exists, skipping.");
    } else {
        std::fs::write("lessonrun.toml", SAMPLE_CONFIG)?;
        println!("Created lessonrun.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point backend_url at your backend and set LESSONRUN_API_TOKEN");
    println!("  2. Run: lessonrun modules");
    println!("  3. Run: lessonrun take --module <slug>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lessonrun configuration

backend_url = "http://localhost:8000"
api_token = "${LESSONRUN_API_TOKEN}"
public_url = "http://localhost:9002"
request_timeout_secs = 30
# session_file = "/home/me/.config/lessonrun/session.json"

# Optional: AI-generated key points shown after a quiz.
# [summary]
# api_key = "${ANTHROPIC_API_KEY}"
# model = "claude-haiku-4-5-20251001"
# max_tokens = 512
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config: lessonrun_client::LessonrunConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert!(config.summary.is_none());
    }
}
