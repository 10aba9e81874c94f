//! Client configuration and factories.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lessonrun_core::traits::{DisabledSummary, SummaryGenerator};
use lessonrun_core::FileSessionStore;

use crate::http::{HttpBackend, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS};
use crate::summary::{AnthropicSummarizer, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

/// Settings for the AI summary side channel.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_summary_model")]
    pub model: String,
    #[serde(default = "default_summary_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_summary_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_summary_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Top-level lessonrun configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LessonrunConfig {
    /// Base URL of the learning-module backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Bearer token attached to every backend request.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Base URL students open modules under; used for resume links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Where the in-progress attempt is persisted.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Per-request timeout for backend calls.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Optional AI summary provider.
    #[serde(default)]
    pub summary: Option<SummaryConfig>,
}

impl std::fmt::Debug for LessonrunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonrunConfig")
            .field("backend_url", &self.backend_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("public_url", &self.public_url)
            .field("session_file", &self.session_file)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("summary", &self.summary)
            .finish()
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_public_url() -> String {
    "http://localhost:9002".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LessonrunConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_token: None,
            public_url: default_public_url(),
            session_file: None,
            request_timeout_secs: default_timeout(),
            summary: None,
        }
    }
}

impl LessonrunConfig {
    /// The session file, falling back to the per-user config directory.
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(|| {
            dirs_path()
                .map(|dir| dir.join("session.json"))
                .unwrap_or_else(|| PathBuf::from(".lessonrun-session.json"))
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_config(config: &mut LessonrunConfig) {
    config.backend_url = resolve_env_vars(&config.backend_url);
    config.public_url = resolve_env_vars(&config.public_url);
    config.api_token = config
        .api_token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
    if let Some(summary) = &mut config.summary {
        summary.api_key = resolve_env_vars(&summary.api_key);
        summary.base_url = summary.base_url.as_deref().map(resolve_env_vars);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `lessonrun.toml` in the current directory
/// 2. `~/.config/lessonrun/config.toml`
///
/// Environment variable overrides: `LESSONRUN_BACKEND_URL`, `LESSONRUN_API_TOKEN`,
/// `LESSONRUN_ANTHROPIC_KEY`.
pub fn load_config() -> Result<LessonrunConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LessonrunConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("lessonrun.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<LessonrunConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LessonrunConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("LESSONRUN_BACKEND_URL") {
        config.backend_url = url;
    }
    if let Ok(token) = std::env::var("LESSONRUN_API_TOKEN") {
        config.api_token = Some(token);
    }
    if let Ok(key) = std::env::var("LESSONRUN_ANTHROPIC_KEY") {
        match &mut config.summary {
            Some(summary) => summary.api_key = key,
            None => {
                config.summary = Some(SummaryConfig {
                    api_key: key,
                    base_url: None,
                    model: default_summary_model(),
                    max_tokens: default_summary_tokens(),
                })
            }
        }
    }

    resolve_config(&mut config);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lessonrun"))
}

/// Create the HTTP backend described by `config`.
pub fn create_backend(config: &LessonrunConfig) -> Result<HttpBackend> {
    HttpBackend::new(
        &config.backend_url,
        config.api_token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to build backend client")
}

/// Create the summary generator, or a disabled one when no key is configured.
pub fn create_summary(config: &LessonrunConfig) -> Result<Arc<dyn SummaryGenerator>> {
    match &config.summary {
        Some(summary) if !summary.api_key.is_empty() => {
            let summarizer = AnthropicSummarizer::new(&summary.api_key, summary.base_url.clone())
                .context("failed to build summary client")?
                .with_model(summary.model.clone())
                .with_max_tokens(summary.max_tokens);
            Ok(Arc::new(summarizer))
        }
        _ => Ok(Arc::new(DisabledSummary)),
    }
}

/// Open the file-backed session store at the configured location.
pub fn create_session_store(config: &LessonrunConfig) -> FileSessionStore {
    FileSessionStore::new(config.session_path())
}
