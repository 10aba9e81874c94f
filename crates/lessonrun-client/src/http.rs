//! REST backend client.
//!
//! Every response from the backend is wrapped in an envelope:
//!
//! ```json
//! { "data": ..., "errors": [{"field": "message"}], "meta": {"code": 200, "message": "OK"} }
//! ```
//!
//! Status codes are mapped onto [`QuizError`] here so the runner never sees
//! HTTP details.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lessonrun_core::model::{
    AnswerOutcome, AttemptStart, FinalScore, Module, ModuleFilter, ModulePage, ModuleSubmissions,
    Question,
};
use lessonrun_core::traits::QuizBackend;
use lessonrun_core::QuizError;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP implementation of [`QuizBackend`].
pub struct HttpBackend {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL. Each segment is percent-encoded on its own,
    /// so a slug can never add path levels or a query string.
    fn url(&self, segments: &[&str], query: &[(&'static str, String)]) -> Result<Url, QuizError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| QuizError::Network(format!("invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| QuizError::Network(format!("invalid backend URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and return the envelope's `data`, which may be absent.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        subject: &str,
    ) -> Result<Option<T>, QuizError> {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QuizError::Network(format!("request timed out: {e}"))
            } else {
                QuizError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let text = response.text().await.unwrap_or_default();
            return Err(map_error(status, &text, subject));
        }

        let text = response
            .text()
            .await
            .map_err(|e| QuizError::Network(format!("failed to read response: {e}")))?;

        if text.trim().is_empty() {
            return Ok(None);
        }
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| QuizError::Api {
            status,
            message: format!("failed to parse response: {e}"),
        })?;
        Ok(envelope.data)
    }

    /// Like [`call`](Self::call) but the envelope must carry data.
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        subject: &str,
    ) -> Result<T, QuizError> {
        self.call(method, url, body, subject)
            .await?
            .ok_or_else(|| QuizError::Api {
                status: 200,
                message: format!("response for {subject} carried no data"),
            })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Option<Vec<BTreeMap<String, String>>>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Deserialize)]
struct Meta {
    #[serde(default)]
    message: Option<String>,
}

fn map_error(status: u16, body: &str, subject: &str) -> QuizError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let message = envelope
        .meta
        .and_then(|m| m.message)
        .filter(|m| !m.is_empty());

    match status {
        400 => {
            let fields = envelope
                .errors
                .unwrap_or_default()
                .into_iter()
                .flat_map(|entry| {
                    entry
                        .into_iter()
                        .map(|(field, msg)| format!("{field}: {msg}"))
                })
                .collect();
            QuizError::Validation {
                message: message.unwrap_or_else(|| "Invalid request.".to_string()),
                fields,
            }
        }
        401 => QuizError::Unauthorized(message.unwrap_or_else(|| "unauthorized".to_string())),
        404 => QuizError::NotFound(subject.to_string()),
        _ => QuizError::Api {
            status,
            message: message.unwrap_or_else(|| format!("HTTP error! status: {status}")),
        },
    }
}

#[derive(Serialize)]
struct CreateAttemptBody<'a> {
    student_name: &'a str,
}

#[derive(Serialize)]
struct SubmitAnswerBody<'a> {
    question_slug: &'a str,
    choice_id: &'a str,
}

fn to_json<T: Serialize>(body: &T) -> Result<serde_json::Value, QuizError> {
    serde_json::to_value(body).map_err(|e| QuizError::validation(format!("unencodable body: {e}")))
}

#[async_trait]
impl QuizBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn get_module(&self, module_slug: &str) -> Result<Module, QuizError> {
        let url = self.url(&["v1", "modules", module_slug], &[])?;
        self.fetch(Method::GET, url, None, &format!("Module '{module_slug}'"))
            .await
    }

    #[instrument(skip(self, student_name))]
    async fn create_attempt(
        &self,
        module_slug: &str,
        student_name: &str,
    ) -> Result<AttemptStart, QuizError> {
        let url = self.url(&["v1", "modules", module_slug, "submissions"], &[])?;
        let body = to_json(&CreateAttemptBody { student_name })?;
        self.fetch(Method::POST, url, Some(body), &format!("Module '{module_slug}'"))
            .await
    }

    #[instrument(skip(self))]
    async fn get_question(
        &self,
        module_slug: &str,
        question_slug: &str,
    ) -> Result<Question, QuizError> {
        let url = self.url(&["v1", "modules", module_slug, "questions", question_slug], &[])?;
        self.fetch(Method::GET, url, None, &format!("Question '{question_slug}'"))
            .await
    }

    #[instrument(skip(self))]
    async fn submit_answer(
        &self,
        module_slug: &str,
        attempt_code: &str,
        question_slug: &str,
        choice_id: &str,
    ) -> Result<AnswerOutcome, QuizError> {
        let url = self.url(
            &["v1", "modules", module_slug, "submissions", attempt_code, "answers"],
            &[],
        )?;
        let body = to_json(&SubmitAnswerBody {
            question_slug,
            choice_id,
        })?;
        self.fetch(
            Method::POST,
            url,
            Some(body),
            &format!("Submission '{attempt_code}'"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn finalize(&self, module_slug: &str, attempt_code: &str) -> Result<FinalScore, QuizError> {
        let url = self.url(
            &["v1", "modules", module_slug, "submissions", attempt_code, "finalize"],
            &[],
        )?;
        self.fetch(
            Method::PATCH,
            url,
            None,
            &format!("Submission '{attempt_code}'"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<ModulePage, QuizError> {
        let url = self.url(&["v1", "modules"], &filter.query_pairs())?;
        self.fetch(Method::GET, url, None, "Modules").await
    }

    #[instrument(skip(self))]
    async fn toggle_publish(&self, module_slug: &str) -> Result<(), QuizError> {
        let url = self.url(&["v1", "modules", module_slug, "publish"], &[])?;
        self.call::<serde_json::Value>(Method::PATCH, url, None, &format!("Module '{module_slug}'"))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn delete_module(&self, module_slug: &str) -> Result<(), QuizError> {
        let url = self.url(&["v1", "modules", module_slug], &[])?;
        self.call::<serde_json::Value>(Method::DELETE, url, None, &format!("Module '{module_slug}'"))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_submissions(&self) -> Result<Vec<ModuleSubmissions>, QuizError> {
        let url = self.url(&["v1", "submissions"], &[])?;
        Ok(self
            .call::<Vec<ModuleSubmissions>>(Method::GET, url, None, "Submissions")
            .await?
            .unwrap_or_default())
    }
}
