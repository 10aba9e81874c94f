//! Quiz error types.
//!
//! Every backend call made by the runner resolves to one of these variants.
//! The HTTP client in `lessonrun-client` maps status codes onto them so the
//! runner can decide what to show without string matching.

use thiserror::Error;

/// Errors that can occur while running a quiz or talking to the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizError {
    /// The module, attempt or question does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected locally or by the backend (HTTP 400).
    #[error("invalid input: {message}")]
    Validation {
        message: String,
        /// Field-level messages reported by the backend, if any.
        fields: Vec<String>,
    },

    /// The configured token was rejected (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend returned another error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The operation is not allowed in the runner's current stage.
    #[error("cannot {action} while in the {stage} stage")]
    InvalidTransition {
        action: &'static str,
        stage: &'static str,
    },
}

impl QuizError {
    /// Shorthand for a local validation failure without field details.
    pub fn validation(message: impl Into<String>) -> Self {
        QuizError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Returns `true` if re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            QuizError::Network(_) => true,
            QuizError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QuizError::NotFound(_))
    }

    /// Text suitable for showing to a student.
    pub fn user_message(&self) -> String {
        match self {
            QuizError::NotFound(what) => format!("{what} was not found."),
            QuizError::Validation { message, fields } if fields.is_empty() => message.clone(),
            QuizError::Validation { message, fields } => {
                format!("{message} ({})", fields.join("; "))
            }
            QuizError::Unauthorized(_) => "Your session has expired. Please sign in again.".into(),
            QuizError::Network(_) | QuizError::Api { .. } => {
                "Something went wrong. Please try again.".into()
            }
            QuizError::InvalidTransition { .. } => self.to_string(),
        }
    }
}
