//! lessonrun-client: backend and side-channel integrations.
//!
//! Implements the `QuizBackend` trait over the learning-module REST API,
//! the `SummaryGenerator` trait over the Anthropic messages API, and loads
//! the configuration that wires them together.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod summary;

pub use config::{
    create_backend, create_session_store, create_summary, load_config, LessonrunConfig,
    SummaryConfig,
};
pub use error::SummaryError;
pub use http::HttpBackend;
