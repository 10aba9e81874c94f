//! lessonrun-core: quiz session runner, data model, and collaborator traits.
//!
//! This crate defines the types exchanged with the learning-module backend,
//! the traits the backend and side channels implement, the persisted
//! session record, and the state machine that takes a student from intro to
//! a final score.

pub mod attempt;
pub mod error;
pub mod model;
pub mod publish;
pub mod runner;
pub mod session;
pub mod traits;

pub use error::QuizError;
pub use runner::{MountOutcome, QuizRunner, Stage};
pub use session::{FileSessionStore, MemorySessionStore, SessionRecord, SessionStore};
