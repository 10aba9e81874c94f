//! Optimistic publish switch.
//!
//! The switch flips immediately to the requested value and stays `Pending`
//! until the backend answers; a failure rolls it back to the previous value.

use crate::error::QuizError;
use crate::traits::QuizBackend;

/// Published flag of one module as shown to its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    /// The backend agrees with the shown value.
    Confirmed(bool),
    /// A toggle request is in flight.
    Pending { previous: bool, requested: bool },
    /// The last toggle failed and the previous value was restored.
    RolledBack { value: bool, reason: String },
}

impl PublishState {
    /// The value the switch currently displays.
    pub fn shown(&self) -> bool {
        match self {
            PublishState::Confirmed(value) => *value,
            PublishState::Pending { requested, .. } => *requested,
            PublishState::RolledBack { value, .. } => *value,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PublishState::Pending { .. })
    }
}

/// Publish switch bound to one module slug.
#[derive(Debug, Clone)]
pub struct PublishToggle {
    module_slug: String,
    state: PublishState,
}

impl PublishToggle {
    pub fn new(module_slug: impl Into<String>, published: bool) -> Self {
        Self {
            module_slug: module_slug.into(),
            state: PublishState::Confirmed(published),
        }
    }

    pub fn state(&self) -> &PublishState {
        &self.state
    }

    /// Flip the switch and confirm or roll back against the backend.
    pub async fn toggle(&mut self, backend: &dyn QuizBackend) -> Result<bool, QuizError> {
        if self.state.is_pending() {
            return Err(QuizError::InvalidTransition {
                action: "toggle",
                stage: "pending",
            });
        }
        let previous = self.state.shown();
        let requested = !previous;
        self.state = PublishState::Pending {
            previous,
            requested,
        };

        match backend.toggle_publish(&self.module_slug).await {
            Ok(()) => {
                self.state = PublishState::Confirmed(requested);
                Ok(requested)
            }
            Err(e) => {
                tracing::warn!(module = %self.module_slug, "publish toggle rolled back: {e}");
                self.state = PublishState::RolledBack {
                    value: previous,
                    reason: e.user_message(),
                };
                Err(e)
            }
        }
    }
}
