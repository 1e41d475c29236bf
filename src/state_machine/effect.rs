//! Effects produced by state transitions

use crate::gateway::{ForcedIntent, Role, SessionId};
use crate::state_machine::state::Flow;
use crate::transcript::TransientId;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new backend session for `flow`
    CreateSession { flow: Flow },

    /// Mirror a transcript turn into the backend log (best effort)
    LogMessage {
        session_id: SessionId,
        role: Role,
        text: String,
    },

    /// Ask the backend; the answer resolves placeholder `pending`
    AskQuestion {
        session_id: SessionId,
        question: String,
        forced_intent: Option<ForcedIntent>,
        pending: TransientId,
    },

    /// Tell the application shell something it owns
    NotifyHost(HostNotice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotice {
    CloseRequested,
}

impl Effect {
    pub fn log_user(session_id: &SessionId, text: impl Into<String>) -> Self {
        Effect::LogMessage {
            session_id: session_id.clone(),
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn log_assistant(session_id: &SessionId, text: impl Into<String>) -> Self {
        Effect::LogMessage {
            session_id: session_id.clone(),
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
