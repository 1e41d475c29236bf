//! Events that can occur in a chat window

use crate::catalog::NodeId;
use crate::gateway::{GatewayError, QueryReply, SessionId};
use crate::state_machine::state::Flow;
use crate::transcript::TransientId;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    StartMainFlow,
    StartMerchantFlow,
    ToggleMenu,
    MenuItemSelected { item: MenuItem },
    ButtonClicked { node: NodeId },
    DraftChanged { text: String },
    Submit,
    CloseWindow,

    // Gateway events
    SessionCreated { flow: Flow, session_id: SessionId },
    SessionFailed { flow: Flow, message: String },
    AnswerReceived {
        pending: TransientId,
        outcome: AnswerOutcome,
    },
}

/// Entry in the dropdown menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    NewChat,
    Category(NodeId),
}

/// Label of the dropdown entry that starts a new chat
pub const NEW_CHAT_LABEL: &str = "새 채팅";

/// Resolved content of a pending placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answer(String),
    /// The backend found nothing; shown like an answer but never pinned
    NoMatch(String),
    /// Error content rendered in place of the answer
    Error(String),
}

impl AnswerOutcome {
    pub fn text(&self) -> &str {
        match self {
            AnswerOutcome::Answer(text)
            | AnswerOutcome::NoMatch(text)
            | AnswerOutcome::Error(text) => text,
        }
    }

    /// An answer the merchant lookup can pin
    pub fn usable_answer(&self) -> Option<&str> {
        match self {
            AnswerOutcome::Answer(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

impl From<Result<QueryReply, GatewayError>> for AnswerOutcome {
    fn from(result: Result<QueryReply, GatewayError>) -> Self {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => return AnswerOutcome::Error(e.display_text()),
        };
        let no_match = reply.is_no_match();
        match reply.into_answer() {
            Ok(answer) if no_match => AnswerOutcome::NoMatch(answer),
            Ok(answer) => AnswerOutcome::Answer(answer),
            Err(e) => AnswerOutcome::Error(e.display_text()),
        }
    }
}
