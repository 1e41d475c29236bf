//! Conversation state types

use crate::catalog::NodeId;
use crate::gateway::SessionId;
use crate::transcript::{TransientId, Transcript};
use serde::{Deserialize, Serialize};

/// Which entry flow a new session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Top-level menu buttons
    Main,
    /// Merchant lookup guidance, free text reinterpreted as a lookup
    Merchant,
}

/// What an in-flight query is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Question,
    Merchant,
}

/// Controller phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// No session yet
    #[default]
    Idle,

    /// Session creation in flight
    CreatingSession { flow: Flow },

    /// Top-level buttons shown
    MenuRoot,

    /// Children of `node` shown
    MenuSub { node: NodeId },

    /// Placeholder shown, backend call in flight
    AwaitingAnswer { pending: TransientId, lookup: Lookup },

    /// Free input, no pending operations
    AnswerShown,
}

/// Everything the controller owns for one chat window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatState {
    pub phase: Phase,
    pub session: Option<SessionId>,
    pub transcript: Transcript,
    pub menu_open: bool,
    pub merchant_mode: bool,
    /// Answer captured by the merchant lookup, pinned until the next session
    pub merchant_result: Option<String>,
    pub draft_input: String,
    /// Next placeholder id; never reset so stale completions cannot match
    pub next_transient: u64,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway call is in flight and new input must wait
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            Phase::CreatingSession { .. } | Phase::AwaitingAnswer { .. }
        )
    }

    /// The next free-text submit is a merchant lookup
    pub fn wants_merchant_lookup(&self) -> bool {
        self.merchant_mode && self.merchant_result.is_none()
    }

    /// Fresh state for a newly created session.
    ///
    /// The draft and dropdown belong to the window, not the session, and
    /// carry over along with the placeholder counter.
    pub fn for_session(&self, session: SessionId) -> Self {
        Self {
            session: Some(session),
            menu_open: self.menu_open,
            draft_input: self.draft_input.clone(),
            next_transient: self.next_transient,
            ..Self::default()
        }
    }
}
