//! Transcript of rendered turns
//!
//! A pending placeholder is the only kind of turn carrying a
//! [`TransientId`]. It is resolved by [`Transcript::resolve_pending`],
//! which removes it and appends the resulting bot turn in one call.

use crate::catalog::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown while an answer is being generated
pub const PENDING_TEXT: &str = "잠시만 기다려주세요. 답변을 생성 중 입니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// Styling hint for the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualTag {
    Pending,
    Error,
}

/// Identifies an in-flight placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransientId(pub u64);

impl fmt::Display for TransientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loading-{}", self.0)
    }
}

/// A choice offered on a bot turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient_id: Option<TransientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_tag: Option<VisualTag>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            buttons: vec![],
            transient_id: None,
            visual_tag: None,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            buttons: vec![],
            transient_id: None,
            visual_tag: None,
        }
    }

    pub fn bot_error(text: impl Into<String>) -> Self {
        Self {
            visual_tag: Some(VisualTag::Error),
            ..Self::bot(text)
        }
    }

    pub fn choice(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            buttons,
            ..Self::bot(text)
        }
    }

    pub fn pending(id: TransientId) -> Self {
        Self {
            transient_id: Some(id),
            visual_tag: Some(VisualTag::Pending),
            ..Self::bot(PENDING_TEXT)
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.transient_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        debug_assert!(
            turn.transient_id.is_none() || !self.contains_pending(turn.transient_id),
            "duplicate transient id"
        );
        self.turns.push(turn);
    }

    fn contains_pending(&self, id: Option<TransientId>) -> bool {
        self.turns.iter().any(|t| t.transient_id == id)
    }

    /// Replace the placeholder `id` with `turn`.
    ///
    /// Returns false and leaves the transcript untouched if no such
    /// placeholder exists.
    pub fn resolve_pending(&mut self, id: TransientId, turn: Turn) -> bool {
        let before = self.turns.len();
        self.turns.retain(|t| t.transient_id != Some(id));
        if self.turns.len() == before {
            return false;
        }
        self.turns.push(turn);
        true
    }

    #[cfg(test)]
    pub fn pending_ids(&self) -> Vec<TransientId> {
        self.turns.iter().filter_map(|t| t.transient_id).collect()
    }
}

/// Buttons of the most recent turn that offered a choice
pub fn latest_buttons(turns: &[Turn]) -> &[Button] {
    turns
        .iter()
        .rev()
        .find(|t| !t.buttons.is_empty())
        .map(|t| t.buttons.as_slice())
        .unwrap_or(&[])
}
