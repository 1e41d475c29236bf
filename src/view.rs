//! Presentation snapshot
//!
//! The host never reads `ChatState` directly. After every transition the
//! runtime builds a [`ChatView`] and broadcasts it, so a renderer only has
//! to draw what it is given.

use crate::catalog::Catalog;
use crate::state_machine::event::NEW_CHAT_LABEL;
use crate::state_machine::{ChatState, MenuItem};
use crate::transcript::Turn;
use serde::Serialize;

pub const QUESTION_PLACEHOLDER: &str = "질문을 입력하세요.";
pub const MERCHANT_PLACEHOLDER: &str = "가맹점 정보를 입력하세요.";

/// Entry of the dropdown menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: String,
    #[serde(skip)]
    pub item: MenuItem,
}

/// Everything a renderer needs to draw one chat window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatView {
    pub turns: Vec<Turn>,
    pub menu_open: bool,
    pub menu_items: Vec<MenuEntry>,
    pub merchant_mode: bool,
    pub merchant_result: Option<String>,
    pub merchant_record: Option<MerchantRecord>,
    pub input_placeholder: &'static str,
    pub draft_input: String,
    pub busy: bool,
}

impl ChatView {
    pub fn from_state(state: &ChatState, catalog: &Catalog) -> Self {
        Self {
            turns: state.transcript.turns().to_vec(),
            menu_open: state.menu_open,
            menu_items: menu_entries(catalog),
            merchant_mode: state.merchant_mode,
            merchant_result: state.merchant_result.clone(),
            merchant_record: state.merchant_result.as_deref().and_then(MerchantRecord::parse),
            input_placeholder: if state.merchant_mode {
                MERCHANT_PLACEHOLDER
            } else {
                QUESTION_PLACEHOLDER
            },
            draft_input: state.draft_input.clone(),
            busy: state.is_busy(),
        }
    }
}

/// "새 채팅" followed by the top-level categories
pub fn menu_entries(catalog: &Catalog) -> Vec<MenuEntry> {
    let mut entries = vec![MenuEntry {
        label: NEW_CHAT_LABEL.to_string(),
        item: MenuItem::NewChat,
    }];
    entries.extend(catalog.roots().iter().filter_map(|id| {
        catalog.node(*id).map(|node| MenuEntry {
            label: node.label.clone(),
            item: MenuItem::Category(*id),
        })
    }));
    entries
}

/// Merchant fields extracted from a pinned lookup answer, in answer order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantRecord {
    pub fields: Vec<(String, String)>,
}

impl MerchantRecord {
    /// Parse `key: value` lines. Lines without a key are skipped; `None`
    /// when no line yields a field.
    pub fn parse(answer: &str) -> Option<Self> {
        let fields: Vec<(String, String)> = answer
            .lines()
            .filter_map(|line| {
                let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
                let (key, value) = line.split_once(':').or_else(|| line.split_once('：'))?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim().to_string()))
            })
            .collect();

        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
