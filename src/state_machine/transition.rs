//! Pure state transition function
//!
//! Given the same state, catalog and event this always produces the same
//! next state and effects. Every user turn is appended, and its log effect
//! emitted, before the bot turn that answers it.

use super::{AnswerOutcome, ChatState, Effect, Event, Flow, HostNotice, Lookup, MenuItem, Phase};
use crate::catalog::{Catalog, MenuNode, NodeId, NodeKind};
use crate::gateway::{ForcedIntent, SessionId};
use crate::transcript::{Button, TransientId, Turn};
use thiserror::Error;

/// Bot prompt opening the main flow
pub const MAIN_PROMPT: &str = "원하시는 업무를 선택하세요.";

/// Bot guidance opening the merchant lookup flow
pub const MERCHANT_GUIDE: &str = "가맹점 조회를 위해 아래 정보 중 하나 이상을 입력해주세요.\n\
예시)\n\
- 가맹점명: OO상점\n\
- 사업자번호: 123-45-67890\n\
- 가맹주명: 홍길동";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is still in progress, wait for it to finish")]
    Busy,
    #[error("No session has been started")]
    NoSession,
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub fn transition(
    state: &ChatState,
    catalog: &Catalog,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Window-level events, accepted in any phase
        // ============================================================
        Event::ToggleMenu => {
            let mut next = state.clone();
            next.menu_open = !next.menu_open;
            Ok(TransitionResult::new(next))
        }

        Event::DraftChanged { text } => {
            let mut next = state.clone();
            next.draft_input = text;
            Ok(TransitionResult::new(next))
        }

        Event::CloseWindow => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::NotifyHost(HostNotice::CloseRequested))),

        // ============================================================
        // Session lifecycle
        // ============================================================
        Event::StartMainFlow => start_flow(state, Flow::Main),
        Event::StartMerchantFlow => start_flow(state, Flow::Merchant),

        Event::SessionCreated { flow, session_id } => match state.phase {
            Phase::CreatingSession { flow: expected } if expected == flow => {
                Ok(open_session(state, catalog, flow, session_id))
            }
            _ => Err(TransitionError::UnexpectedResponse(format!(
                "session created for {flow:?} while {:?}",
                state.phase
            ))),
        },

        Event::SessionFailed { flow, message } => match state.phase {
            Phase::CreatingSession { flow: expected } if expected == flow => {
                let mut next = state.clone();
                next.phase = if next.session.is_some() {
                    Phase::AnswerShown
                } else {
                    Phase::Idle
                };
                next.transcript
                    .push(Turn::bot_error(format!("새 대화를 시작하지 못했습니다. ({message})")));
                Ok(TransitionResult::new(next))
            }
            _ => Err(TransitionError::UnexpectedResponse(format!(
                "session failure for {flow:?} while {:?}",
                state.phase
            ))),
        },

        // ============================================================
        // Menu navigation
        // ============================================================
        Event::MenuItemSelected { item } => {
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            match item {
                MenuItem::NewChat => {
                    let mut result = start_flow(state, Flow::Main)?;
                    result.new_state.menu_open = false;
                    Ok(result)
                }
                MenuItem::Category(node) => {
                    let mut result = select_node(state, catalog, node)?;
                    result.new_state.menu_open = false;
                    Ok(result)
                }
            }
        }

        Event::ButtonClicked { node } => {
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            select_node(state, catalog, node)
        }

        // ============================================================
        // Free text
        // ============================================================
        Event::Submit => {
            if state.is_busy() {
                return Err(TransitionError::Busy);
            }
            let session = active_session(state)?;
            if state.draft_input.trim().is_empty() {
                return Ok(TransitionResult::new(state.clone()));
            }

            let mut next = state.clone();
            let text = std::mem::take(&mut next.draft_input);

            // A captured merchant result means the lookup already happened;
            // later submits are ordinary questions.
            let (forced_intent, lookup) = if state.wants_merchant_lookup() {
                (Some(ForcedIntent::MerchantData), Lookup::Merchant)
            } else {
                (None, Lookup::Question)
            };
            Ok(ask(next, &session, text, forced_intent, lookup))
        }

        Event::AnswerReceived { pending, outcome } => match state.phase {
            Phase::AwaitingAnswer {
                pending: expected,
                lookup,
            } if expected == pending => resolve_answer(state, pending, lookup, &outcome),
            _ => Err(TransitionError::UnexpectedResponse(format!(
                "answer for {pending} while {:?}",
                state.phase
            ))),
        },
    }
}

fn start_flow(state: &ChatState, flow: Flow) -> Result<TransitionResult, TransitionError> {
    if state.is_busy() {
        return Err(TransitionError::Busy);
    }
    let mut next = state.clone();
    next.phase = Phase::CreatingSession { flow };
    Ok(TransitionResult::new(next).with_effect(Effect::CreateSession { flow }))
}

/// Replace the session and show the flow's opening turn
fn open_session(
    state: &ChatState,
    catalog: &Catalog,
    flow: Flow,
    session_id: SessionId,
) -> TransitionResult {
    let mut next = state.for_session(session_id.clone());

    let opening = match flow {
        Flow::Main => {
            next.phase = Phase::MenuRoot;
            Turn::choice(MAIN_PROMPT, buttons(catalog, catalog.roots()))
        }
        Flow::Merchant => {
            next.phase = Phase::AnswerShown;
            next.merchant_mode = true;
            Turn::bot(MERCHANT_GUIDE)
        }
    };
    let log = Effect::log_assistant(&session_id, opening.text.clone());
    next.transcript.push(opening);

    TransitionResult::new(next).with_effect(log)
}

fn select_node(
    state: &ChatState,
    catalog: &Catalog,
    id: NodeId,
) -> Result<TransitionResult, TransitionError> {
    let session = active_session(state)?;
    let Some(node) = catalog.node(id) else {
        tracing::debug!(node = id.index(), "Ignoring selection of unknown menu node");
        return Ok(TransitionResult::new(state.clone()));
    };

    match &node.kind {
        NodeKind::Branch {
            display_text,
            children,
        } => Ok(enter_branch(
            state,
            catalog,
            &session,
            id,
            node,
            display_text,
            children,
        )),
        NodeKind::Leaf { question } => Ok(ask(
            state.clone(),
            &session,
            question.clone(),
            None,
            Lookup::Question,
        )),
    }
}

fn enter_branch(
    state: &ChatState,
    catalog: &Catalog,
    session: &SessionId,
    id: NodeId,
    node: &MenuNode,
    display_text: &str,
    children: &[NodeId],
) -> TransitionResult {
    let mut next = state.clone();
    let prompt = node.prompt_text();

    next.transcript.push(Turn::user(display_text));
    next.transcript
        .push(Turn::choice(prompt.clone(), buttons(catalog, children)));
    next.phase = Phase::MenuSub { node: id };

    TransitionResult::new(next).with_effects([
        Effect::log_user(session, display_text),
        Effect::log_assistant(session, prompt),
    ])
}

/// Echo the question, show a placeholder and dispatch the query
fn ask(
    mut next: ChatState,
    session: &SessionId,
    question: String,
    forced_intent: Option<ForcedIntent>,
    lookup: Lookup,
) -> TransitionResult {
    let pending = TransientId(next.next_transient);
    next.next_transient += 1;

    next.transcript.push(Turn::user(question.clone()));
    next.transcript.push(Turn::pending(pending));
    next.phase = Phase::AwaitingAnswer { pending, lookup };

    TransitionResult::new(next).with_effects([
        Effect::log_user(session, question.clone()),
        Effect::AskQuestion {
            session_id: session.clone(),
            question,
            forced_intent,
            pending,
        },
    ])
}

fn resolve_answer(
    state: &ChatState,
    pending: TransientId,
    lookup: Lookup,
    outcome: &AnswerOutcome,
) -> Result<TransitionResult, TransitionError> {
    let session = active_session(state)?;
    let mut next = state.clone();

    let turn = match outcome {
        AnswerOutcome::Answer(text) | AnswerOutcome::NoMatch(text) => Turn::bot(text.clone()),
        AnswerOutcome::Error(text) => Turn::bot_error(text.clone()),
    };
    if !next.transcript.resolve_pending(pending, turn) {
        return Err(TransitionError::UnexpectedResponse(format!(
            "placeholder {pending} is not in the transcript"
        )));
    }

    // A failed or unmatched lookup keeps merchant mode on so the next
    // submit retries it
    if lookup == Lookup::Merchant {
        if let Some(answer) = outcome.usable_answer() {
            next.merchant_result = Some(answer.to_string());
            next.merchant_mode = false;
        }
    }
    next.phase = Phase::AnswerShown;

    Ok(TransitionResult::new(next).with_effect(Effect::log_assistant(&session, outcome.text())))
}

fn active_session(state: &ChatState) -> Result<SessionId, TransitionError> {
    state.session.clone().ok_or(TransitionError::NoSession)
}

fn buttons(catalog: &Catalog, ids: &[NodeId]) -> Vec<Button> {
    ids.iter()
        .filter_map(|id| {
            catalog.node(*id).map(|node| Button {
                label: node.label.clone(),
                node: *id,
            })
        })
        .collect()
}
