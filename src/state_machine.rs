//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition(state, catalog, event)` returns the next state plus the
//! effects the runtime must perform. Nothing in here does I/O.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, HostNotice};
pub use event::{AnswerOutcome, Event, MenuItem};
pub use state::{ChatState, Flow, Lookup, Phase};
pub use transition::transition;
