//! Runtime for a chat window
//!
//! A single task owns the [`ChatState`](crate::state_machine::ChatState),
//! applies transitions in arrival order and executes their effects. Gateway
//! calls run as background tasks that post their completion back as an
//! event, so the pending placeholder is rendered while a call is in flight.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;

use crate::catalog::Catalog;
use crate::gateway::SessionGateway;
use crate::state_machine::Event;
use crate::view::ChatView;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Updates sent to the host
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Presentation state after a transition
    Snapshot(ChatView),
    /// An event was rejected; state is unchanged
    Rejected { message: String },
    /// The window was closed and the runtime is shutting down
    Closed,
}

#[derive(Debug, Error)]
#[error("chat runtime has stopped")]
pub struct RuntimeStopped;

/// Handle to interact with a running chat window
#[derive(Clone)]
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    shutdown: CancellationToken,
}

impl ChatHandle {
    pub async fn send(&self, event: Event) -> Result<(), RuntimeStopped> {
        self.event_tx.send(event).await.map_err(|_| RuntimeStopped)
    }

    /// True once close was requested, before the runtime has drained
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// A spawned chat window
pub struct ChatWindow {
    pub handle: ChatHandle,
    /// Subscribed before the runtime starts, so the opening turn is not missed
    pub views: broadcast::Receiver<ViewEvent>,
    pub task: JoinHandle<()>,
}

/// Spawn the runtime for one chat window. The main flow starts immediately.
pub fn spawn<G: SessionGateway + 'static>(catalog: Arc<Catalog>, gateway: G) -> ChatWindow {
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, views) = broadcast::channel(128);
    let shutdown = CancellationToken::new();

    let runtime = ChatRuntime::new(
        catalog,
        gateway,
        event_rx,
        event_tx.clone(),
        broadcast_tx,
        shutdown.clone(),
    );
    let task = tokio::spawn(runtime.run());

    ChatWindow {
        handle: ChatHandle { event_tx, shutdown },
        views,
        task,
    }
}
