//! Chat runtime executor

use super::ViewEvent;
use crate::catalog::Catalog;
use crate::gateway::{LogEntry, QueryRequest, SessionGateway};
use crate::state_machine::{
    transition, AnswerOutcome, ChatState, Effect, Event, HostNotice,
};
use crate::view::ChatView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for queued log appends
const LOG_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Event loop for one chat window, generic over the backend gateway
pub struct ChatRuntime<G: SessionGateway + 'static> {
    state: ChatState,
    catalog: Arc<Catalog>,
    gateway: Arc<G>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<ViewEvent>,
    /// Log appends, drained in order by a single writer task
    log_tx: mpsc::UnboundedSender<LogEntry>,
    log_rx: Option<mpsc::UnboundedReceiver<LogEntry>>,
    /// Cancelled when the window closes; stops the loop and in-flight calls
    shutdown: CancellationToken,
}

impl<G: SessionGateway + 'static> ChatRuntime<G> {
    pub fn new(
        catalog: Arc<Catalog>,
        gateway: G,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<ViewEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        Self {
            state: ChatState::new(),
            catalog,
            gateway: Arc::new(gateway),
            event_rx,
            event_tx,
            broadcast_tx,
            log_tx,
            log_rx: Some(log_rx),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(categories = self.catalog.roots().len(), "Starting chat runtime");

        let log_writer = self
            .log_rx
            .take()
            .map(|rx| tokio::spawn(write_logs(self.gateway.clone(), rx)));

        self.publish();
        self.process_event(Event::StartMainFlow);

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => self.process_event(event),

                else => break,
            }
        }

        // Stop in-flight gateway calls, then let queued log appends drain
        self.shutdown.cancel();
        let _ = self.broadcast_tx.send(ViewEvent::Closed);
        let Self { log_tx, .. } = self;
        drop(log_tx);
        if let Some(writer) = log_writer {
            if tokio::time::timeout(LOG_FLUSH_TIMEOUT, writer).await.is_err() {
                tracing::warn!("Gave up flushing message log on shutdown");
            }
        }

        tracing::info!("Chat runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.catalog, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejections are user-facing (e.g., "a request is in progress")
                tracing::warn!(error = %e, phase = ?self.state.phase, "Rejected event");
                let _ = self.broadcast_tx.send(ViewEvent::Rejected {
                    message: e.to_string(),
                });
                return;
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish();
    }

    fn publish(&self) {
        let view = ChatView::from_state(&self.state, &self.catalog);
        let _ = self.broadcast_tx.send(ViewEvent::Snapshot(view));
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::CreateSession { flow } => {
                let gateway = self.gateway.clone();
                let event_tx = self.event_tx.clone();
                let shutdown = self.shutdown.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = shutdown.cancelled() => {
                            tracing::debug!(?flow, "Session creation abandoned on shutdown");
                        }

                        result = gateway.create_session() => {
                            let event = match result {
                                Ok(session_id) => Event::SessionCreated { flow, session_id },
                                Err(e) => Event::SessionFailed {
                                    flow,
                                    message: e.display_text(),
                                },
                            };
                            let _ = event_tx.send(event).await;
                        }
                    }
                });
            }

            Effect::AskQuestion {
                session_id,
                question,
                forced_intent,
                pending,
            } => {
                let gateway = self.gateway.clone();
                let event_tx = self.event_tx.clone();
                let shutdown = self.shutdown.clone();
                let request = QueryRequest {
                    question,
                    session_id,
                    forced_intent,
                };

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = shutdown.cancelled() => {
                            tracing::debug!(%pending, "Question abandoned on shutdown");
                        }

                        result = gateway.ask_question(&request) => {
                            let outcome = AnswerOutcome::from(result);
                            let _ = event_tx.send(Event::AnswerReceived { pending, outcome }).await;
                        }
                    }
                });
            }

            Effect::LogMessage {
                session_id,
                role,
                text,
            } => {
                let entry = LogEntry {
                    session_id,
                    role,
                    message: text,
                };
                if self.log_tx.send(entry).is_err() {
                    tracing::warn!("Message log writer has stopped, dropping entry");
                }
            }

            Effect::NotifyHost(HostNotice::CloseRequested) => {
                tracing::info!("Close requested, shutting down");
                self.shutdown.cancel();
            }
        }
    }
}

/// Append log entries one at a time, in the order they were queued
async fn write_logs<G: SessionGateway>(
    gateway: Arc<G>,
    mut rx: mpsc::UnboundedReceiver<LogEntry>,
) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = gateway.log_message(&entry).await {
            tracing::debug!(error = %e, "Log append failed, continuing");
        }
    }
}
