//! Remote session/query gateway
//!
//! The backend owns retrieval, ranking and the durable message log. The
//! controller only sees it through [`SessionGateway`].

mod error;
mod http;
mod types;

pub use error::GatewayError;
#[cfg(test)]
pub use error::{GatewayErrorKind, FAILURE_TEXT};
pub use http::HttpGateway;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Backend operations consumed by the conversation runtime
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Open a new backend conversation
    async fn create_session(&self) -> Result<SessionId, GatewayError>;

    /// Ask a question within a session
    async fn ask_question(&self, request: &QueryRequest) -> Result<QueryReply, GatewayError>;

    /// Append a message to the session's durable log
    async fn log_message(&self, entry: &LogEntry) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: SessionGateway + ?Sized> SessionGateway for Arc<T> {
    async fn create_session(&self) -> Result<SessionId, GatewayError> {
        (**self).create_session().await
    }

    async fn ask_question(&self, request: &QueryRequest) -> Result<QueryReply, GatewayError> {
        (**self).ask_question(request).await
    }

    async fn log_message(&self, entry: &LogEntry) -> Result<(), GatewayError> {
        (**self).log_message(entry).await
    }
}

/// Tracing wrapper for any gateway
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: SessionGateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: SessionGateway> SessionGateway for LoggingGateway<G> {
    async fn create_session(&self) -> Result<SessionId, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.create_session().await;
        let duration = start.elapsed();

        match &result {
            Ok(session_id) => tracing::info!(
                session_id = %session_id,
                duration_ms = %duration.as_millis(),
                "Session created"
            ),
            Err(e) => tracing::error!(
                duration_ms = %duration.as_millis(),
                error = %e.message,
                "Session creation failed"
            ),
        }

        result
    }

    async fn ask_question(&self, request: &QueryRequest) -> Result<QueryReply, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask_question(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => tracing::info!(
                session_id = %request.session_id,
                forced_intent = ?request.forced_intent,
                answer_type = ?reply.answer_type,
                duration_ms = %duration.as_millis(),
                "Question answered"
            ),
            Err(e) => tracing::error!(
                session_id = %request.session_id,
                forced_intent = ?request.forced_intent,
                duration_ms = %duration.as_millis(),
                error = %e.message,
                "Question failed"
            ),
        }

        result
    }

    async fn log_message(&self, entry: &LogEntry) -> Result<(), GatewayError> {
        let result = self.inner.log_message(entry).await;
        if let Err(e) = &result {
            tracing::warn!(
                session_id = %entry.session_id,
                role = ?entry.role,
                error = %e.message,
                "Message log append failed"
            );
        }
        result
    }
}
