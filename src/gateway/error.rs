//! Gateway error types

use thiserror::Error;

/// Text rendered in place of an answer when the backend could not be reached
pub const FAILURE_TEXT: &str = "API 호출 실패";

/// Gateway error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn status(code: u16, body: &str) -> Self {
        Self::new(GatewayErrorKind::Status(code), format!("HTTP {code}: {body}"))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Malformed, message)
    }

    /// The backend answered with an explicit `error` payload
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Backend, message)
    }

    /// Content shown to the user in place of the answer
    pub fn display_text(&self) -> String {
        match self.kind {
            GatewayErrorKind::Backend if !self.message.trim().is_empty() => self.message.clone(),
            _ => FAILURE_TEXT.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            GatewayError::network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            GatewayError::malformed(format!("Failed to decode response: {e}"))
        } else {
            GatewayError::network(format!("Request failed: {e}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection refused, timeout, DNS
    Network,
    /// Non-success HTTP status
    Status(u16),
    /// Response body did not have the expected shape
    Malformed,
    /// Backend reported an error in a well-formed reply
    Backend,
}
