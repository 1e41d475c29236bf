//! Wire types shared by every gateway implementation

use super::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend conversation token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hint overriding the backend's question classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcedIntent {
    #[serde(rename = "MERCHANT_DATA")]
    MerchantData,
}

impl ForcedIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            ForcedIntent::MerchantData => "MERCHANT_DATA",
        }
    }
}

/// Author of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub question: String,
    pub session_id: SessionId,
    pub forced_intent: Option<ForcedIntent>,
}

/// Reply from the question endpoint
///
/// The backend returns either `{answer, ...}` or `{error}`; extra fields
/// are kept as metadata and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "type")]
    pub answer_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// `type` of a reply reporting that nothing matched the question
pub const NO_MATCH_TYPE: &str = "NO_MATCH";

impl QueryReply {
    #[cfg(test)]
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.answer_type.as_deref() == Some(NO_MATCH_TYPE)
    }

    /// Extract the answer text, turning an error payload into an error
    pub fn into_answer(self) -> Result<String, GatewayError> {
        match (self.answer, self.error) {
            (Some(answer), _) => Ok(answer),
            (None, Some(error)) => Err(GatewayError::backend(error)),
            (None, None) => Err(GatewayError::malformed("reply has neither answer nor error")),
        }
    }
}

/// Body of a message-log call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub session_id: SessionId,
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateSessionReply {
    pub session_id: String,
}
