//! HTTP gateway for the retrieval backend

use super::types::CreateSessionReply;
use super::{GatewayError, LogEntry, QueryReply, QueryRequest, SessionGateway, SessionId};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Gateway speaking the backend's JSON-over-HTTP API
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

/// Read the body, failing on non-success status or an unexpected shape
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(GatewayError::status(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| GatewayError::malformed(format!("Failed to parse response: {e} - body: {body}")))
}

#[async_trait]
impl SessionGateway for HttpGateway {
    async fn create_session(&self) -> Result<SessionId, GatewayError> {
        let response = self.client.post(self.url("new_chat_session")).send().await?;
        let reply: CreateSessionReply = read_json(response).await?;
        if reply.session_id.is_empty() {
            return Err(GatewayError::malformed("empty session_id"));
        }
        Ok(SessionId::new(reply.session_id))
    }

    async fn ask_question(&self, request: &QueryRequest) -> Result<QueryReply, GatewayError> {
        let mut query = vec![("session_id", request.session_id.as_str())];
        if let Some(intent) = request.forced_intent {
            query.push(("forced_intent", intent.as_str()));
        }

        let response = self
            .client
            .post(self.url("rag_query"))
            .query(&query)
            .json(&json!({ "question": request.question }))
            .send()
            .await?;

        read_json(response).await
    }

    async fn log_message(&self, entry: &LogEntry) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url("save_system_message"))
            .json(entry)
            .send()
            .await?;

        // The acknowledgement body carries nothing we use
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::status(status.as_u16(), &body));
        }
        Ok(())
    }
}
