//! Client side of the `/chat` round-trip

use crate::api::{ChatRequest, ChatResponse, ErrorResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not reach gateway: {0}")]
    Transport(String),
    #[error("Gateway returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed gateway response: {0}")]
    Decode(String),
    #[error("No reply within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Request cancelled")]
    Cancelled,
}

/// Sends one completion request to the gateway
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError> {
        (**self).complete(request).await
    }
}

/// HTTP client for a running gateway
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
}

impl HttpCompletionClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message =
                serde_json::from_str::<ErrorResponse>(&body).map_or(body, |resp| resp.error);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(reply.response)
    }
}

/// Run one request, giving up on cancellation or after `timeout`
pub async fn complete_with_deadline(
    client: &dyn CompletionClient,
    request: &ChatRequest,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<String, ClientError> {
    tokio::select! {
        () = cancel.cancelled() => Err(ClientError::Cancelled),
        result = tokio::time::timeout(timeout, client.complete(request)) => {
            result.unwrap_or(Err(ClientError::Timeout(timeout)))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockCompletionClient;
    use super::*;
    use crate::api::Turn;

    fn request() -> ChatRequest {
        ChatRequest {
            message: "c".into(),
            history: vec![Turn::user("a"), Turn::model("b")],
        }
    }

    #[tokio::test]
    async fn deadline_passes_reply_through() {
        let client = MockCompletionClient::new();
        client.queue_reply("d");

        let reply = complete_with_deadline(
            &client,
            &request(),
            &CancellationToken::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(reply, "d");
        assert_eq!(client.recorded_requests(), vec![request()]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out() {
        let client = MockCompletionClient::delayed(Duration::from_secs(60));
        client.queue_reply("too late");

        let err = complete_with_deadline(
            &client,
            &request(),
            &CancellationToken::new(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_waiting() {
        let client = MockCompletionClient::delayed(Duration::from_secs(60));
        client.queue_reply("too late");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = complete_with_deadline(&client, &request(), &cancel, Duration::from_secs(120))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Cancelled));
    }
}
