//! Completion gateway
//!
//! Relays a message plus its full prior history to the model provider and
//! returns the reply text. Nothing survives a call: each one builds a fresh
//! provider request from the caller's history.

use crate::api::{Role, Turn};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService, MessageRole};
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle of one gateway request, recorded in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Forwarding,
    Succeeded,
    Failed,
}

impl RequestPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Forwarding => "forwarding",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Provider failed: {0}")]
    Provider(#[from] LlmError),
}

/// Stateless relay between chat clients and the model provider
#[derive(Clone)]
pub struct CompletionGateway {
    llm: Arc<dyn LlmService>,
}

impl CompletionGateway {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    /// Complete `message` in the context of `history`.
    ///
    /// The provider sees `history` verbatim and in order, followed by
    /// `message` as the newest user turn. Its text is returned unchanged.
    pub async fn complete(&self, message: &str, history: &[Turn]) -> Result<String, GatewayError> {
        log_phase(RequestPhase::Received, history.len());

        let request = match build_request(message, history) {
            Ok(request) => request,
            Err(e) => {
                log_phase(RequestPhase::Failed, history.len());
                return Err(e);
            }
        };

        log_phase(RequestPhase::Forwarding, history.len());
        match self.llm.complete(&request).await {
            Ok(response) => {
                log_phase(RequestPhase::Succeeded, history.len());
                Ok(response.text())
            }
            Err(e) => {
                log_phase(RequestPhase::Failed, history.len());
                Err(GatewayError::Provider(e))
            }
        }
    }
}

fn log_phase(phase: RequestPhase, history_len: usize) {
    tracing::info!(phase = phase.as_str(), history_len, "Gateway request phase");
}

/// Build a self-contained provider request from the caller's history
pub fn build_request(message: &str, history: &[Turn]) -> Result<LlmRequest, GatewayError> {
    if message.trim().is_empty() {
        return Err(GatewayError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }

    let mut messages = Vec::with_capacity(history.len() + 1);
    for (index, turn) in history.iter().enumerate() {
        if turn.parts.is_empty() {
            return Err(GatewayError::InvalidInput(format!(
                "history turn {index} has no parts"
            )));
        }
        messages.push(LlmMessage {
            role: match turn.role {
                Role::User => MessageRole::User,
                Role::Model => MessageRole::Model,
            },
            content: turn.parts.iter().map(|p| p.text.clone()).collect(),
        });
    }
    messages.push(LlmMessage::user(message));

    Ok(LlmRequest::new(messages))
}
