//! HTTP API for the completion gateway

mod handlers;
mod types;

pub use handlers::{create_router, PROVIDER_FAILURE_MESSAGE};
pub use types::*;

use crate::gateway::CompletionGateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: CompletionGateway,
}

impl AppState {
    pub fn new(gateway: CompletionGateway) -> Self {
        Self { gateway }
    }
}
