//! Kurobot gateway
//!
//! Serves `POST /chat` and forwards each request, with its replayed
//! history, to Gemini. Holds no conversation state.

use kurobot::api::{create_router, AppState};
use kurobot::config::GatewayConfig;
use kurobot::gateway::CompletionGateway;
use kurobot::llm::{GeminiService, LlmService, LoggingService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kurobot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // A missing credential is fatal: the gateway never starts serving
    let config = GatewayConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid gateway configuration");
    })?;
    tracing::info!(config = ?config, "Configuration loaded");

    let gemini = GeminiService::new(config.api_key.clone(), &config.model, &config.base_url)?;
    tracing::info!(endpoint = %gemini.endpoint(), "Gemini provider ready");
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(gemini)));

    let state = AppState::new(CompletionGateway::new(llm));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Kurobot gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
