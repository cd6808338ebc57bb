//! Kurobot terminal chat client

use kurobot::client::HttpCompletionClient;
use kurobot::config::ClientConfig;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    // The terminal belongs to the UI, so logs go to a file
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kurobot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    tracing::info!(
        gateway = %config.gateway_url,
        timeout_secs = config.request_timeout.as_secs(),
        clear_policy = ?config.clear_policy,
        "Starting chat client"
    );

    let client = Arc::new(HttpCompletionClient::new(config.chat_endpoint())?);
    kurobot::tui::run(&config, client).await?;

    tracing::info!("Chat client exited");
    Ok(())
}
