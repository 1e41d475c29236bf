//! Onnuri gift-certificate help desk chat client
//!
//! A guided-menu conversation controller in front of a retrieval QA
//! backend, hosted in the terminal.

mod catalog;
mod config;
mod gateway;
mod runtime;
mod shell;
mod state_machine;
mod transcript;
mod view;

use catalog::Catalog;
use config::ChatConfig;
use gateway::{HttpGateway, LoggingGateway};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stderr keeps the chat transcript on stdout clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onnuri_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env()?;

    let catalog = match &config.catalog_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading menu catalog");
            Catalog::from_path(path)?
        }
        None => Catalog::builtin()?,
    };
    tracing::info!(
        categories = catalog.roots().len(),
        nodes = catalog.len(),
        "Menu catalog ready"
    );

    let gateway = LoggingGateway::new(HttpGateway::new(
        &config.gateway_url,
        config.request_timeout,
    )?);
    tracing::info!(url = %config.gateway_url, "Using QA backend");

    let window = runtime::spawn(Arc::new(catalog), gateway);
    shell::run(window.handle, window.views).await?;
    window.task.await?;

    Ok(())
}
