//! Entry point for the `covaccine-notifier` binary.
//! Polls CoWIN for open vaccination sessions and forwards them to the chosen channel.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slot_scan::{CowinClient, ScanExecutor, SearchRequest};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    log::info!("🚀 Starting covaccine notifier...");

    let criteria = SearchRequest::from(cli.search)
        .into_criteria()
        .context("Invalid search options")?;

    let notifier = cli
        .channel
        .connect()
        .await
        .with_context(|| format!("Failed to set up {} notifications", cli.channel.name()))?;
    log::info!("📨 {} notifier ready", cli.channel.name());

    let client = CowinClient::with_config(cli.http.client_config())
        .context("Failed to build CoWIN client")?;
    log::info!("🌐 Using CoWIN API at {}", client.base_url());

    let mut executor = ScanExecutor::new(Arc::new(client), notifier, criteria, None);

    tokio::select! {
        result = executor.start() => {
            result.context("Slot search stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("👋 Interrupted, shutting down");
        }
    }

    Ok(())
}
