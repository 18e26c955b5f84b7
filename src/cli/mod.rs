use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::{AppConfig, load_dotenv};
use crate::google::GmailClient;
use crate::jobs::{AutoReply, random_interval, spawn_periodic_job};
use crate::mailbox::Mailbox;
use crate::reply::ReplyEngine;

/// Sends a one-time out of office reply to everyone with unread mail in
/// the inbox.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {}

pub async fn run() -> Result<()> {
    let _cli = Cli::parse();

    // Before the subscriber so RUST_LOG can be set in .env too
    let dotenv_err = load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(e) = dotenv_err {
        tracing::warn!("Failed to load .env file: {}", e);
    }
    let config = AppConfig::from_env()?;

    let mailbox: Arc<dyn Mailbox> = Arc::new(GmailClient::new(&config));
    let engine = Arc::new(ReplyEngine::new(mailbox, &config.my_email));

    let interval = random_interval();
    let handle = spawn_periodic_job(Arc::new(AutoReply::new(engine, interval)));
    tracing::info!(
        "App started, checking {} for new emails every {}s",
        config.my_email,
        interval.as_secs()
    );

    tokio::select! {
        res = handle => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received signal, shutting down");
        }
    }

    Ok(())
}
