//! submission-relay binary: runs one trigger envelope through the relay
//! pipeline, or inspects the ledger and configuration.
//!
//! Logs go to stderr; stdout carries only command output (the trace id for
//! `handle`).

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use submission_relay::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Cli::parse().execute().await
}
