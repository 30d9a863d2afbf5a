//! Command-line interface for submission-relay.
//!
//! Hosts the pipeline outside a serverless runtime: feed it a trigger
//! envelope, inspect the ledger, or dump the resolved configuration.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::RelayConfig;
use crate::core::{JsonlLedger, Ledger, Orchestrator};

/// submission-relay - fetch, publish, notify and record one submission
#[derive(Parser, Debug)]
#[command(name = "submission-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .submission-relay/config.yaml discovery)
    #[arg(short, long, global = true, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one trigger envelope
    Handle {
        /// Envelope file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show ledger rows
    Ledger {
        /// Only rows for this submission
        #[arg(short, long)]
        submission_id: Option<String>,

        /// Maximum number of rows to show (most recent)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = RelayConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        match self.command {
            Commands::Handle { input } => handle_envelope(&config, input).await,
            Commands::Ledger {
                submission_id,
                limit,
            } => show_ledger(&config, submission_id.as_deref(), limit).await,
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }
}

/// Run the pipeline for one envelope and print the trace id
async fn handle_envelope(config: &RelayConfig, input_file: Option<PathBuf>) -> Result<()> {
    let payload = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe an envelope to stdin");
    };

    if payload.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }

    let orchestrator = Orchestrator::from_config(config)?;
    let trace_id = orchestrator.handle(&payload).await?;
    println!("{}", trace_id);

    Ok(())
}

/// Print ledger rows, newest last
async fn show_ledger(config: &RelayConfig, submission_id: Option<&str>, limit: usize) -> Result<()> {
    let ledger = JsonlLedger::new(config.ledger_dir());
    let rows = match submission_id {
        Some(id) => ledger.find(id).await,
        None => ledger.scan().await,
    }
    .with_context(|| format!("Failed to read ledger: {}", ledger.table_path().display()))?;

    if rows.is_empty() {
        println!("No ledger rows found");
        return Ok(());
    }

    println!(
        "{:<24} {:<14} {:<28} {:<8} {}",
        "SUBMISSION", "ASSIGNMENT", "EMAIL", "MAIL", "TIMESTAMP"
    );
    println!("{}", "-".repeat(100));

    let skip = rows.len().saturating_sub(limit);
    for row in rows.iter().skip(skip) {
        println!(
            "{:<24} {:<14} {:<28} {:<8} {}",
            row.submission_id,
            row.assignment_id,
            row.email_id,
            row.mail_status,
            row.timestamp.to_rfc3339()
        );
    }

    Ok(())
}

fn show_config(config: &RelayConfig) {
    println!("submission-relay configuration");
    println!("{}", "-".repeat(40));
    println!("{}", config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_handle_with_global_config() {
        let cli = Cli::try_parse_from([
            "submission-relay",
            "handle",
            "--input",
            "event.json",
            "--config",
            "relay.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("relay.yaml")));
        match cli.command {
            Commands::Handle { input } => assert_eq!(input, Some(PathBuf::from("event.json"))),
            other => panic!("expected handle, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ledger_defaults_and_filters() {
        let cli = Cli::try_parse_from(["submission-relay", "ledger"]).unwrap();
        match cli.command {
            Commands::Ledger {
                submission_id,
                limit,
            } => {
                assert!(submission_id.is_none());
                assert_eq!(limit, 20);
            }
            other => panic!("expected ledger, got {:?}", other),
        }

        let cli =
            Cli::try_parse_from(["submission-relay", "ledger", "-s", "s1", "-l", "5"]).unwrap();
        match cli.command {
            Commands::Ledger {
                submission_id,
                limit,
            } => {
                assert_eq!(submission_id.as_deref(), Some("s1"));
                assert_eq!(limit, 5);
            }
            other => panic!("expected ledger, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["submission-relay", "run", "hello"]).is_err());
    }
}
