//! submission-relay - Event-triggered submission relay
//!
//! Receives a submission event, downloads the submitted file, republishes it
//! to object storage under a deterministic key, emails the submitter and
//! appends the outcome to a ledger.
//!
//! # Pipeline
//!
//! Each invocation walks a fixed sequence of stages:
//! - fetch the submission URL (at most one redirect hop)
//! - publish to `uploads/{email}/{assignment}/{submission}.zip`
//! - send the SUCCESS, FAILED or EMPTY_FILE template email
//! - append a ledger row with the delivery status
//!
//! # Modules
//!
//! - `adapters`: External system integrations (GCS, SendGrid, in-memory doubles)
//! - `core`: Pipeline stages and the orchestrator
//! - `domain`: Data structures (SubmissionEvent, LedgerRecord, outcomes)
//! - `config`: Layered configuration
//! - `cli`: Command-line harness
//!
//! # Usage
//!
//! ```bash
//! # Handle one trigger envelope
//! submission-relay handle --input event.json
//!
//! # Inspect the ledger
//! submission-relay ledger --submission-id s1
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use crate::config::RelayConfig;
pub use crate::core::{Invocation, Orchestrator};
pub use domain::{DeliveryStatus, LedgerRecord, MailStatus, Stage, SubmissionEvent};
pub use error::{RelayError, Result};
