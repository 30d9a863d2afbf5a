//! Core pipeline logic.
//!
//! This module contains:
//! - Fetcher: Source download with a bounded redirect hop
//! - Publisher: Deterministic object keys over an [`ObjectStore`](crate::adapters::ObjectStore)
//! - Notifier: Status emails over a [`MailTransport`](crate::adapters::MailTransport)
//! - Ledger / Recorder: Append-only outcome rows
//! - Orchestrator: Stage sequencing and failure routing

pub mod fetcher;
pub mod ledger;
pub mod notifier;
pub mod orchestrator;
pub mod publisher;
pub mod recorder;

// Re-export commonly used types
pub use fetcher::{Fetcher, StagedFile, TransferError, TransferOutcome, MAX_REDIRECT_HOPS};
pub use ledger::{JsonlLedger, Ledger, LedgerError, MemoryLedger, LEDGER_TABLE};
pub use notifier::{eastern_time, Notifier};
pub use orchestrator::{Invocation, Orchestrator};
pub use publisher::{destination_key, Publisher};
pub use recorder::{RecordOutcome, Recorder};
