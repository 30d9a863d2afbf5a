//! Domain types for the relay.
//!
//! This module contains the core data structures:
//! - Submission: the trigger envelope and the event it carries
//! - Outcome: template selection, delivery status and pipeline stages
//! - Record: the ledger row written per invocation

pub mod outcome;
pub mod record;
pub mod submission;

// Re-export commonly used types
pub use outcome::{DeliveryStatus, MailStatus, PublishResult, Stage};
pub use record::LedgerRecord;
pub use submission::{SubmissionEvent, TriggerEnvelope};
