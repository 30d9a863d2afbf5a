//! Ledger rows.
//!
//! One row is appended per invocation that reaches the recorder. Rows are
//! never updated or deleted; re-running a submission appends another row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::DeliveryStatus;
use super::submission::SubmissionEvent;
use crate::error::RelayError;

/// A persisted outcome row, keyed by `submission_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub submission_id: String,

    pub assignment_id: String,

    pub submission_url: String,

    pub email_id: String,

    /// Write time, epoch milliseconds on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Result of the send call, not of the submission
    pub mail_status: DeliveryStatus,
}

impl LedgerRecord {
    /// Build a row stamped with the current time
    pub fn new(event: &SubmissionEvent, mail_status: DeliveryStatus) -> Result<Self, RelayError> {
        Self::at(event, mail_status, Utc::now())
    }

    pub fn at(
        event: &SubmissionEvent,
        mail_status: DeliveryStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, RelayError> {
        Ok(Self {
            submission_id: event.submission_id()?.to_string(),
            assignment_id: event.assignment_id()?.to_string(),
            submission_url: event.submission_url()?.to_string(),
            email_id: event.email_id()?.to_string(),
            timestamp,
            mail_status,
        })
    }
}
