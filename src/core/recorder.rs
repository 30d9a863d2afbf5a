//! Best-effort outcome recorder.
//!
//! The ledger is not on the critical path of what the submitter sees, so a
//! failed write comes back as [`RecordOutcome::Skipped`] instead of an error.

use std::sync::Arc;

use tracing::{error, info};

use super::ledger::Ledger;
use crate::domain::{DeliveryStatus, LedgerRecord, SubmissionEvent};

/// What happened to the ledger write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Written(LedgerRecord),
    Skipped { reason: String },
}

impl RecordOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

pub struct Recorder {
    ledger: Arc<dyn Ledger>,
}

impl Recorder {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Append one row for this invocation
    pub async fn record(&self, event: &SubmissionEvent, mail_status: DeliveryStatus) -> RecordOutcome {
        let record = match LedgerRecord::new(event, mail_status) {
            Ok(record) => record,
            Err(e) => {
                error!(submission_id = event.label(), error = %e, "Error while updating ledger");
                return RecordOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        match self.ledger.put(&record).await {
            Ok(()) => {
                info!(
                    submission_id = %record.submission_id,
                    mail_status = %record.mail_status,
                    "Updated ledger"
                );
                RecordOutcome::Written(record)
            }
            Err(e) => {
                error!(submission_id = %record.submission_id, error = %e, "Error while updating ledger");
                RecordOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }
}
