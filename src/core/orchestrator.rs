//! Pipeline orchestrator.
//!
//! Sequences fetch → publish → notify → record for one trigger envelope.
//! Stages run strictly one after another; each completion gates the next.
//!
//! Failure routing:
//! - malformed envelope: propagate, nothing sent
//! - fetch failure: FAILED / EMPTY_FILE email, then propagate
//! - publish failure: propagate, nothing sent
//! - delivery and ledger failures: absorbed, invocation succeeds

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{GcsStore, SendGridMailer};
use crate::config::RelayConfig;
use crate::domain::{DeliveryStatus, MailStatus, PublishResult, Stage, SubmissionEvent};
use crate::error::RelayError;

use super::fetcher::{Fetcher, StagedFile, TransferOutcome};
use super::ledger::JsonlLedger;
use super::notifier::Notifier;
use super::publisher::Publisher;
use super::recorder::{RecordOutcome, Recorder};

/// Trace of one completed invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub trace_id: Uuid,
    pub stage: Stage,
    pub destination: Option<PublishResult>,
    pub delivery: Option<DeliveryStatus>,
    pub record: Option<RecordOutcome>,
}

impl Invocation {
    fn new(trace_id: Uuid) -> Self {
        Self {
            trace_id,
            stage: Stage::Start,
            destination: None,
            delivery: None,
            record: None,
        }
    }

    fn advance(&mut self, next: Stage) {
        if !self.stage.can_advance_to(next) {
            warn!(trace_id = %self.trace_id, from = %self.stage, to = %next, "Unexpected stage transition");
        }
        info!(trace_id = %self.trace_id, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    fetcher: Fetcher,
    publisher: Publisher,
    notifier: Notifier,
    recorder: Recorder,
    /// Directory for invocation-scoped staging files
    scratch_dir: PathBuf,
}

impl Orchestrator {
    /// Assemble from explicit components
    pub fn new(
        fetcher: Fetcher,
        publisher: Publisher,
        notifier: Notifier,
        recorder: Recorder,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            publisher,
            notifier,
            recorder,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Production wiring: GCS, SendGrid and the JSONL ledger.
    ///
    /// Credentials and template ids are not checked here; each component
    /// reports them missing when it first needs them.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let fetcher = Fetcher::new()?;
        let publisher = Publisher::new(Arc::new(GcsStore::new(config.storage.clone())));
        let notifier = Notifier::new(Arc::new(SendGridMailer::new(&config.mail)), &config.mail);
        let recorder = Recorder::new(Arc::new(JsonlLedger::new(config.ledger_dir())));

        Ok(Self::new(
            fetcher,
            publisher,
            notifier,
            recorder,
            config.scratch_dir.clone(),
        ))
    }

    /// Staging file for a submission; path separators in the id are flattened
    pub fn staging_path(&self, submission_id: &str) -> PathBuf {
        let file_stem: String = submission_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.scratch_dir.join(format!("{}.zip", file_stem))
    }

    /// Handle one trigger envelope and return the invocation's trace id
    pub async fn handle(&self, payload: &str) -> Result<String, RelayError> {
        let trace_id = Uuid::new_v4();
        info!(%trace_id, "Start of handler");

        let result = match SubmissionEvent::from_envelope(payload) {
            Ok(event) => self.run(&event, trace_id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(invocation) => {
                info!(%trace_id, stage = %invocation.stage, "End of handler");
                Ok(trace_id.to_string())
            }
            Err(e) => {
                error!(%trace_id, error = %e, "Error in handler");
                Err(e)
            }
        }
    }

    /// Run the pipeline for a parsed event
    #[instrument(skip(self, event), fields(submission_id = %event.label()))]
    pub async fn run(&self, event: &SubmissionEvent, trace_id: Uuid) -> Result<Invocation, RelayError> {
        let mut invocation = Invocation::new(trace_id);

        let staged = match self.fetch_stage(event).await {
            Ok(staged) => staged,
            Err(e) => {
                invocation.advance(Stage::Failed);
                return Err(e);
            }
        };
        invocation.advance(Stage::Fetched);

        let published = match self.publish_stage(event, &staged).await {
            Ok(published) => published,
            Err(e) => {
                invocation.advance(Stage::Failed);
                return Err(e);
            }
        };
        invocation.advance(Stage::Published);

        let delivery = self
            .notifier
            .notify(event, MailStatus::Success, Some(&published.key))
            .await;
        invocation.destination = Some(published);
        invocation.delivery = Some(delivery);
        invocation.advance(Stage::Notified);

        // Recorded whatever the delivery status was
        let record = self.recorder.record(event, delivery).await;
        if let RecordOutcome::Skipped { reason } = &record {
            warn!(%trace_id, %reason, "Ledger write skipped; invocation still succeeds");
        }
        invocation.record = Some(record);
        invocation.advance(Stage::Recorded);

        Ok(invocation)
    }

    /// Fetch, sending the matching failure email before any error returns
    async fn fetch_stage(&self, event: &SubmissionEvent) -> Result<StagedFile, RelayError> {
        let (submission_id, url) = match (event.submission_id(), event.submission_url()) {
            (Ok(id), Ok(url)) => (id, url),
            (Err(e), _) | (_, Err(e)) => {
                self.notify_fetch_failure(event, MailStatus::Failed).await;
                return Err(e);
            }
        };

        let destination = self.staging_path(submission_id);
        match self.fetcher.fetch(url, &destination).await {
            TransferOutcome::Staged(staged) => Ok(staged),
            TransferOutcome::Empty { path } => {
                self.notify_fetch_failure(event, MailStatus::EmptyFile).await;
                Err(RelayError::EmptyResource {
                    url: url.to_string(),
                    path,
                })
            }
            TransferOutcome::Failed(e) => {
                self.notify_fetch_failure(event, MailStatus::Failed).await;
                Err(e.into())
            }
        }
    }

    async fn notify_fetch_failure(&self, event: &SubmissionEvent, status: MailStatus) {
        let delivery = self.notifier.notify(event, status, None).await;
        info!(outcome = %status, delivery = %delivery, "Fetch failure notification attempted");
    }

    /// Publish; no email on failure
    async fn publish_stage(
        &self,
        event: &SubmissionEvent,
        staged: &StagedFile,
    ) -> Result<PublishResult, RelayError> {
        let email_id = event.email_id()?;
        let assignment_id = event.assignment_id()?;
        let submission_id = event.submission_id()?;

        let published = self
            .publisher
            .publish(&staged.path, email_id, assignment_id, submission_id)
            .await?;
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, RecordingMailer};
    use crate::config::MailSettings;
    use crate::core::ledger::MemoryLedger;

    fn orchestrator(scratch: &str) -> Orchestrator {
        Orchestrator::new(
            Fetcher::new().unwrap(),
            Publisher::new(Arc::new(MemoryStore::new())),
            Notifier::new(Arc::new(RecordingMailer::new()), &MailSettings::default()),
            Recorder::new(Arc::new(MemoryLedger::new())),
            scratch,
        )
    }

    #[test]
    fn test_staging_path_is_scoped_by_submission() {
        let orchestrator = orchestrator("/tmp/relay");
        assert_eq!(
            orchestrator.staging_path("s1"),
            PathBuf::from("/tmp/relay/s1.zip")
        );
        assert_eq!(
            orchestrator.staging_path("../etc/passwd"),
            PathBuf::from("/tmp/relay/.._etc_passwd.zip")
        );
    }

    #[test]
    fn test_invocation_starts_at_start() {
        let mut invocation = Invocation::new(Uuid::new_v4());
        assert_eq!(invocation.stage, Stage::Start);

        invocation.advance(Stage::Fetched);
        invocation.advance(Stage::Failed);
        assert!(invocation.stage.is_terminal());
    }
}
