//! Status-email notifier.
//!
//! Picks a template by [`MailStatus`], fills the template data and sends
//! through a [`MailTransport`]. The returned [`DeliveryStatus`] reflects only
//! whether the send call worked; errors never escape this stage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use tracing::{error, info};

use crate::adapters::{MailError, MailTransport, TemplateData, TemplatedMessage};
use crate::config::{MailSettings, TemplateSet};
use crate::domain::{DeliveryStatus, MailStatus, SubmissionEvent};

/// en-US locale rendering, e.g. `1/15/2024, 12:30:05 PM`
const TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Render a timestamp as US Eastern wall-clock time
pub fn eastern_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&New_York).format(TIME_FORMAT).to_string()
}

pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    templates: TemplateSet,
    sender: String,
    unsubscribe_group: u32,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, settings: &MailSettings) -> Self {
        Self {
            transport,
            templates: settings.templates.clone(),
            sender: settings.sender.clone(),
            unsubscribe_group: settings.unsubscribe_group,
        }
    }

    /// Send the status email for `outcome`
    pub async fn notify(
        &self,
        event: &SubmissionEvent,
        outcome: MailStatus,
        artifact_url: Option<&str>,
    ) -> DeliveryStatus {
        let result = match self.build_message(event, outcome, artifact_url, Utc::now()) {
            Ok(message) => self.transport.send(&message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(
                    to = event.email_id.as_deref().unwrap_or_default(),
                    outcome = %outcome,
                    transport = self.transport.name(),
                    "Email sent to {} for assignment {}",
                    event.email_id.as_deref().unwrap_or_default(),
                    event.assignment_name.as_deref().unwrap_or_default()
                );
                DeliveryStatus::Success
            }
            Err(e) => {
                error!(
                    outcome = %outcome,
                    error = %e,
                    "Failed to send email to {} for assignment {}",
                    event.email_id.as_deref().unwrap_or("<unknown>"),
                    event.assignment_name.as_deref().unwrap_or_default()
                );
                DeliveryStatus::Failed
            }
        }
    }

    fn build_message(
        &self,
        event: &SubmissionEvent,
        outcome: MailStatus,
        artifact_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<TemplatedMessage, MailError> {
        let template_id = self.templates.for_status(outcome)?;

        let to = event
            .email_id
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(MailError::MissingRecipient)?;

        let url = match outcome {
            MailStatus::Success => artifact_url.map(str::to_string),
            MailStatus::Failed | MailStatus::EmptyFile => None,
        };

        Ok(TemplatedMessage {
            to: to.to_string(),
            from: self.sender.clone(),
            template_id: template_id.to_string(),
            data: TemplateData {
                assignment_name: event.assignment_name.clone(),
                submission_id: event.submission_id.clone(),
                time: eastern_time(at),
                user_name: event.first_name.clone(),
                url,
            },
            unsubscribe_group: self.unsubscribe_group,
        })
    }
}
