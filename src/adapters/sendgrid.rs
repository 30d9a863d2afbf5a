//! SendGrid v3 mail adapter.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{MailError, MailTransport, TemplatedMessage};
use crate::config::MailSettings;

/// Sends dynamic-template mail through the SendGrid API
pub struct SendGridMailer {
    settings: MailSettings,
    client: reqwest::Client,
}

impl SendGridMailer {
    pub fn new(settings: &MailSettings) -> Self {
        Self {
            settings: settings.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self) -> String {
        format!("{}/v3/mail/send", self.settings.endpoint.trim_end_matches('/'))
    }

    /// Request body for one templated message
    fn payload(message: &TemplatedMessage) -> serde_json::Value {
        json!({
            "personalizations": [{
                "to": [{ "email": message.to }],
                "dynamic_template_data": message.data,
            }],
            "from": { "email": message.from },
            "template_id": message.template_id,
            "asm": {
                "group_id": message.unsubscribe_group,
                "groups_to_display": [message.unsubscribe_group],
            },
        })
    }
}

#[async_trait]
impl MailTransport for SendGridMailer {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn send(&self, message: &TemplatedMessage) -> Result<(), MailError> {
        let api_key = self.settings.api_key()?;

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .json(&Self::payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!(to = %message.to, template = %message.template_id, "SendGrid accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TemplateData;
    use crate::config::{ConfigError, ENV_MAIL_API_KEY};

    fn message(url: Option<&str>) -> TemplatedMessage {
        TemplatedMessage {
            to: "u@x.com".to_string(),
            from: "relay@example.edu".to_string(),
            template_id: "d-123".to_string(),
            data: TemplateData {
                assignment_name: Some("HW1".to_string()),
                submission_id: Some("s1".to_string()),
                time: "1/15/2024, 12:30:05 PM".to_string(),
                user_name: Some("Ana".to_string()),
                url: url.map(str::to_string),
            },
            unsubscribe_group: 35630,
        }
    }

    #[test]
    fn test_api_url() {
        let mailer = SendGridMailer::new(&MailSettings {
            endpoint: "https://api.sendgrid.com/".to_string(),
            ..Default::default()
        });
        assert_eq!(mailer.api_url(), "https://api.sendgrid.com/v3/mail/send");
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendGridMailer::payload(&message(Some("uploads/u@x.com/a1/s1.zip")));

        assert_eq!(payload["template_id"], "d-123");
        assert_eq!(payload["from"]["email"], "relay@example.edu");
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "u@x.com");

        let data = &payload["personalizations"][0]["dynamic_template_data"];
        assert_eq!(data["assignmentName"], "HW1");
        assert_eq!(data["submissionId"], "s1");
        assert_eq!(data["userName"], "Ana");
        assert_eq!(data["time"], "1/15/2024, 12:30:05 PM");
        assert_eq!(data["url"], "uploads/u@x.com/a1/s1.zip");

        assert_eq!(payload["asm"]["group_id"], 35630);
        assert_eq!(payload["asm"]["groups_to_display"][0], 35630);
    }

    #[test]
    fn test_payload_omits_url_for_failures() {
        let payload = SendGridMailer::payload(&message(None));
        let data = &payload["personalizations"][0]["dynamic_template_data"];
        assert!(data.get("url").is_none());
    }

    #[tokio::test]
    async fn test_send_without_api_key() {
        let mailer = SendGridMailer::new(&MailSettings::default());
        let err = mailer.send(&message(None)).await.unwrap_err();
        assert!(matches!(
            err,
            MailError::Config(ConfigError::Missing { key: ENV_MAIL_API_KEY })
        ));

        let blank = SendGridMailer::new(&MailSettings {
            api_key: Some(String::new()),
            ..Default::default()
        });
        let err = blank.send(&message(None)).await.unwrap_err();
        assert!(matches!(
            err,
            MailError::Config(ConfigError::Missing { key: ENV_MAIL_API_KEY })
        ));
    }
}
