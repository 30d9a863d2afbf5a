//! Submission events and the trigger envelope that carries them.
//!
//! The envelope is an SNS-style notification: a `Records` array whose first
//! entry holds the JSON-encoded submission in `Sns.Message`.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// One submission to relay.
///
/// Every field is needed for a successful run, but none is checked at parse
/// time. A missing value fails the stage that first needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    #[serde(default)]
    pub submission_id: Option<String>,

    #[serde(default)]
    pub assignment_id: Option<String>,

    #[serde(default)]
    pub assignment_name: Option<String>,

    /// Recipient address for the status email
    #[serde(default)]
    pub email_id: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    /// Source URL of the submitted file
    #[serde(default)]
    pub submission_url: Option<String>,
}

impl SubmissionEvent {
    /// Parse a trigger envelope and decode the submission it wraps
    pub fn from_envelope(payload: &str) -> Result<Self, RelayError> {
        let envelope: TriggerEnvelope = serde_json::from_str(payload)
            .map_err(|e| RelayError::MalformedPayload(format!("invalid envelope: {}", e)))?;

        let record = envelope
            .records
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::MalformedPayload("envelope has no records".to_string()))?;

        serde_json::from_str(&record.sns.message)
            .map_err(|e| RelayError::MalformedPayload(format!("invalid submission message: {}", e)))
    }

    pub fn submission_id(&self) -> Result<&str, RelayError> {
        require(&self.submission_id, "submissionId")
    }

    pub fn assignment_id(&self) -> Result<&str, RelayError> {
        require(&self.assignment_id, "assignmentId")
    }

    pub fn email_id(&self) -> Result<&str, RelayError> {
        require(&self.email_id, "emailId")
    }

    pub fn submission_url(&self) -> Result<&str, RelayError> {
        require(&self.submission_url, "submissionUrl")
    }

    /// Log-friendly id; never fails
    pub fn label(&self) -> &str {
        self.submission_id.as_deref().unwrap_or("<unknown>")
    }
}

fn require<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RelayError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(RelayError::MissingField(field))
}

/// Notification envelope delivered by the event source
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEnvelope {
    #[serde(rename = "Records")]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsNotification,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsNotification {
    /// JSON-encoded [`SubmissionEvent`]
    #[serde(rename = "Message")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(message: &str) -> String {
        serde_json::json!({
            "Records": [{ "Sns": { "Message": message } }]
        })
        .to_string()
    }

    #[test]
    fn test_parse_full_event() {
        let message = r#"{"submissionId":"s1","assignmentId":"a1","assignmentName":"HW1","emailId":"u@x.com","firstName":"Ana","submissionUrl":"https://ok/file.zip"}"#;

        let event = SubmissionEvent::from_envelope(&envelope(message)).unwrap();

        assert_eq!(event.submission_id().ok(), Some("s1"));
        assert_eq!(event.assignment_id().ok(), Some("a1"));
        assert_eq!(event.email_id().ok(), Some("u@x.com"));
        assert_eq!(event.submission_url().ok(), Some("https://ok/file.zip"));
        assert_eq!(event.first_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_missing_fields_parse_but_fail_on_use() {
        let event = SubmissionEvent::from_envelope(&envelope(r#"{"submissionId":"s1"}"#)).unwrap();

        assert_eq!(event.submission_id().ok(), Some("s1"));
        assert!(matches!(
            event.email_id(),
            Err(RelayError::MissingField("emailId"))
        ));
        assert!(matches!(
            event.submission_url(),
            Err(RelayError::MissingField("submissionUrl"))
        ));
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let event = SubmissionEvent {
            submission_id: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            event.submission_id(),
            Err(RelayError::MissingField("submissionId"))
        ));
        assert_eq!(event.label(), "");
    }

    #[test]
    fn test_malformed_envelopes() {
        let cases = [
            "not json".to_string(),
            r#"{"Records":[]}"#.to_string(),
            r#"{"Records":[{"Sns":{}}]}"#.to_string(),
            envelope("{not json"),
            envelope("[1,2,3]"),
        ];

        for payload in cases {
            let err = SubmissionEvent::from_envelope(&payload).unwrap_err();
            assert!(
                matches!(err, RelayError::MalformedPayload(_)),
                "expected malformed payload for {}, got {:?}",
                payload,
                err
            );
        }
    }

    #[test]
    fn test_only_first_record_is_read() {
        let payload = serde_json::json!({
            "Records": [
                { "Sns": { "Message": r#"{"submissionId":"first"}"# } },
                { "Sns": { "Message": r#"{"submissionId":"second"}"# } }
            ]
        })
        .to_string();

        let event = SubmissionEvent::from_envelope(&payload).unwrap();
        assert_eq!(event.label(), "first");
    }
}
