//! Pipeline outcomes: template selection, delivery results and stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome reported to the submitter; selects the email template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MailStatus {
    /// File fetched and published
    Success,

    /// Fetch failed (status, transport or structural error)
    Failed,

    /// Source responded with a zero-byte body
    EmptyFile,
}

impl MailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::EmptyFile => "EMPTY_FILE",
        }
    }
}

impl fmt::Display for MailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the send call itself succeeded.
///
/// This, not [`MailStatus`], is what the ledger stores: a delivered
/// "your file was empty" email is still `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an invocation in the pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Fetched,
    Published,
    Notified,
    Recorded,

    /// Terminal; reachable from `Start` or `Fetched`
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Recorded | Self::Failed)
    }

    /// Legal transitions of the pipeline state machine
    pub fn can_advance_to(&self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Self::Start, Self::Fetched)
                | (Self::Start, Self::Failed)
                | (Self::Fetched, Self::Published)
                | (Self::Fetched, Self::Failed)
                | (Self::Published, Self::Notified)
                | (Self::Notified, Self::Recorded)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Fetched => "fetched",
            Self::Published => "published",
            Self::Notified => "notified",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Destination key of a published artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub key: String,
}

impl fmt::Display for PublishResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&MailStatus::EmptyFile).unwrap(),
            "\"EMPTY_FILE\""
        );
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Success).unwrap(),
            "\"SUCCESS\""
        );
        assert_eq!(
            serde_json::from_str::<DeliveryStatus>("\"FAILED\"").unwrap(),
            DeliveryStatus::Failed
        );
    }

    #[test]
    fn test_display_matches_wire_names() {
        for status in [MailStatus::Success, MailStatus::Failed, MailStatus::EmptyFile] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Recorded.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Notified.is_terminal());
        assert!(!Stage::Start.is_terminal());
    }

    #[test]
    fn test_stage_transitions() {
        let happy = [
            Stage::Start,
            Stage::Fetched,
            Stage::Published,
            Stage::Notified,
            Stage::Recorded,
        ];
        for pair in happy.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }

        assert!(Stage::Start.can_advance_to(Stage::Failed));
        assert!(Stage::Fetched.can_advance_to(Stage::Failed));

        // Publish failure ends the run from FETCHED; nothing after PUBLISHED fails
        assert!(!Stage::Published.can_advance_to(Stage::Failed));
        assert!(!Stage::Notified.can_advance_to(Stage::Failed));
        assert!(!Stage::Start.can_advance_to(Stage::Published));
        assert!(!Stage::Recorded.can_advance_to(Stage::Start));
    }
}
