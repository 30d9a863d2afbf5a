//! In-memory adapters for tests and local runs. Not durable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{MailError, MailTransport, ObjectStore, StorageError, TemplatedMessage};

/// Object store that keeps uploads in a map
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<u32>,
    reject_with: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every upload
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            reject_with: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of upload attempts, including rejected ones
    pub fn upload_count(&self) -> u32 {
        *self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), StorageError> {
        *self.uploads.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        if let Some(reason) = &self.reject_with {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }

        let bytes = tokio::fs::read(local_path).await?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes);
        Ok(())
    }
}

/// Mail transport that records every message it is asked to send
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<TemplatedMessage>>,
    reject_status: Option<u16>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose provider rejects every message with `status`
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_status: Some(status),
            ..Default::default()
        }
    }

    /// Every attempted message, in order
    pub fn messages(&self) -> Vec<TemplatedMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &TemplatedMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        match self.reject_status {
            Some(status) => Err(MailError::Rejected {
                status,
                body: "rejected by recording mailer".to_string(),
            }),
            None => Ok(()),
        }
    }
}
