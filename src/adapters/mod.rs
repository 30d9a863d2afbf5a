//! Adapter interfaces for external systems.
//!
//! Object storage and mail delivery sit behind traits so the pipeline can be
//! driven against real providers (GCS, SendGrid) or the in-memory doubles
//! in [`memory`].

pub mod gcs;
pub mod memory;
pub mod sendgrid;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

pub use gcs::{GcsStore, ServiceAccountKey};
pub use memory::{MemoryStore, RecordingMailer};
pub use sendgrid::SendGridMailer;

/// Errors from an object store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid service-account credential: {0}")]
    Credential(String),

    #[error("token exchange failed with status {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("upload of '{key}' failed with status {status}: {body}")]
    Upload {
        key: String,
        status: u16,
        body: String,
    },

    #[error("storage request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to read staged file: {0}")]
    Io(#[from] std::io::Error),

    /// Store refused the write for its own reasons (quota, policy)
    #[error("storage rejected '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

/// Errors from a mail transport
#[derive(Debug, Error)]
pub enum MailError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("submission has no recipient address")]
    MissingRecipient,

    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("mail request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Durable object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// Copy a local file to `key`, overwriting any existing object
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), StorageError>;
}

/// Template variables shared by every status email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    pub assignment_name: Option<String>,
    pub submission_id: Option<String>,
    /// US Eastern wall-clock time of the send
    pub time: String,
    pub user_name: Option<String>,
    /// Artifact link; success emails only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A fully resolved templated email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatedMessage {
    pub to: String,
    pub from: String,
    pub template_id: String,
    pub data: TemplateData,
    /// Unsubscribe group shown to the recipient
    pub unsubscribe_group: u32,
}

/// Templated email delivery
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    async fn send(&self, message: &TemplatedMessage) -> Result<(), MailError>;
}
