//! Errors the orchestrator propagates to its caller.
//!
//! Only malformed payloads, fetch failures and publish failures escape an
//! invocation. Delivery and ledger errors are absorbed by their stages and
//! never become a `RelayError`.

use std::path::PathBuf;

use thiserror::Error;

use crate::adapters::StorageError;
use crate::core::fetcher::TransferError;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Trigger envelope or its message could not be decoded
    #[error("malformed trigger payload: {0}")]
    MalformedPayload(String),

    /// A submission field needed by the current stage is absent
    #[error("submission is missing required field '{0}'")]
    MissingField(&'static str),

    /// Status, transport or structural failure while fetching
    #[error("fetch failed: {0}")]
    Transfer(#[from] TransferError),

    /// Source answered 200 with a zero-byte body
    #[error("file size is 0: {url} staged at {}", path.display())]
    EmptyResource { url: String, path: PathBuf },

    #[error("publish failed: {0}")]
    Publish(#[from] StorageError),
}

impl RelayError {
    /// Errors raised before a recipient is known
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedPayload(_))
    }
}
