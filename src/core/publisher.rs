//! Artifact publisher: copies a staged file to its deterministic key.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::adapters::{ObjectStore, StorageError};
use crate::domain::PublishResult;

/// Destination key for a submission. The extension is always `.zip`.
pub fn destination_key(email_id: &str, assignment_id: &str, submission_id: &str) -> String {
    format!("uploads/{}/{}/{}.zip", email_id, assignment_id, submission_id)
}

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload once; any failure is returned to the caller
    #[instrument(skip(self, local_path), fields(store = %self.store.name()))]
    pub async fn publish(
        &self,
        local_path: &Path,
        email_id: &str,
        assignment_id: &str,
        submission_id: &str,
    ) -> Result<PublishResult, StorageError> {
        let key = destination_key(email_id, assignment_id, submission_id);

        match self.store.upload(local_path, &key).await {
            Ok(()) => {
                info!(%key, "Artifact published");
                Ok(PublishResult { key })
            }
            Err(e) => {
                error!(%key, error = %e, "Error uploading file");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_destination_key() {
        assert_eq!(
            destination_key("u@x.com", "a1", "s1"),
            "uploads/u@x.com/a1/s1.zip"
        );
    }

    #[tokio::test]
    async fn test_publish_uploads_to_key() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join("s1.zip");
        std::fs::write(&staged, b"PK\x03").unwrap();

        let store = Arc::new(MemoryStore::new());
        let publisher = Publisher::new(store.clone());

        let result = publisher
            .publish(&staged, "u@x.com", "a1", "s1")
            .await
            .unwrap();

        assert_eq!(result.key, "uploads/u@x.com/a1/s1.zip");
        assert_eq!(store.get(&result.key), Some(b"PK\x03".to_vec()));
    }

    #[tokio::test]
    async fn test_publish_propagates_store_errors() {
        let publisher = Publisher::new(Arc::new(MemoryStore::rejecting("permission denied")));

        let err = publisher
            .publish(Path::new("/tmp/unused.zip"), "u@x.com", "a1", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
    }
}
