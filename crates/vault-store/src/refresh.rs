//! Index refresh handles returned by inserts
//!
//! Author: hephaex@gmail.com

use tokio::task::JoinHandle;
use tracing::warn;
use vault_core::{Result, VaultError};
use vault_vector::CollectionManager;

/// Completion handle for the index rebuild scheduled after an insert
///
/// The insert has already succeeded when this exists. Dropping the handle
/// leaves the rebuild running in the background; awaiting `wait` blocks
/// until the new record is searchable.
#[derive(Debug)]
pub struct IndexRefresh {
    task: Option<JoinHandle<Result<()>>>,
}

impl IndexRefresh {
    /// Rebuild the vector index on a background task
    pub(crate) fn spawn(manager: CollectionManager) -> Self {
        let task = tokio::spawn(async move {
            let result = manager.rebuild_index().await;
            if let Err(e) = &result {
                warn!(collection = %manager.collection(), error = %e, "Index rebuild failed");
            }
            result
        });

        Self { task: Some(task) }
    }

    /// Handle for an insert that scheduled no rebuild
    pub fn skipped() -> Self {
        Self { task: None }
    }

    /// Whether a rebuild was scheduled
    pub fn is_scheduled(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the rebuild and report its outcome
    pub async fn wait(self) -> Result<()> {
        match self.task {
            None => Ok(()),
            Some(task) => task
                .await
                .map_err(|e| VaultError::Other(anyhow::anyhow!("index rebuild task failed: {e}")))?,
        }
    }
}

/// Outcome of a successful insert
#[derive(Debug)]
pub struct InsertReceipt {
    /// Backend-assigned record identifier
    pub id: String,

    /// Rebuild scheduled after the insert
    pub index_refresh: IndexRefresh,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vault_core::VectorConfig;
    use vault_vector::MemoryBackend;

    #[tokio::test]
    async fn test_skipped_handle_completes() {
        let refresh = IndexRefresh::skipped();
        assert!(!refresh.is_scheduled());
        refresh.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawned_rebuild_reports_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(
            backend,
            crate::schema::agent_schema(&VectorConfig::default()),
        );

        // No collection yet, so the rebuild cannot succeed
        let refresh = IndexRefresh::spawn(manager);
        assert!(refresh.is_scheduled());
        assert!(refresh.wait().await.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_spawned_rebuild_succeeds() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(
            backend.clone(),
            crate::schema::agent_schema(&VectorConfig::default()),
        );
        manager.ensure_ready().await.unwrap();
        let builds = backend.index_builds();

        IndexRefresh::spawn(manager).wait().await.unwrap();
        assert_eq!(backend.index_builds(), builds + 1);
    }
}
