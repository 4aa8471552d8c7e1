//! Collection lifecycle management
//!
//! Readiness is re-derived from backend state on every call. There is no
//! cached "ready" flag, so a collection dropped out of band is recreated
//! by the next operation that touches it.

use std::sync::Arc;
use tracing::{debug, info};
use vault_core::{Result, VaultError};

use crate::backend::{CollectionCreation, CollectionSchema, IndexKind, VectorBackend};

/// What `ensure_ready` observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// This call created the collection and built its indexes
    Created,
    /// The collection existed, or a concurrent caller created it first
    AlreadyPresent,
}

/// Ensures the backing collection exists before any read or write
#[derive(Clone)]
pub struct CollectionManager {
    backend: Arc<dyn VectorBackend>,
    schema: Arc<CollectionSchema>,
}

impl CollectionManager {
    pub fn new(backend: Arc<dyn VectorBackend>, schema: CollectionSchema) -> Self {
        Self {
            backend,
            schema: Arc::new(schema),
        }
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn collection(&self) -> &str {
        &self.schema.name
    }

    pub fn backend(&self) -> &Arc<dyn VectorBackend> {
        &self.backend
    }

    /// Create the collection and any missing indexes
    ///
    /// Safe to call concurrently. Losing a creation race is reported as
    /// `AlreadyPresent`; the loser still builds whatever index the winner
    /// has not built yet, so a half-initialized collection is repaired by
    /// the next caller.
    pub async fn ensure_ready(&self) -> Result<Readiness> {
        let name = self.collection();

        if self.backend.has_collection(name).await? {
            debug!(collection = %name, "Collection present");
            self.build_missing_indexes().await?;
            return Ok(Readiness::AlreadyPresent);
        }

        match self.backend.create_collection(&self.schema).await? {
            CollectionCreation::AlreadyExisted => {
                debug!(collection = %name, "Collection created by a concurrent caller");
                self.build_missing_indexes().await?;
                Ok(Readiness::AlreadyPresent)
            }
            CollectionCreation::Created => {
                for index in &self.schema.indexes {
                    self.backend.create_index(name, index).await?;
                }
                info!(
                    collection = %name,
                    indexes = self.schema.indexes.len(),
                    "Created collection"
                );
                Ok(Readiness::Created)
            }
        }
    }

    async fn build_missing_indexes(&self) -> Result<()> {
        let name = self.collection();
        for index in &self.schema.indexes {
            if !self.backend.has_index(name, index).await? {
                info!(collection = %name, field = %index.field, "Building missing index");
                self.backend.create_index(name, index).await?;
            }
        }
        Ok(())
    }

    /// Re-apply the vector index descriptor
    pub async fn rebuild_index(&self) -> Result<()> {
        let index = self.schema.vector_index().ok_or_else(|| {
            VaultError::ConfigError(format!(
                "collection '{}' declares no vector index",
                self.collection()
            ))
        })?;

        if let IndexKind::Vector { metric, .. } = &index.kind {
            debug!(collection = %self.collection(), ?metric, "Rebuilding vector index");
        }
        self.backend.create_index(self.collection(), index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FieldSchema, FieldType, IndexSpec, Metric};
    use crate::memory::MemoryBackend;

    fn schema() -> CollectionSchema {
        CollectionSchema {
            name: "agents".to_string(),
            description: "test".to_string(),
            fields: vec![
                FieldSchema::new("pk", FieldType::Id),
                FieldSchema::new("embedding", FieldType::FloatVector { dimension: 4 }),
            ],
            primary_key: "pk".to_string(),
            vector_field: "embedding".to_string(),
            indexes: vec![IndexSpec {
                field: "embedding".to_string(),
                kind: IndexKind::Vector {
                    metric: Metric::L2,
                    m: 16,
                    ef_construct: 128,
                },
            }],
        }
    }

    #[tokio::test]
    async fn test_first_call_creates() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        assert_eq!(manager.ensure_ready().await.unwrap(), Readiness::Created);
        assert_eq!(manager.ensure_ready().await.unwrap(), Readiness::AlreadyPresent);
        assert_eq!(backend.collections_created(), 1);
        assert_eq!(backend.index_builds(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_create_once() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_ready().await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == Readiness::Created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(backend.collections_created(), 1);
    }

    #[tokio::test]
    async fn test_recreates_after_drop() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        manager.ensure_ready().await.unwrap();
        backend.drop_collection("agents").await.unwrap();

        assert_eq!(manager.ensure_ready().await.unwrap(), Readiness::Created);
        assert_eq!(backend.collections_created(), 2);
    }

    #[tokio::test]
    async fn test_repairs_collection_without_index() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        // Created by someone else, indexes not built yet
        backend.create_collection(&schema()).await.unwrap();

        assert_eq!(manager.ensure_ready().await.unwrap(), Readiness::AlreadyPresent);
        assert_eq!(backend.index_builds(), 1);
        assert!(backend
            .has_index("agents", &schema().indexes[0])
            .await
            .unwrap());

        manager.ensure_ready().await.unwrap();
        assert_eq!(backend.index_builds(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_all_see_index() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                let backend = backend.clone();
                tokio::spawn(async move {
                    manager.ensure_ready().await.unwrap();
                    backend.has_index("agents", &schema().indexes[0]).await.unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_backend_outage_propagates() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_available(false);
        let manager = CollectionManager::new(backend, schema());

        let err = manager.ensure_ready().await.unwrap_err();
        assert!(matches!(err, VaultError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_rebuild_index() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = CollectionManager::new(backend.clone(), schema());

        manager.ensure_ready().await.unwrap();
        manager.rebuild_index().await.unwrap();
        assert_eq!(backend.index_builds(), 2);
    }
}
