//! In-memory vector backend
//!
//! Behaves like a real service for the parts the record store relies on:
//! inserted rows stay invisible until flushed, searches need a built vector
//! index, and creating an existing collection reports `AlreadyExisted`.
//! Search is exact, so results are fully deterministic.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use vault_core::{Result, VaultError};

use crate::backend::{
    project, CollectionCreation, CollectionSchema, Hit, IndexKind, IndexSpec, Metric, NewRow,
    RecordFilter, Row, SearchRequest, VectorBackend,
};

#[derive(Debug, Clone)]
struct StoredRow {
    id: String,
    row: NewRow,
}

#[derive(Debug)]
struct MemoryCollection {
    schema: CollectionSchema,
    committed: Vec<StoredRow>,
    pending: Vec<StoredRow>,
    vector_indexed: bool,
    keyword_indexes: HashSet<String>,
}

/// Vector backend holding every collection in process memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    unavailable: AtomicBool,
    created: AtomicUsize,
    index_builds: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `BackendUnavailable`
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of collections actually created
    pub fn collections_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of index builds requested
    pub fn index_builds(&self) -> usize {
        self.index_builds.load(Ordering::SeqCst)
    }

    /// Committed row count, excluding unflushed inserts
    pub fn row_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |c| c.committed.len()))
            .unwrap_or(0)
    }

    /// Raw committed payload of every row, as a storage reader would see it
    pub fn raw_rows(&self, collection: &str) -> Vec<Row> {
        self.collections
            .read()
            .map(|c| {
                c.get(collection)
                    .map(|c| {
                        c.committed
                            .iter()
                            .map(|r| Row {
                                id: r.id.clone(),
                                payload: r.row.payload.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::BackendUnavailable(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn read<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&MemoryCollection) -> Result<T>,
    ) -> Result<T> {
        self.check_available()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| VaultError::BackendUnavailable("lock poisoned".to_string()))?;
        let collection = collections
            .get(collection)
            .ok_or_else(|| missing(collection))?;
        f(collection)
    }

    fn write<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut MemoryCollection) -> Result<T>,
    ) -> Result<T> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VaultError::BackendUnavailable("lock poisoned".to_string()))?;
        let collection = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        f(collection)
    }
}

fn missing(collection: &str) -> VaultError {
    VaultError::BackendUnavailable(format!("collection '{collection}' does not exist"))
}

fn distance(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::L2 => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        Metric::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                1.0
            } else {
                1.0 - dot / (norm_a * norm_b)
            }
        }
        Metric::Dot => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
    }
}

fn matches_filter(row: &NewRow, filter: &RecordFilter) -> bool {
    match filter {
        RecordFilter::All => true,
        RecordFilter::Equals { field, value } => match row.payload.get(field) {
            Some(serde_json::Value::String(s)) => s == value,
            Some(serde_json::Value::Array(items)) => {
                items.iter().any(|item| item.as_str() == Some(value.as_str()))
            }
            _ => false,
        },
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn has_collection(&self, collection: &str) -> Result<bool> {
        self.check_available()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| VaultError::BackendUnavailable("lock poisoned".to_string()))?;
        Ok(collections.contains_key(collection))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionCreation> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VaultError::BackendUnavailable("lock poisoned".to_string()))?;

        if collections.contains_key(&schema.name) {
            return Ok(CollectionCreation::AlreadyExisted);
        }

        collections.insert(
            schema.name.clone(),
            MemoryCollection {
                schema: schema.clone(),
                committed: Vec::new(),
                pending: Vec::new(),
                vector_indexed: false,
                keyword_indexes: HashSet::new(),
            },
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!(collection = %schema.name, "Created in-memory collection");
        Ok(CollectionCreation::Created)
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        self.write(collection, |c| {
            if !c.schema.fields.iter().any(|f| f.name == index.field) {
                return Err(VaultError::ValidationError(format!(
                    "cannot index unknown field '{}'",
                    index.field
                )));
            }
            match index.kind {
                IndexKind::Vector { .. } => c.vector_indexed = true,
                IndexKind::Keyword => {
                    c.keyword_indexes.insert(index.field.clone());
                }
            }
            Ok(())
        })?;
        self.index_builds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn has_index(&self, collection: &str, index: &IndexSpec) -> Result<bool> {
        self.read(collection, |c| {
            Ok(match index.kind {
                IndexKind::Vector { .. } => c.vector_indexed,
                IndexKind::Keyword => c.keyword_indexes.contains(&index.field),
            })
        })
    }

    async fn insert(&self, collection: &str, rows: Vec<NewRow>) -> Result<Vec<String>> {
        self.write(collection, |c| {
            for row in &rows {
                c.schema.check_row(row)?;
            }

            let stored: Vec<StoredRow> = rows
                .into_iter()
                .map(|row| StoredRow {
                    id: Uuid::new_v4().to_string(),
                    row,
                })
                .collect();
            let ids = stored.iter().map(|r| r.id.clone()).collect();
            c.pending.extend(stored);
            Ok(ids)
        })
    }

    async fn flush(&self, collection: &str) -> Result<()> {
        self.write(collection, |c| {
            let pending = std::mem::take(&mut c.pending);
            c.committed.extend(pending);
            Ok(())
        })
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
        self.read(collection, |c| {
            if !c.vector_indexed {
                return Err(VaultError::BackendUnavailable(format!(
                    "collection '{}' has no vector index",
                    c.schema.name
                )));
            }

            let mut hits: Vec<Hit> = c
                .committed
                .iter()
                .map(|r| Hit {
                    id: r.id.clone(),
                    distance: distance(request.metric, &request.vector, &r.row.vector),
                    payload: project(&r.row.payload, &request.output_fields),
                })
                .collect();

            // Stable: equal distances keep insertion order
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            hits.truncate(request.top_k);
            Ok(hits)
        })
    }

    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        output_fields: &[String],
    ) -> Result<Vec<Row>> {
        self.read(collection, |c| {
            Ok(c.committed
                .iter()
                .filter(|r| matches_filter(&r.row, filter))
                .map(|r| Row {
                    id: r.id.clone(),
                    payload: project(&r.row.payload, output_fields),
                })
                .collect())
        })
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VaultError::BackendUnavailable("lock poisoned".to_string()))?;
        collections.remove(collection);
        Ok(())
    }
}
