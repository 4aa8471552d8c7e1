//! Vector database abstraction
//!
//! The backend is a black-box service with collection, insert, index,
//! search and query operations. Rows carry a JSON payload plus one dense
//! vector; ids are always assigned by the backend.

use async_trait::async_trait;
use serde_json::Value;
use vault_core::{Result, VaultError};

/// Scalar fields of a stored row
pub type Payload = serde_json::Map<String, Value>;

// ============================================================================
// Schema
// ============================================================================

/// Field types a collection can declare
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Backend-assigned string primary key
    Id,
    /// Bounded text
    Text { max_length: usize },
    /// Boolean flag
    Bool,
    /// Bounded list of bounded text items
    TextArray {
        max_capacity: usize,
        max_length: usize,
    },
    /// Dense float vector
    FloatVector { dimension: usize },
}

/// A single field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    /// Whether the field may be absent from a row
    pub optional: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Distance metric for vector comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Euclidean distance
    L2,
    /// One minus cosine similarity
    Cosine,
    /// Negated inner product
    Dot,
}

/// Index algorithm and parameters
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKind {
    /// HNSW graph over the vector field
    Vector {
        metric: Metric,
        m: u64,
        ef_construct: u64,
    },
    /// Exact-match index over a scalar or text-array payload field
    Keyword,
}

/// Index descriptor for one field
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub field: String,
    pub kind: IndexKind,
}

/// Structural definition of a collection
///
/// Created once, lazily, and never altered afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldSchema>,
    pub primary_key: String,
    pub vector_field: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSchema {
    /// Dimension of the declared vector field
    pub fn vector_dimension(&self) -> Option<usize> {
        self.fields.iter().find_map(|f| match f.field_type {
            FieldType::FloatVector { dimension } if f.name == self.vector_field => Some(dimension),
            _ => None,
        })
    }

    /// Index descriptor for the vector field
    pub fn vector_index(&self) -> Option<&IndexSpec> {
        self.indexes
            .iter()
            .find(|i| i.field == self.vector_field && matches!(i.kind, IndexKind::Vector { .. }))
    }

    /// Metric the vector index was declared with
    pub fn metric(&self) -> Metric {
        match self.vector_index().map(|i| &i.kind) {
            Some(IndexKind::Vector { metric, .. }) => *metric,
            _ => Metric::L2,
        }
    }

    /// Check a row against the declared fields and their bounds
    pub fn check_row(&self, row: &NewRow) -> Result<()> {
        for field in &self.fields {
            if field.name == self.primary_key {
                continue;
            }

            if field.name == self.vector_field {
                if let FieldType::FloatVector { dimension } = field.field_type {
                    if row.vector.len() != dimension {
                        return Err(VaultError::ValidationError(format!(
                            "field '{}' expects {dimension} dimensions, got {}",
                            field.name,
                            row.vector.len()
                        )));
                    }
                }
                continue;
            }

            match row.payload.get(&field.name) {
                None | Some(Value::Null) if field.optional => {}
                None | Some(Value::Null) => {
                    return Err(VaultError::ValidationError(format!(
                        "missing field '{}'",
                        field.name
                    )));
                }
                Some(value) => check_value(&field.name, &field.field_type, value)?,
            }
        }

        if let Some(unknown) = row
            .payload
            .keys()
            .find(|k| !self.fields.iter().any(|f| &f.name == *k))
        {
            return Err(VaultError::ValidationError(format!(
                "field '{unknown}' is not part of collection '{}'",
                self.name
            )));
        }

        Ok(())
    }
}

fn check_value(name: &str, field_type: &FieldType, value: &Value) -> Result<()> {
    let invalid = |reason: String| Err(VaultError::ValidationError(format!("field '{name}' {reason}")));

    match (field_type, value) {
        (FieldType::Text { max_length }, Value::String(s)) => {
            if s.chars().count() > *max_length {
                return invalid(format!("exceeds {max_length} characters"));
            }
        }
        (FieldType::Bool, Value::Bool(_)) => {}
        (
            FieldType::TextArray {
                max_capacity,
                max_length,
            },
            Value::Array(items),
        ) => {
            if items.len() > *max_capacity {
                return invalid(format!("exceeds {max_capacity} items"));
            }
            for item in items {
                match item {
                    Value::String(s) if s.chars().count() <= *max_length => {}
                    Value::String(_) => {
                        return invalid(format!("has an item exceeding {max_length} characters"))
                    }
                    _ => return invalid("must contain only strings".to_string()),
                }
            }
        }
        (expected, _) => return invalid(format!("does not match type {expected:?}")),
    }

    Ok(())
}

// ============================================================================
// Rows, requests and results
// ============================================================================

/// A row to insert; the backend assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub payload: Payload,
    pub vector: Vec<f32>,
}

/// A stored row returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub payload: Payload,
}

/// A nearest-neighbor hit
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    /// Distance under the collection metric (lower is closer)
    pub distance: f32,
    pub payload: Payload,
}

/// Parameters of a nearest-neighbor search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub metric: Metric,
    pub top_k: usize,
    /// Search breadth (nprobe for IVF indexes, ef for HNSW)
    pub breadth: u64,
    /// Payload fields to return with each hit
    pub output_fields: Vec<String>,
}

/// Row filter for queries
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    /// Every row in the collection
    All,
    /// Rows whose field equals the value (or contains it, for text arrays)
    Equals { field: String, value: String },
}

impl RecordFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a create-collection call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionCreation {
    Created,
    /// Another caller created the collection first
    AlreadyExisted,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Operations consumed from the vector database service
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Check whether a collection exists
    async fn has_collection(&self, collection: &str) -> Result<bool>;

    /// Create a collection; "already exists" is reported, not raised
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionCreation>;

    /// Build (or rebuild) an index on one field
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()>;

    /// Check whether an index has been built on an existing collection
    async fn has_index(&self, collection: &str, index: &IndexSpec) -> Result<bool>;

    /// Insert rows and return their backend-assigned ids
    async fn insert(&self, collection: &str, rows: Vec<NewRow>) -> Result<Vec<String>>;

    /// Make previously inserted rows visible to search and query
    async fn flush(&self, collection: &str) -> Result<()>;

    /// Nearest-neighbor search, closest first
    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>>;

    /// Filtered scan returning the selected payload fields
    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        output_fields: &[String],
    ) -> Result<Vec<Row>>;

    /// Drop a collection and all its rows
    async fn drop_collection(&self, collection: &str) -> Result<()>;
}

/// Keep only the requested payload fields
pub fn project(payload: &Payload, output_fields: &[String]) -> Payload {
    output_fields
        .iter()
        .filter_map(|f| payload.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}
