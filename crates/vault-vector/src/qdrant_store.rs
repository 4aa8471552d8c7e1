//! Qdrant implementation of the vector backend
//!
//! Maps the collection/insert/index/search/query surface onto Qdrant points.
//! Point ids are UUID v4 generated here; callers never choose them.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
    FieldType as QdrantFieldType, Filter, HnswConfigDiffBuilder, PayloadIncludeSelector, PointId,
    PointStruct, ScrollPointsBuilder, SearchParamsBuilder, SearchPointsBuilder,
    UpdateCollectionBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;
use vault_core::{Result, VaultError, VectorConfig};

use crate::backend::{
    CollectionCreation, CollectionSchema, Hit, IndexKind, IndexSpec, Metric, NewRow, Payload,
    RecordFilter, Row, SearchRequest, VectorBackend,
};

const SCROLL_PAGE_SIZE: u32 = 256;

/// Qdrant vector backend
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    /// Connect to the configured Qdrant endpoint
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VaultError::BackendUnavailable(format!("Qdrant connection failed: {e}")))?;

        info!(url = %config.url, "Configured Qdrant backend");
        Ok(Self { client })
    }
}

fn distance(metric: Metric) -> Distance {
    match metric {
        Metric::L2 => Distance::Euclid,
        Metric::Cosine => Distance::Cosine,
        Metric::Dot => Distance::Dot,
    }
}

fn unavailable(action: &str, err: impl std::fmt::Display) -> VaultError {
    VaultError::BackendUnavailable(format!("Failed to {action}: {err}"))
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn has_collection(&self, collection: &str) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| unavailable("list collections", e))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == collection))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionCreation> {
        let dimension = schema.vector_dimension().ok_or_else(|| {
            VaultError::ConfigError(format!(
                "collection '{}' declares no vector field",
                schema.name
            ))
        })?;

        let mut builder = CreateCollectionBuilder::new(&schema.name).vectors_config(
            VectorParamsBuilder::new(dimension as u64, distance(schema.metric())),
        );
        if let Some(IndexSpec {
            kind: IndexKind::Vector { m, ef_construct, .. },
            ..
        }) = schema.vector_index()
        {
            builder = builder.hnsw_config(
                HnswConfigDiffBuilder::default()
                    .m(*m)
                    .ef_construct(*ef_construct),
            );
        }

        match self.client.create_collection(builder).await {
            Ok(_) => Ok(CollectionCreation::Created),
            Err(e) => {
                // A concurrent creator wins the race; anything else is a real failure
                if self.has_collection(&schema.name).await? {
                    debug!(collection = %schema.name, "Collection created concurrently");
                    Ok(CollectionCreation::AlreadyExisted)
                } else {
                    Err(unavailable("create collection", e))
                }
            }
        }
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        match &index.kind {
            IndexKind::Vector { m, ef_construct, .. } => {
                self.client
                    .update_collection(UpdateCollectionBuilder::new(collection).hnsw_config(
                        HnswConfigDiffBuilder::default()
                            .m(*m)
                            .ef_construct(*ef_construct),
                    ))
                    .await
                    .map_err(|e| unavailable("build vector index", e))?;
            }
            IndexKind::Keyword => {
                self.client
                    .create_field_index(
                        CreateFieldIndexCollectionBuilder::new(
                            collection,
                            &index.field,
                            QdrantFieldType::Keyword,
                        )
                        .wait(true),
                    )
                    .await
                    .map_err(|e| unavailable("build payload index", e))?;
            }
        }

        Ok(())
    }

    async fn has_index(&self, collection: &str, index: &IndexSpec) -> Result<bool> {
        match &index.kind {
            // HNSW is built with the collection itself
            IndexKind::Vector { .. } => self.has_collection(collection).await,
            IndexKind::Keyword => {
                let info = self
                    .client
                    .collection_info(collection)
                    .await
                    .map_err(|e| unavailable("read collection info", e))?;

                Ok(info
                    .result
                    .is_some_and(|r| r.payload_schema.contains_key(&index.field)))
            }
        }
    }

    async fn insert(&self, collection: &str, rows: Vec<NewRow>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(rows.len());
        let points: Vec<PointStruct> = rows
            .into_iter()
            .map(|row| {
                let id = Uuid::new_v4().to_string();
                ids.push(id.clone());

                let payload: HashMap<String, QdrantValue> = row
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect();
                PointStruct::new(id, row.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| unavailable("insert rows", e))?;

        Ok(ids)
    }

    async fn flush(&self, _collection: &str) -> Result<()> {
        // Upserts wait for the write to be applied
        Ok(())
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    collection,
                    request.vector.clone(),
                    request.top_k as u64,
                )
                .with_payload(include(&request.output_fields))
                .params(SearchParamsBuilder::default().hnsw_ef(request.breadth)),
            )
            .await
            .map_err(|e| unavailable("search vectors", e))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| Hit {
                id: point_id_string(point.id),
                distance: score_to_distance(request.metric, point.score),
                payload: payload_to_json(point.payload),
            })
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        output_fields: &[String],
    ) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(collection)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(include(output_fields));
            if let RecordFilter::Equals { field, value } = filter {
                builder = builder.filter(Filter::must([Condition::matches(
                    field.as_str(),
                    value.clone(),
                )]));
            }
            if let Some(offset) = offset.take() {
                builder = builder.offset(offset);
            }

            let page = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| unavailable("query rows", e))?;

            rows.extend(page.result.into_iter().map(|point| Row {
                id: point_id_string(point.id),
                payload: payload_to_json(point.payload),
            }));

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(rows)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| unavailable("drop collection", e))?;
        Ok(())
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn include(fields: &[String]) -> SelectorOptions {
    SelectorOptions::Include(PayloadIncludeSelector {
        fields: fields.to_vec(),
    })
}

/// Qdrant scores Euclid and Manhattan as distances, the rest as similarities
fn score_to_distance(metric: Metric, score: f32) -> f32 {
    match metric {
        Metric::L2 => score,
        Metric::Cosine => 1.0 - score,
        Metric::Dot => -score,
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn payload_to_json(payload: HashMap<String, QdrantValue>) -> Payload {
    payload
        .into_iter()
        .map(|(k, v)| (k, value_to_json(v)))
        .collect()
}

fn value_to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_distance_mapping() {
        assert_eq!(distance(Metric::L2), Distance::Euclid);
        assert_eq!(distance(Metric::Cosine), Distance::Cosine);
        assert_eq!(score_to_distance(Metric::L2, 0.5), 0.5);
        assert_eq!(score_to_distance(Metric::Cosine, 0.75), 0.25);
    }

    #[test]
    fn test_payload_round_trip_through_qdrant_values() {
        let expected = json!({
            "name": "Y2lwaGVy",
            "topics": ["weather", "forecast"],
            "is_active": true,
        });

        let payload: HashMap<String, QdrantValue> = expected
            .as_object()
            .cloned()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect();

        assert_eq!(Value::Object(payload_to_json(payload)), expected);
    }

    #[test]
    fn test_include_selects_output_fields() {
        let fields = vec!["name".to_string(), "description".to_string()];
        match include(&fields) {
            SelectorOptions::Include(selector) => assert_eq!(selector.fields, fields),
            other => panic!("unexpected selector: {other:?}"),
        }
    }

    #[test]
    fn test_point_id_string() {
        let uuid = Uuid::new_v4().to_string();
        assert_eq!(point_id_string(Some(PointId::from(uuid.clone()))), uuid);
        assert_eq!(point_id_string(Some(PointId::from(7u64))), "7");
        assert_eq!(point_id_string(None), "");
    }

    #[test]
    fn test_unreachable_endpoint_config_builds() {
        let config = VectorConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        assert!(QdrantBackend::new(&config).is_ok());
    }
}
