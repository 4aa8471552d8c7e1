//! Agent collection schema

use vault_core::{VectorConfig, MAX_OUTPUT_FORMAT_CHARS, MAX_TOPICS, MAX_TOPIC_CHARS};
use vault_vector::{CollectionSchema, FieldSchema, FieldType, IndexKind, IndexSpec, Metric};

pub const FIELD_ID: &str = "pk";
pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_TOPICS: &str = "topics";
pub const FIELD_OUTPUT_FORMAT: &str = "output_format";
pub const FIELD_IS_ACTIVE: &str = "is_active";
pub const FIELD_NAME_LOOKUP: &str = "name_lookup";
pub const FIELD_EMBEDDING: &str = "embeddings";

/// Stored ciphertext bound; base64 of a 4096-bit RSA block is 684 characters
const MAX_CIPHERTEXT_CHARS: usize = 800;

/// Hex HMAC-SHA256
const LOOKUP_HASH_CHARS: usize = 64;

/// Fields returned with every search hit
pub fn search_output_fields() -> Vec<String> {
    [
        FIELD_NAME,
        FIELD_DESCRIPTION,
        FIELD_TOPICS,
        FIELD_OUTPUT_FORMAT,
        FIELD_IS_ACTIVE,
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

/// Fixed schema of the agent collection
pub fn agent_schema(config: &VectorConfig) -> CollectionSchema {
    CollectionSchema {
        name: config.collection.clone(),
        description: "Agent descriptors with encrypted name and description".to_string(),
        fields: vec![
            FieldSchema::new(FIELD_ID, FieldType::Id),
            FieldSchema::new(
                FIELD_NAME,
                FieldType::Text {
                    max_length: MAX_CIPHERTEXT_CHARS,
                },
            ),
            FieldSchema::new(
                FIELD_DESCRIPTION,
                FieldType::Text {
                    max_length: MAX_CIPHERTEXT_CHARS,
                },
            ),
            FieldSchema::new(
                FIELD_TOPICS,
                FieldType::TextArray {
                    max_capacity: MAX_TOPICS,
                    max_length: MAX_TOPIC_CHARS,
                },
            ),
            FieldSchema::new(
                FIELD_OUTPUT_FORMAT,
                FieldType::Text {
                    max_length: MAX_OUTPUT_FORMAT_CHARS,
                },
            ),
            FieldSchema::new(FIELD_IS_ACTIVE, FieldType::Bool),
            FieldSchema::new(
                FIELD_NAME_LOOKUP,
                FieldType::Text {
                    max_length: LOOKUP_HASH_CHARS,
                },
            )
            .optional(),
            FieldSchema::new(
                FIELD_EMBEDDING,
                FieldType::FloatVector {
                    dimension: config.dimension,
                },
            ),
        ],
        primary_key: FIELD_ID.to_string(),
        vector_field: FIELD_EMBEDDING.to_string(),
        indexes: vec![
            IndexSpec {
                field: FIELD_EMBEDDING.to_string(),
                kind: IndexKind::Vector {
                    metric: Metric::L2,
                    m: config.hnsw_m,
                    ef_construct: config.hnsw_ef_construct,
                },
            },
            IndexSpec {
                field: FIELD_TOPICS.to_string(),
                kind: IndexKind::Keyword,
            },
            IndexSpec {
                field: FIELD_NAME_LOOKUP.to_string(),
                kind: IndexKind::Keyword,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_schema_shape() {
        let schema = agent_schema(&VectorConfig::default());

        assert_eq!(schema.name, "agents");
        assert_eq!(schema.vector_dimension(), Some(384));
        assert_eq!(schema.metric(), Metric::L2);
        assert_eq!(schema.primary_key, FIELD_ID);
        assert_eq!(schema.indexes.len(), 3);
    }

    #[test]
    fn test_only_lookup_is_optional() {
        let schema = agent_schema(&VectorConfig::default());
        let optional: Vec<&str> = schema
            .fields
            .iter()
            .filter(|f| f.optional)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(optional, vec![FIELD_NAME_LOOKUP]);
    }

    #[test]
    fn test_search_never_returns_embedding() {
        assert!(!search_output_fields().contains(&FIELD_EMBEDDING.to_string()));
    }
}
