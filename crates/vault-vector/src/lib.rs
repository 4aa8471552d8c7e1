//! Vault Vector - Embedding generation and vector storage
//!
//! Black-box collaborators of the record store:
//! - Embedding clients (Ollama, OpenAI) and the topic embedding generator
//! - The vector backend trait with Qdrant and in-memory implementations
//! - Lazy collection lifecycle management

pub mod backend;
pub mod embedding;
pub mod generator;
pub mod lifecycle;
pub mod memory;
pub mod qdrant_store;

pub use backend::{
    CollectionCreation, CollectionSchema, FieldSchema, FieldType, Hit, IndexKind, IndexSpec,
    Metric, NewRow, Payload, RecordFilter, Row, SearchRequest, VectorBackend,
};
pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use generator::TopicEmbedder;
pub use lifecycle::{CollectionManager, Readiness};
pub use memory::MemoryBackend;
pub use qdrant_store::QdrantBackend;
