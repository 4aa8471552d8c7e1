//! Topic embedding generator
//!
//! Turns an ordered topic list into the vector stored with a record. Topics
//! are joined with `", "` before embedding, so their order is part of the
//! input. Deterministic models make the optional cache transparent.
//!
//! Author: hephaex@gmail.com

use moka::future::Cache;
use std::sync::Arc;
use vault_core::{join_topics, Result, VaultError};

use crate::embedding::EmbeddingClient;

/// Embedding generator over a black-box embedding model
#[derive(Clone)]
pub struct TopicEmbedder {
    client: Arc<dyn EmbeddingClient>,
    dimension: usize,
    cache: Option<Cache<String, Vec<f32>>>,
}

impl TopicEmbedder {
    /// Create a generator expecting vectors of `dimension` floats
    pub fn new(client: Arc<dyn EmbeddingClient>, dimension: usize) -> Self {
        Self {
            client,
            dimension,
            cache: None,
        }
    }

    /// Cache up to `capacity` embeddings keyed by their input text
    pub fn with_cache(mut self, capacity: u64) -> Self {
        self.cache = (capacity > 0).then(|| Cache::new(capacity));
        self
    }

    /// Dimension every produced vector has
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed an ordered topic list
    pub async fn embed_topics(&self, topics: &[String]) -> Result<Vec<f32>> {
        self.embed_text(&join_topics(topics)).await
    }

    /// Embed raw text
    ///
    /// A vector of the wrong length means the model behind the client is
    /// not the one the collection was built for.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(vector) = cache.get(text).await {
                return Ok(vector);
            }
        }

        let vector = self.client.embed(text).await?;
        if vector.len() != self.dimension {
            return Err(VaultError::ModelUnavailable(format!(
                "Embedding model returned {} dimensions, expected {}",
                vector.len(),
                self.dimension
            )));
        }

        if let Some(cache) = &self.cache {
            cache.insert(text.to_string(), vector.clone()).await;
        }

        Ok(vector)
    }
}
