//! Record store orchestration
//!
//! Composes the lifecycle manager, topic embedder, field cipher and optional
//! name lookup into the four public operations. Every operation starts by
//! ensuring the collection exists.
//!
//! Author: hephaex@gmail.com

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use vault_core::{
    validate_topics, AgentDescriptor, AgentMatch, AppConfig, Result, VaultError,
};
use vault_crypto::{FieldCipher, NameLookup};
use vault_vector::{
    create_embedding_client, CollectionManager, EmbeddingClient, Hit, NewRow, Payload,
    QdrantBackend, RecordFilter, SearchRequest, TopicEmbedder, VectorBackend,
};

use crate::refresh::{IndexRefresh, InsertReceipt};
use crate::schema::{
    agent_schema, search_output_fields, FIELD_DESCRIPTION, FIELD_IS_ACTIVE, FIELD_NAME,
    FIELD_NAME_LOOKUP, FIELD_OUTPUT_FORMAT, FIELD_TOPICS,
};

// ============================================================================
// Options
// ============================================================================

/// Tunables for search and index maintenance
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Nearest records returned per search
    pub top_k: usize,

    /// Search breadth passed to the backend
    pub search_breadth: u64,

    /// Schedule an index rebuild after every insert
    pub refresh_index_after_insert: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            search_breadth: 10,
            refresh_index_after_insert: true,
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.vector.top_k,
            search_breadth: config.vector.search_breadth,
            refresh_index_after_insert: config.store.refresh_index_after_insert,
        }
    }
}

// ============================================================================
// Record Store
// ============================================================================

/// Encrypted semantic record store
pub struct RecordStore {
    manager: CollectionManager,
    embedder: TopicEmbedder,
    cipher: FieldCipher,
    lookup: Option<NameLookup>,
    options: StoreOptions,
}

impl RecordStore {
    /// Create a store over an explicit backend, embedder and cipher
    pub fn new(manager: CollectionManager, embedder: TopicEmbedder, cipher: FieldCipher) -> Self {
        Self {
            manager,
            embedder,
            cipher,
            lookup: None,
            options: StoreOptions::default(),
        }
    }

    /// Store names' keyed hashes and answer `exists` through them
    pub fn with_name_lookup(mut self, lookup: NameLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Wire the store from configuration using the given collaborators
    pub fn with_components(
        config: &AppConfig,
        backend: Arc<dyn VectorBackend>,
        client: Arc<dyn EmbeddingClient>,
    ) -> Result<Self> {
        if client.dimension() != config.vector.dimension {
            return Err(VaultError::ConfigError(format!(
                "embedding model '{}' produces {} dimensions, collection expects {}",
                config.embedding.model,
                client.dimension(),
                config.vector.dimension
            )));
        }

        let manager = CollectionManager::new(backend, agent_schema(&config.vector));
        let embedder = TopicEmbedder::new(client, config.vector.dimension)
            .with_cache(config.embedding.cache_capacity);
        let cipher = FieldCipher::from_config(&config.keys)?;

        let mut store =
            Self::new(manager, embedder, cipher).with_options(StoreOptions::from_config(config));
        if let Some(secret) = &config.keys.name_lookup_secret {
            store = store.with_name_lookup(NameLookup::new(secret)?);
        }

        Ok(store)
    }

    /// Connect to Qdrant and the configured embedding provider
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = Arc::new(QdrantBackend::new(&config.vector)?);
        let client: Arc<dyn EmbeddingClient> =
            Arc::from(create_embedding_client(&config.embedding)?);
        Self::with_components(config, backend, client)
    }

    /// Lifecycle manager of the backing collection
    pub fn manager(&self) -> &CollectionManager {
        &self.manager
    }

    /// Whether search results can be decrypted
    pub fn can_decrypt(&self) -> bool {
        self.cipher.can_decrypt()
    }

    fn backend(&self) -> &Arc<dyn VectorBackend> {
        self.manager.backend()
    }

    fn collection(&self) -> &str {
        self.manager.collection()
    }

    /// Encrypt, embed and persist one record
    ///
    /// Validation, encryption and embedding all complete before the single
    /// backend write, so a failure in any of them persists nothing.
    pub async fn insert(&self, agent: &AgentDescriptor) -> Result<InsertReceipt> {
        agent.validate()?;
        self.manager.ensure_ready().await?;

        let name = self.cipher.encrypt(&agent.name)?;
        let description = self.cipher.encrypt(&agent.description)?;
        let vector = self.embedder.embed_topics(&agent.topics).await?;

        let mut payload = Payload::new();
        payload.insert(FIELD_NAME.to_string(), Value::String(name));
        payload.insert(FIELD_DESCRIPTION.to_string(), Value::String(description));
        payload.insert(FIELD_TOPICS.to_string(), json!(agent.topics));
        payload.insert(
            FIELD_OUTPUT_FORMAT.to_string(),
            Value::String(agent.output_format.clone()),
        );
        payload.insert(FIELD_IS_ACTIVE.to_string(), Value::Bool(agent.is_active));
        if let Some(lookup) = &self.lookup {
            payload.insert(
                FIELD_NAME_LOOKUP.to_string(),
                Value::String(lookup.digest(&agent.name)),
            );
        }

        let ids = self
            .backend()
            .insert(self.collection(), vec![NewRow { payload, vector }])
            .await?;
        let id = ids.into_iter().next().ok_or_else(|| {
            VaultError::BackendUnavailable("insert returned no record id".to_string())
        })?;
        self.backend().flush(self.collection()).await?;

        let index_refresh = if self.options.refresh_index_after_insert {
            IndexRefresh::spawn(self.manager.clone())
        } else {
            IndexRefresh::skipped()
        };

        info!(id = %id, topics = agent.topics.len(), "Inserted agent record");
        Ok(InsertReceipt { id, index_refresh })
    }

    /// Find the records whose topics are nearest to the query topics
    ///
    /// Without a private key this fails before touching the backend.
    pub async fn search(&self, query_topics: &[String]) -> Result<Vec<AgentMatch>> {
        self.cipher.require_private_key()?;
        validate_topics(query_topics)?;
        self.manager.ensure_ready().await?;

        let vector = self.embedder.embed_topics(query_topics).await?;
        let request = SearchRequest {
            vector,
            metric: self.manager.schema().metric(),
            top_k: self.options.top_k,
            breadth: self.options.search_breadth,
            output_fields: search_output_fields(),
        };

        let hits = self.backend().search(self.collection(), &request).await?;
        let matches = hits
            .into_iter()
            .map(|hit| self.decrypt_hit(hit))
            .collect::<Result<Vec<_>>>()?;

        debug!(hits = matches.len(), "Search completed");
        Ok(matches)
    }

    /// Every distinct topic across all stored records
    pub async fn list_topics(&self) -> Result<BTreeSet<String>> {
        self.manager.ensure_ready().await?;

        let rows = self
            .backend()
            .query(
                self.collection(),
                &RecordFilter::All,
                &[FIELD_TOPICS.to_string()],
            )
            .await?;

        Ok(rows
            .iter()
            .flat_map(|row| string_list(&row.payload, FIELD_TOPICS))
            .collect())
    }

    /// Whether a record with this plaintext name is stored
    ///
    /// Uses the keyed lookup hash when configured. Otherwise every stored
    /// name is decrypted and compared, which requires the private key.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.manager.ensure_ready().await?;

        if let Some(lookup) = &self.lookup {
            let rows = self
                .backend()
                .query(
                    self.collection(),
                    &RecordFilter::equals(FIELD_NAME_LOOKUP, lookup.digest(name)),
                    &[FIELD_NAME_LOOKUP.to_string()],
                )
                .await?;
            return Ok(!rows.is_empty());
        }

        self.cipher.require_private_key()?;
        let rows = self
            .backend()
            .query(
                self.collection(),
                &RecordFilter::All,
                &[FIELD_NAME.to_string()],
            )
            .await?;

        for row in rows {
            let ciphertext = required_text(&row.payload, FIELD_NAME, &row.id)?;
            if self.cipher.decrypt(ciphertext)? == name {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn decrypt_hit(&self, hit: Hit) -> Result<AgentMatch> {
        let name = self
            .cipher
            .decrypt(required_text(&hit.payload, FIELD_NAME, &hit.id)?)?;
        let description = self
            .cipher
            .decrypt(required_text(&hit.payload, FIELD_DESCRIPTION, &hit.id)?)?;

        Ok(AgentMatch {
            topics: string_list(&hit.payload, FIELD_TOPICS),
            output_format: hit
                .payload
                .get(FIELD_OUTPUT_FORMAT)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            is_active: hit
                .payload
                .get(FIELD_IS_ACTIVE)
                .and_then(Value::as_bool)
                .unwrap_or(true),
            id: hit.id,
            distance: hit.distance,
            name,
            description,
        })
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("collection", &self.collection())
            .field("cipher", &self.cipher)
            .field("name_lookup", &self.lookup.is_some())
            .field("options", &self.options)
            .finish()
    }
}

fn required_text<'a>(payload: &'a Payload, field: &str, id: &str) -> Result<&'a str> {
    payload.get(field).and_then(Value::as_str).ok_or_else(|| {
        VaultError::DecryptionFailed(format!("record {id} has no stored {field}"))
    })
}

fn string_list(payload: &Payload, field: &str) -> Vec<String> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
