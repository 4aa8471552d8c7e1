//! Vault Configuration Management
//!
//! Handles configuration from environment variables and TOML files, with
//! defaults suitable for local development against Qdrant and Ollama.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::EMBEDDING_DIMENSION;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Vector database connection and index settings
    pub vector: VectorConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// Key material locations
    pub keys: KeyConfig,

    /// Record store behavior
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Apply overrides from a variable lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }

        // Vector database
        if let Some(url) = lookup("VECTOR_DB_URL") {
            self.vector.url = url;
        }
        if let Some(token) = lookup("VECTOR_DB_TOKEN") {
            self.vector.api_key = Some(token);
        }
        if let Some(collection) = lookup("VECTOR_COLLECTION") {
            self.vector.collection = collection;
        }

        // Embedding model
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.embedding.ollama_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(key);
        }

        // Keys
        if let Some(path) = lookup("PUBLIC_KEY_PATH") {
            self.keys.public_key_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("PRIVATE_KEY_PATH") {
            self.keys.private_key_path = Some(PathBuf::from(path));
        }
        if let Some(password) = lookup("PRIVATE_KEY_PASSWORD") {
            self.keys.private_key_password = Some(password);
        }
        if let Some(secret) = lookup("NAME_LOOKUP_SECRET") {
            self.keys.name_lookup_secret = Some(secret);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Qdrant gRPC URL
    pub url: String,

    /// Qdrant API key
    pub api_key: Option<String>,

    /// Collection holding agent records
    pub collection: String,

    /// Vector dimension (must match embedding model)
    pub dimension: usize,

    /// HNSW graph degree
    pub hnsw_m: u64,

    /// HNSW construction breadth
    pub hnsw_ef_construct: u64,

    /// Search breadth (nprobe equivalent)
    pub search_breadth: u64,

    /// Number of nearest records returned by a search
    pub top_k: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "agents".to_string(),
            dimension: EMBEDDING_DIMENSION,
            hnsw_m: 16,
            hnsw_ef_construct: 128,
            search_breadth: 10,
            top_k: 10,
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider to use
    pub provider: EmbeddingProvider,

    /// Embedding model name
    pub model: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum cached embeddings (0 disables the cache)
    pub cache_capacity: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            model: "all-minilm".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            openai_api_key: None,
            openai_base_url: None,
            timeout_secs: 30,
            cache_capacity: 1_000,
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAI,
    Ollama,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Locations of key material
///
/// Writers only need `public_key_path`. Readers that decrypt search results
/// also need `private_key_path`.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeyConfig {
    /// PEM-encoded RSA public key
    pub public_key_path: Option<PathBuf>,

    /// PEM-encoded RSA private key
    pub private_key_path: Option<PathBuf>,

    /// Password for an encrypted PKCS#8 private key
    pub private_key_password: Option<String>,

    /// Secret for the keyed name lookup hash
    pub name_lookup_secret: Option<String>,
}

impl std::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("public_key_path", &self.public_key_path)
            .field("private_key_path", &self.private_key_path)
            .field(
                "private_key_password",
                &self.private_key_password.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "name_lookup_secret",
                &self.name_lookup_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Record store behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rebuild the vector index after every insert
    pub refresh_index_after_insert: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            refresh_index_after_insert: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
