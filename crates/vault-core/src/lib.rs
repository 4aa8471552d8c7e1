//! Vault Core - Domain models, errors and shared constants
//!
//! This crate defines the abstractions shared by every layer of the agent vault:
//! - Agent descriptor records and search matches
//! - The error taxonomy surfaced to callers
//! - Schema bounds inherited from the stored collection
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, KeyConfig, LoggingConfig,
    ServerConfig, StoreConfig, VectorConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Dimension of the topic embedding stored with every record
pub const EMBEDDING_DIMENSION: usize = 384;

/// Separator used to join topics into the text that gets embedded
pub const TOPIC_SEPARATOR: &str = ", ";

/// Maximum description length in characters, before encryption
pub const MAX_DESCRIPTION_CHARS: usize = 800;

/// Maximum number of topics per record
pub const MAX_TOPICS: usize = 100;

/// Maximum length of a single topic in characters
pub const MAX_TOPIC_CHARS: usize = 100;

/// Maximum length of the output format tag in characters
pub const MAX_OUTPUT_FORMAT_CHARS: usize = 100;

// ============================================================================
// Error Types
// ============================================================================

/// Error taxonomy for vault operations
///
/// Variants separate failures of the caller's data or keys from failures of
/// the backing services, so outer layers can map them without inspecting
/// messages.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vector backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Failed to load key: {0}")]
    KeyLoadError(String),

    #[error("Plaintext of {len} bytes exceeds the {max}-byte limit for this key")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VaultError {
    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_) | Self::ModelUnavailable(_)
        )
    }

    /// Whether the failure was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::PlaintextTooLarge { .. }
        )
    }
}

impl From<ConfigError> for VaultError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;

// ============================================================================
// Agent Records
// ============================================================================

/// An agent descriptor as supplied by a writer
///
/// `name` and `description` are confidential and only ever persisted in
/// encrypted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Display name of the agent
    pub name: String,

    /// Free-form description of what the agent does
    pub description: String,

    /// Ordered topic tags; the embedding is computed from these
    pub topics: Vec<String>,

    /// Output format tag (e.g. "json")
    pub output_format: String,

    /// Whether the agent is currently active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl AgentDescriptor {
    /// Create a new active descriptor with an empty output format
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        topics: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            topics,
            output_format: String::new(),
            is_active: true,
        }
    }

    /// Set the output format tag
    pub fn with_output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = output_format.into();
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Check the descriptor against the collection's field bounds
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VaultError::ValidationError(
                "name must not be empty".to_string(),
            ));
        }

        let description_chars = self.description.chars().count();
        if description_chars > MAX_DESCRIPTION_CHARS {
            return Err(VaultError::ValidationError(format!(
                "description has {description_chars} characters, limit is {MAX_DESCRIPTION_CHARS}"
            )));
        }

        validate_topics(&self.topics)?;

        let format_chars = self.output_format.chars().count();
        if format_chars > MAX_OUTPUT_FORMAT_CHARS {
            return Err(VaultError::ValidationError(format!(
                "output_format has {format_chars} characters, limit is {MAX_OUTPUT_FORMAT_CHARS}"
            )));
        }

        Ok(())
    }
}

/// Check a topic list against the collection's bounds
pub fn validate_topics(topics: &[String]) -> Result<()> {
    if topics.is_empty() {
        return Err(VaultError::ValidationError(
            "at least one topic is required".to_string(),
        ));
    }

    if topics.len() > MAX_TOPICS {
        return Err(VaultError::ValidationError(format!(
            "{} topics given, limit is {MAX_TOPICS}",
            topics.len()
        )));
    }

    if let Some(topic) = topics
        .iter()
        .find(|t| t.chars().count() > MAX_TOPIC_CHARS)
    {
        return Err(VaultError::ValidationError(format!(
            "topic '{topic}' exceeds {MAX_TOPIC_CHARS} characters"
        )));
    }

    Ok(())
}

/// Join topics into the exact text that gets embedded
///
/// Order is preserved; no case or whitespace normalization is applied.
pub fn join_topics(topics: &[String]) -> String {
    topics.join(TOPIC_SEPARATOR)
}

/// A decrypted search hit returned to an authorized reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMatch {
    /// Backend-assigned record identifier
    pub id: String,

    /// L2 distance to the query embedding (lower is closer)
    pub distance: f32,

    /// Decrypted agent name
    pub name: String,

    /// Decrypted agent description
    pub description: String,

    /// Stored topic tags
    pub topics: Vec<String>,

    /// Output format tag
    pub output_format: String,

    /// Active flag
    pub is_active: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_topics_preserves_order() {
        assert_eq!(join_topics(&topics(&["weather", "forecast"])), "weather, forecast");
        assert_eq!(join_topics(&topics(&["forecast", "weather"])), "forecast, weather");
        assert_eq!(join_topics(&topics(&[" Mixed ", "case"])), " Mixed , case");
    }

    #[test]
    fn test_descriptor_defaults_to_active() {
        let json = r#"{"name":"n","description":"d","topics":["t"],"output_format":"json"}"#;
        let descriptor: AgentDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.is_active);
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let descriptor = AgentDescriptor::new("Weather Agent", "x".repeat(800), topics(&["weather"]))
            .with_output_format("f".repeat(100));
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_long_description() {
        let descriptor = AgentDescriptor::new("n", "x".repeat(801), topics(&["weather"]));
        let err = descriptor.validate().unwrap_err();
        assert!(matches!(err, VaultError::ValidationError(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validate_rejects_topic_bounds() {
        assert!(validate_topics(&[]).is_err());
        assert!(validate_topics(&vec!["t".to_string(); 101]).is_err());
        assert!(validate_topics(&["t".repeat(101)]).is_err());
        assert!(validate_topics(&["t".repeat(100)]).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let descriptor = AgentDescriptor::new("", "d", topics(&["t"]));
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_error_classification() {
        assert!(VaultError::BackendUnavailable("down".into()).is_retryable());
        assert!(VaultError::ModelUnavailable("down".into()).is_retryable());
        assert!(!VaultError::KeyUnavailable("none".into()).is_retryable());
        assert!(VaultError::PlaintextTooLarge { len: 300, max: 190 }.is_client_error());
        assert!(!VaultError::DecryptionFailed("bad".into()).is_client_error());
    }
}
