//! Configuration management for sitesage
//!
//! Handles loading and validating configuration from TOML files, with
//! environment-variable fallbacks for URLs and secrets.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sitemap URL of the site to ingest
    #[serde(default = "default_sitemap_url")]
    pub sitemap_url: String,

    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Environment variable name for the Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub qdrant_api_key_env: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Page extraction configuration
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Answer generation configuration
    #[serde(default)]
    pub answer: AnswerConfig,

    /// Chunk metadata side-store configuration
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// What to do when an embedding provider returns a vector whose length does
/// not match the configured dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimensionPolicy {
    /// Log a warning and keep the vector unchanged
    #[default]
    AdmitAndWarn,
    /// Treat the mismatch as an embedding error
    FailFast,
}

/// Embedding configuration
///
/// Two providers sit behind the same boundary: one embeds page chunks at
/// ingestion time, the other embeds questions at query time. Both must
/// honor the configured dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Expected vector dimension (must match the collection)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// How to handle a returned vector of the wrong length
    #[serde(default)]
    pub dimension_policy: DimensionPolicy,

    /// Provider used for document embeddings during ingestion
    #[serde(default = "ProviderConfig::document_default")]
    pub document: ProviderConfig,

    /// Provider used for query embeddings at retrieval time
    #[serde(default = "ProviderConfig::query_default")]
    pub query: ProviderConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_embedding_dimension(),
            dimension_policy: DimensionPolicy::default(),
            document: ProviderConfig::document_default(),
            query: ProviderConfig::query_default(),
        }
    }
}

/// A single embedding provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider family ("cohere" or "openai")
    pub provider: String,

    /// Model identifier sent with every request
    pub model: String,

    /// API base URL
    pub api_base: String,

    /// Environment variable name holding the API key
    pub api_key_env: String,
}

impl ProviderConfig {
    pub fn document_default() -> Self {
        Self {
            provider: default_document_provider(),
            model: default_document_model(),
            api_base: default_cohere_api_base(),
            api_key_env: default_cohere_api_key_env(),
        }
    }

    pub fn query_default() -> Self {
        Self {
            provider: default_query_provider(),
            model: default_query_model(),
            api_base: default_openai_api_base(),
            api_key_env: default_openai_api_key_env(),
        }
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        let key = std::env::var(&self.api_key_env).unwrap_or_default();
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(Error::Config(format!(
                "API key missing: set {}",
                self.api_key_env
            )));
        }
        Ok(key)
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
        }
    }
}

/// Page extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Page fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Sitemap fetch timeout in seconds
    #[serde(default = "default_sitemap_timeout")]
    pub sitemap_timeout_secs: u64,

    /// Pages whose extracted text exceeds this many characters are rejected
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            sitemap_timeout_secs: default_sitemap_timeout(),
            max_page_chars: default_max_page_chars(),
            user_agent: default_user_agent(),
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of passages to retrieve
    #[serde(default = "default_query_k")]
    pub default_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_query_k(),
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Chat model identifier
    #[serde(default = "default_answer_model")]
    pub model: String,

    /// API base URL (OpenAI-compatible chat completions)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Environment variable name holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// System instructions for the answer model
    #[serde(default = "default_answer_instructions")]
    pub instructions: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            model: default_answer_model(),
            api_base: default_openai_api_base(),
            api_key_env: default_openai_api_key_env(),
            instructions: default_answer_instructions(),
        }
    }
}

/// Chunk metadata side-store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Environment variable name holding the Postgres connection URL.
    /// When the variable is unset, metadata writes are disabled.
    #[serde(default = "default_metadata_database_url_env")]
    pub database_url_env: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            database_url_env: default_metadata_database_url_env(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or fall back to defaults when
    /// no file is given or the default path does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                debug!("Loading config from {}", p.display());
                let raw = std::fs::read_to_string(p)?;
                let config: Config = toml::from_str(&raw)?;
                config.validate()?;
                Ok(config)
            }
            None => {
                let default_path = Path::new("sitesage.toml");
                if default_path.exists() {
                    Self::load(Some(default_path))
                } else {
                    debug!("No config file, using defaults");
                    let config = Config {
                        sitemap_url: default_sitemap_url(),
                        qdrant_url: default_qdrant_url(),
                        qdrant_api_key_env: default_qdrant_api_key_env(),
                        collection_name: default_collection_name(),
                        ..Config::default()
                    };
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Basic sanity checks after loading
    pub fn validate(&self) -> Result<()> {
        if self.collection_name.is_empty() {
            return Err(Error::Config("collection_name must not be empty".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be positive".into()));
        }
        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".into()));
        }
        Ok(())
    }

    /// Resolve the Qdrant API key from the configured environment variable
    pub fn qdrant_api_key(&self) -> Option<String> {
        std::env::var(&self.qdrant_api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config {
            collection_name: default_collection_name(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(config.chunk.max_chars, 1200);
        assert_eq!(config.query.default_k, 5);
        assert_eq!(
            config.embedding.dimension_policy,
            DimensionPolicy::AdmitAndWarn
        );
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
sitemap_url = "https://example.com/sitemap.xml"
collection_name = "docs"

[embedding]
dimension = 1024
dimension_policy = "fail-fast"

[chunk]
max_chars = 800
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.sitemap_url, "https://example.com/sitemap.xml");
        assert_eq!(config.collection_name, "docs");
        assert_eq!(config.embedding.dimension_policy, DimensionPolicy::FailFast);
        assert_eq!(config.chunk.max_chars, 800);
        // Untouched sections keep their defaults.
        assert_eq!(config.embedding.document.provider, "cohere");
        assert_eq!(config.embedding.query.provider, "openai");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[chunk]\nmax_chars = 0\n").unwrap();

        let err = Config::load(Some(file.path()));
        assert!(err.is_err());
    }
}
