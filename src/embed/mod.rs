//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - Cohere and OpenAI HTTP backends
//! - Dimension validation against the collection's configured size
//!
//! Documents and queries may be embedded by different providers; both sit
//! behind the same boundary and must honor the dimension contract.

mod cohere;
mod openai;

pub use cohere::*;
pub use openai::*;

use crate::config::{DimensionPolicy, EmbeddingConfig, ProviderConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::warn;

/// Whether text is being embedded for indexing or for searching.
///
/// Providers that distinguish the two (Cohere's `input_type`) use it to
/// pick the embedding intent; providers that don't simply ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// Page chunk being added to the index
    Document,
    /// Question being matched against the index
    Query,
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>>;

    /// Get the expected embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Validate a returned vector's length against the expected dimension.
///
/// Under [`DimensionPolicy::AdmitAndWarn`] a mismatch is logged and the
/// vector is passed through unchanged (never padded or truncated); under
/// [`DimensionPolicy::FailFast`] it becomes an embedding error.
pub fn check_dimension(
    vector: &[f32],
    expected: usize,
    policy: DimensionPolicy,
    model: &str,
) -> Result<()> {
    if vector.len() == expected {
        return Ok(());
    }

    match policy {
        DimensionPolicy::AdmitAndWarn => {
            warn!(
                model = %model,
                expected,
                got = vector.len(),
                "Vector dimension mismatch"
            );
            Ok(())
        }
        DimensionPolicy::FailFast => Err(Error::Embedding(format!(
            "Vector dimension mismatch for model '{}': expected {}, got {}",
            model,
            expected,
            vector.len()
        ))),
    }
}

/// Create an embedder for one side of the pipeline based on configuration
pub fn create_embedder(
    provider: &ProviderConfig,
    embedding: &EmbeddingConfig,
) -> Result<Box<dyn Embedder>> {
    match provider.provider.as_str() {
        "cohere" => Ok(Box::new(CohereEmbedder::new(provider, embedding)?)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(provider, embedding)?)),
        other => Err(Error::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
