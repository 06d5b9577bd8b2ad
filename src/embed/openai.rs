//! OpenAI embedding backend
//!
//! Speaks the OpenAI embeddings API. OpenAI has no document/query intent
//! distinction, so [`EmbedMode`] is accepted and ignored; the requested
//! `dimensions` pins the output length to the collection size.

use super::{check_dimension, EmbedMode, Embedder};
use crate::config::{DimensionPolicy, EmbeddingConfig, ProviderConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimension: usize,
    dimension_policy: DimensionPolicy,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(provider: &ProviderConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: provider.api_base.trim_end_matches('/').to_string(),
            api_key: provider.api_key()?,
            model: provider.model.clone(),
            dimension: embedding.dimension,
            dimension_policy: embedding.dimension_policy,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str, _mode: EmbedMode) -> Result<Vec<f32>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimension,
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "OpenAI embeddings failed with HTTP {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("OpenAI returned no embeddings".to_string()))?;

        check_dimension(&vector, self.dimension, self.dimension_policy, &self.model)?;
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
