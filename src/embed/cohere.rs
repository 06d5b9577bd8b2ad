//! Cohere embedding backend
//!
//! Speaks the Cohere v1 embed API. Cohere distinguishes indexing from
//! searching via `input_type`, which is where [`EmbedMode`] lands on the
//! wire.

use super::{check_dimension, EmbedMode, Embedder};
use crate::config::{DimensionPolicy, EmbeddingConfig, ProviderConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct CohereEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dimension: usize,
    dimension_policy: DimensionPolicy,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input_type: &'a str,
    texts: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbedder {
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

    fn input_type(mode: EmbedMode) -> &'static str {
        match mode {
            EmbedMode::Document => "search_document",
            EmbedMode::Query => "search_query",
        }
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            input_type: Self::input_type(mode),
            texts: vec![text],
        };

        let response = self
            .client
            .post(format!("{}/v1/embed", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Cohere embed failed with HTTP {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        let vector = parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Cohere returned no embeddings".to_string()))?;

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
