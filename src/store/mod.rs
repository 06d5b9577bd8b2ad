//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Destructive collection recreation (one full rebuild per ingestion run)
//! - Single-point upsert keyed by chunk id
//! - Top-k similarity search
//!
//! The [`VectorIndex`] trait is the seam between the pipeline and the
//! store, so the orchestrator and retriever can be exercised against an
//! in-memory index in tests.

mod payload;

pub use payload::*;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CreateCollectionBuilder, Distance, PointId, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

/// A search hit with its similarity score and stored payload
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub id: u64,
    pub score: f32,
    pub payload: PagePayload,
}

/// Trait over the vector store operations the pipeline needs
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop the collection if it exists and create it fresh.
    /// Destructive and idempotent; called exactly once per ingestion run,
    /// before any upsert.
    async fn recreate(&self) -> Result<()>;

    /// Insert or replace a single record keyed by chunk id
    async fn upsert(&self, id: u64, vector: Vec<f32>, payload: PagePayload) -> Result<()>;

    /// Return up to `top_k` records ordered by similarity, highest first
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ScoredPassage>>;
}

/// Qdrant-backed index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to Qdrant using config
    pub fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key(),
            &config.collection_name,
            config.embedding.dimension,
        )
    }

    /// Create a new index handle directly with URL and collection name
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url).skip_compatibility_check();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Get the expected vector dimension for this index
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn recreate(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        Ok(())
    }

    async fn upsert(&self, id: u64, vector: Vec<f32>, payload: PagePayload) -> Result<()> {
        debug!(chunk_id = id, "Upserting point to {}", self.collection);

        let point = PagePoint {
            id,
            vector,
            payload,
        };

        self.client
            .upsert_points(UpsertPointsBuilder::new(
                &self.collection,
                vec![point.to_point_struct()],
            ))
            .await?;

        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ScoredPassage>> {
        debug!(
            "Searching collection {} with top_k {}",
            self.collection, top_k
        );

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, top_k as u64)
                    .with_payload(true),
            )
            .await?;

        let results = response
            .result
            .into_iter()
            .map(|p| ScoredPassage {
                id: point_id_to_num(p.id),
                score: p.score,
                payload: PagePayload::from_qdrant_payload(&p.payload),
            })
            .collect();

        Ok(results)
    }
}

/// Convert a PointId back to the numeric chunk id
fn point_id_to_num(id: Option<PointId>) -> u64 {
    match id {
        Some(PointId {
            point_id_options: Some(PointIdOptions::Num(num)),
        }) => num,
        _ => 0,
    }
}
