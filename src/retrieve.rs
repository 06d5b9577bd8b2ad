//! Query-time retrieval
//!
//! Embeds a question with query intent, runs a top-k similarity search
//! against the live collection, and exposes the two things the answer
//! boundary needs: the context string (passages joined by blank lines) and
//! the de-duplicated source URLs in first-seen order.

use crate::embed::{EmbedMode, Embedder};
use crate::error::{Error, Result};
use crate::store::VectorIndex;
use serde::Serialize;
use tracing::{debug, info};

/// Maximum characters of an underlying error shown to a user
const USER_MESSAGE_LIMIT: usize = 200;

/// A retrieved passage with its source page
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    pub text: String,
    pub url: String,
    pub score: f32,
}

/// Ordered retrieval result, best match first
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieved {
    pub passages: Vec<Passage>,
}

impl Retrieved {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Concatenate passage texts, separated by blank lines
    pub fn context(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Source URLs de-duplicated in first-seen order
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for passage in &self.passages {
            if !seen.contains(&passage.url) {
                seen.push(passage.url.clone());
            }
        }
        seen
    }
}

/// Query-time retriever
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    default_k: usize,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex, default_k: usize) -> Self {
        Self {
            embedder,
            index,
            default_k,
        }
    }

    /// Retrieve the top-k passages for a question.
    ///
    /// The question is assumed non-empty; rejecting blank input is the
    /// caller's concern. No query embedding is cached.
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Retrieved> {
        let k = k.unwrap_or(self.default_k);
        info!("Retrieving top {} passages", k);

        let vector = self.embedder.embed(query, EmbedMode::Query).await?;
        let hits = self.index.query(vector, k).await?;
        debug!("Got {} hits from the index", hits.len());

        let passages = hits
            .into_iter()
            .map(|hit| Passage {
                text: hit.payload.text,
                url: hit.payload.url,
                score: hit.score,
            })
            .collect();

        Ok(Retrieved { passages })
    }
}

/// Format a retrieval-time failure as a user-visible message.
///
/// Rate-limit errors are recognized by message content and given a
/// distinct, friendlier message; everything else is truncated so raw
/// service errors never reach the user at full length.
pub fn user_message(err: &Error) -> String {
    let msg = err.to_string();
    if msg.contains("429") || msg.to_lowercase().contains("rate limit") {
        return "Rate limit reached. Please wait a moment and try again.".to_string();
    }

    let mut truncated: String = msg.chars().take(USER_MESSAGE_LIMIT).collect();
    if msg.chars().count() > USER_MESSAGE_LIMIT {
        truncated.push_str("...");
    }
    format!("Retrieval error: {}", truncated)
}
