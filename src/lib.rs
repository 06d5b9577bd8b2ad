//! sitesage: ingest a website into a vector index and answer questions about it.
//!
//! The pipeline has two halves:
//!
//! - **Ingestion** (offline, batch): discover page URLs from the site's
//!   sitemap, extract plain text from each page, slice it into fixed-size
//!   chunks, embed each chunk, and upsert the vectors into a Qdrant
//!   collection. The collection is fully recreated on every run.
//! - **Retrieval** (online, per request): embed a question, run a top-k
//!   similarity search against the collection, and hand the assembled
//!   context plus de-duplicated source URLs to an answer generator.

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod meta;
pub mod retrieve;
pub mod sitemap;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
