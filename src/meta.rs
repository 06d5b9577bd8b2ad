//! Chunk metadata side-store
//!
//! Every successfully upserted chunk gets one append-only audit row in a
//! relational store: the page URL and the chunk's text length. The write is
//! fire-and-forget relative to ingestion; a failure here never un-counts a
//! stored chunk. Connections are opened and closed per write, matching the
//! low write rate of a sequential ingestion run.

use crate::config::MetadataConfig;
use crate::error::Result;
use sqlx::{Connection, PgConnection};
use tracing::debug;

/// SQL schema for the metadata table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chunks_metadata (
    id BIGSERIAL PRIMARY KEY,
    url TEXT NOT NULL,
    text_length INTEGER NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

/// Postgres-backed metadata store
pub struct MetadataStore {
    database_url: String,
}

impl MetadataStore {
    /// Build a store from config; returns None when the database URL
    /// environment variable is unset, which disables metadata writes.
    pub fn from_config(config: &MetadataConfig) -> Option<Self> {
        std::env::var(&config.database_url_env)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Create the metadata table if it does not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = PgConnection::connect(&self.database_url).await?;
        sqlx::query(SCHEMA_SQL).execute(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }

    /// Append one (url, text_length) row
    pub async fn record_chunk(&self, url: &str, text_length: i64) -> Result<()> {
        let mut conn = PgConnection::connect(&self.database_url).await?;
        sqlx::query("INSERT INTO chunks_metadata (url, text_length) VALUES ($1, $2)")
            .bind(url)
            .bind(text_length)
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        debug!(url = %url, text_length, "Recorded chunk metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_append_only() {
        assert!(SCHEMA_SQL.contains("chunks_metadata"));
        assert!(SCHEMA_SQL.contains("text_length"));
        // No uniqueness constraint beyond the synthetic key: duplicate
        // (url, text_length) rows are expected.
        assert!(!SCHEMA_SQL.contains("UNIQUE"));
    }

    #[test]
    fn test_from_config_requires_env() {
        let config = MetadataConfig {
            database_url_env: "SITESAGE_TEST_UNSET_DB_URL".to_string(),
        };
        assert!(MetadataStore::from_config(&config).is_none());
    }
}
