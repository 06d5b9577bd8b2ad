//! Ingestion orchestrator
//!
//! Drives the offline pipeline: discover page URLs from the sitemap,
//! recreate the collection, then for each URL extract text, chunk it, embed
//! each chunk, and upsert it into the vector index. Discovery and
//! collection recreation are fatal when they fail; everything downstream is
//! skip-and-continue, recorded as an explicit per-page / per-chunk outcome
//! rather than surfaced through errors, so the terminal report is derived
//! from data.
//!
//! Chunk ids are assigned sequentially across the whole run, starting at 1.
//! A chunk that fails after id assignment keeps its id consumed, so stored
//! ids are strictly increasing but not dense.

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embed::{EmbedMode, Embedder};
use crate::error::{Error, Result};
use crate::extract::PageExtractor;
use crate::meta::MetadataStore;
use crate::sitemap::SitemapClient;
use crate::store::{PagePayload, VectorIndex};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to a single chunk after its id was assigned
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// Embedded, upserted, and counted
    Stored { id: u64, text_length: usize },
    /// Embedding call failed; id consumed, chunk skipped
    EmbedFailed { id: u64, reason: String },
    /// Vector store rejected the upsert; id consumed, chunk skipped
    UpsertFailed { id: u64, reason: String },
}

impl ChunkOutcome {
    pub fn id(&self) -> u64 {
        match self {
            ChunkOutcome::Stored { id, .. }
            | ChunkOutcome::EmbedFailed { id, .. }
            | ChunkOutcome::UpsertFailed { id, .. } => *id,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, ChunkOutcome::Stored { .. })
    }
}

/// What happened to a single page
#[derive(Debug, Clone)]
pub enum PageStatus {
    /// Text was extracted; chunk outcomes follow
    Ingested(Vec<ChunkOutcome>),
    /// Fetch/extract produced no usable text; page skipped whole
    Skipped,
}

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: String,
    pub status: PageStatus,
}

/// Terminal report of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages: Vec<PageOutcome>,
}

impl IngestSummary {
    fn chunk_outcomes(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.pages.iter().flat_map(|p| match &p.status {
            PageStatus::Ingested(outcomes) => outcomes.as_slice(),
            PageStatus::Skipped => &[],
        })
    }

    /// Number of chunks successfully upserted (not the number attempted)
    pub fn chunks_stored(&self) -> usize {
        self.chunk_outcomes().filter(|c| c.is_stored()).count()
    }

    /// Number of chunks skipped after id assignment
    pub fn chunks_failed(&self) -> usize {
        self.chunk_outcomes().filter(|c| !c.is_stored()).count()
    }

    pub fn pages_ingested(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.status, PageStatus::Ingested(_)))
            .count()
    }

    pub fn pages_skipped(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.status, PageStatus::Skipped))
            .count()
    }
}

/// Ingestion orchestrator
pub struct Ingestor<'a> {
    config: &'a Config,
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    metadata: Option<&'a MetadataStore>,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        config: &'a Config,
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        metadata: Option<&'a MetadataStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            index,
            metadata,
        }
    }

    /// Run a full ingestion: discovery, collection recreation, ingestion.
    ///
    /// A sitemap that cannot be fetched, a sitemap with no URLs, and a
    /// failed collection recreation all abort the run with zero chunks
    /// stored.
    pub async fn run(&self) -> Result<IngestSummary> {
        let sitemap = SitemapClient::new(&self.config.extract)?;
        let urls = sitemap.discover(&self.config.sitemap_url).await?;

        if urls.is_empty() {
            return Err(Error::Sitemap(format!(
                "No URLs discovered from {}",
                self.config.sitemap_url
            )));
        }

        self.index.recreate().await?;

        self.ingest_urls(&urls).await
    }

    /// Ingest an already-discovered URL list, sequentially, one chunk at a
    /// time. Never fails: per-page and per-chunk problems become outcomes.
    pub async fn ingest_urls(&self, urls: &[String]) -> Result<IngestSummary> {
        let extractor = PageExtractor::new(&self.config.extract)?;
        let started_at = Utc::now();

        let mut next_id: u64 = 1;
        let mut pages = Vec::with_capacity(urls.len());
        let progress = start_progress_bar(urls.len(), "Ingesting pages");

        for url in urls {
            info!("Processing: {}", url);

            let text = extractor.extract(url).await;
            if text.trim().is_empty() {
                warn!(url = %url, "Skipping page with no usable text");
                pages.push(PageOutcome {
                    url: url.clone(),
                    status: PageStatus::Skipped,
                });
                advance_progress(&progress);
                continue;
            }

            debug!(url = %url, chars = text.chars().count(), "Chunking page");

            let mut outcomes = Vec::new();
            for chunk in chunk_text(&text, self.config.chunk.max_chars) {
                let id = next_id;
                next_id += 1; // consumed even when the chunk fails below
                outcomes.push(self.process_chunk(id, url, &chunk).await);
            }

            pages.push(PageOutcome {
                url: url.clone(),
                status: PageStatus::Ingested(outcomes),
            });
            advance_progress(&progress);
        }

        finish_progress(progress, "Pages processed");

        let summary = IngestSummary {
            started_at,
            finished_at: Utc::now(),
            pages,
        };

        info!(
            "Ingestion complete: {} chunks stored, {} skipped, {} of {} pages ingested",
            summary.chunks_stored(),
            summary.chunks_failed(),
            summary.pages_ingested(),
            summary.pages.len()
        );

        Ok(summary)
    }

    async fn process_chunk(&self, id: u64, url: &str, chunk: &str) -> ChunkOutcome {
        let vector = match self.embedder.embed(chunk, EmbedMode::Document).await {
            Ok(v) => v,
            Err(e) => {
                warn!(chunk_id = id, url = %url, "Embedding failed: {}", e);
                return ChunkOutcome::EmbedFailed {
                    id,
                    reason: e.to_string(),
                };
            }
        };

        let text_length = chunk.chars().count();
        let payload = PagePayload::new(url.to_string(), chunk.to_string(), id);

        if let Err(e) = self.index.upsert(id, vector, payload).await {
            warn!(chunk_id = id, url = %url, "Upsert failed: {}", e);
            return ChunkOutcome::UpsertFailed {
                id,
                reason: e.to_string(),
            };
        }

        // Fire-and-forget: the chunk is already stored in the index.
        if let Some(meta) = self.metadata {
            if let Err(e) = meta.record_chunk(url, text_length as i64).await {
                warn!(chunk_id = id, url = %url, "Metadata write failed: {}", e);
            }
        }

        debug!(chunk_id = id, url = %url, "Stored chunk");
        ChunkOutcome::Stored { id, text_length }
    }
}

fn start_progress_bar(len: usize, message: &str) -> Option<ProgressBar> {
    if len == 0 {
        return None;
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn advance_progress(pb: &Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::ScoredPassage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct MockEmbedder {
        fail_on_substring: Option<String>,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                fail_on_substring: None,
            }
        }

        fn failing_on(needle: &str) -> Self {
            Self {
                fail_on_substring: Some(needle.to_string()),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str, _mode: EmbedMode) -> crate::error::Result<Vec<f32>> {
            if let Some(needle) = &self.fail_on_substring {
                if text.contains(needle) {
                    return Err(Error::Embedding("mock embed failure".to_string()));
                }
            }
            Ok(vec![0.0; 4])
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "mock-embed"
        }
    }

    #[derive(Default)]
    struct MockIndex {
        records: Mutex<HashMap<u64, PagePayload>>,
        recreate_calls: Mutex<usize>,
        fail_upsert_ids: Vec<u64>,
        fail_recreate: bool,
    }

    impl MockIndex {
        fn stored_ids(&self) -> Vec<u64> {
            let mut ids: Vec<u64> = self.records.lock().unwrap().keys().copied().collect();
            ids.sort_unstable();
            ids
        }
    }

    #[async_trait]
    impl VectorIndex for MockIndex {
        async fn recreate(&self) -> crate::error::Result<()> {
            if self.fail_recreate {
                return Err(Error::Qdrant("mock recreate failure".to_string()));
            }
            *self.recreate_calls.lock().unwrap() += 1;
            self.records.lock().unwrap().clear();
            Ok(())
        }

        async fn upsert(
            &self,
            id: u64,
            _vector: Vec<f32>,
            payload: PagePayload,
        ) -> crate::error::Result<()> {
            if self.fail_upsert_ids.contains(&id) {
                return Err(Error::Qdrant("mock upsert failure".to_string()));
            }
            self.records.lock().unwrap().insert(id, payload);
            Ok(())
        }

        async fn query(
            &self,
            _vector: Vec<f32>,
            _top_k: usize,
        ) -> crate::error::Result<Vec<ScoredPassage>> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> Config {
        Config {
            collection_name: "test".to_string(),
            chunk: crate::config::ChunkConfig { max_chars: 10 },
            ..Config::default()
        }
    }

    /// Serve a page whose extracted text is exactly `text`
    async fn mount_page(server: &MockServer, route: &str, text: &str) {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("<body>{}</body>", text)),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ids_increase_across_url_boundaries() {
        let server = MockServer::start().await;
        // 30 chars each -> 3 chunks of 10 with max_chars = 10.
        mount_page(&server, "/one", &"a".repeat(30)).await;
        mount_page(&server, "/two", &"b".repeat(30)).await;

        let config = test_config();
        let embedder = MockEmbedder::new();
        let index = MockIndex::default();
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let urls = vec![
            format!("{}/one", server.uri()),
            format!("{}/two", server.uri()),
        ];
        let summary = ingestor.ingest_urls(&urls).await.unwrap();

        assert_eq!(summary.chunks_stored(), 6);
        assert_eq!(index.stored_ids(), vec![1, 2, 3, 4, 5, 6]);
        // Second page's chunks carry its URL in the payload.
        let records = index.records.lock().unwrap();
        assert!(records[&4].url.ends_with("/two"));
    }

    #[tokio::test]
    async fn test_failed_upsert_does_not_block_later_chunks() {
        let server = MockServer::start().await;
        mount_page(&server, "/one", &"a".repeat(30)).await;
        mount_page(&server, "/two", &"b".repeat(30)).await;

        let config = test_config();
        let embedder = MockEmbedder::new();
        let index = MockIndex {
            fail_upsert_ids: vec![2],
            ..MockIndex::default()
        };
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let urls = vec![
            format!("{}/one", server.uri()),
            format!("{}/two", server.uri()),
        ];
        let summary = ingestor.ingest_urls(&urls).await.unwrap();

        // Count reflects successful upserts, not attempts; the failed id
        // stays consumed.
        assert_eq!(summary.chunks_stored(), 5);
        assert_eq!(summary.chunks_failed(), 1);
        assert_eq!(index.stored_ids(), vec![1, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_embed_failure_consumes_id() {
        let server = MockServer::start().await;
        mount_page(&server, "/one", "aaaaaaaaaaFAILxxxxxxbbbbbbbbbb").await;

        let config = test_config();
        // Middle chunk ("FAILxxxxxx") fails to embed.
        let embedder = MockEmbedder::failing_on("FAIL");
        let index = MockIndex::default();
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let urls = vec![format!("{}/one", server.uri())];
        let summary = ingestor.ingest_urls(&urls).await.unwrap();

        assert_eq!(summary.chunks_stored(), 2);
        assert_eq!(index.stored_ids(), vec![1, 3]);

        let failed: Vec<u64> = match &summary.pages[0].status {
            PageStatus::Ingested(outcomes) => outcomes
                .iter()
                .filter(|o| !o.is_stored())
                .map(|o| o.id())
                .collect(),
            PageStatus::Skipped => panic!("page should not be skipped"),
        };
        assert_eq!(failed, vec![2]);
    }

    #[tokio::test]
    async fn test_unreachable_page_is_skipped_and_loop_continues() {
        let server = MockServer::start().await;
        mount_page(&server, "/one", &"a".repeat(10)).await;
        // "/missing" is not mounted -> 404 -> empty text -> skipped.
        mount_page(&server, "/three", &"c".repeat(10)).await;

        let config = test_config();
        let embedder = MockEmbedder::new();
        let index = MockIndex::default();
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let urls = vec![
            format!("{}/one", server.uri()),
            format!("{}/missing", server.uri()),
            format!("{}/three", server.uri()),
        ];
        let summary = ingestor.ingest_urls(&urls).await.unwrap();

        assert_eq!(summary.pages_skipped(), 1);
        assert_eq!(summary.pages_ingested(), 2);
        // Skipped pages consume no ids.
        assert_eq!(index.stored_ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_metadata_failure_does_not_uncount_chunks() {
        let server = MockServer::start().await;
        mount_page(&server, "/one", &"a".repeat(10)).await;

        let config = test_config();
        let embedder = MockEmbedder::new();
        let index = MockIndex::default();
        // Nothing is listening here, so every metadata write fails.
        let meta = MetadataStore::new("postgres://127.0.0.1:1/audit");
        let ingestor = Ingestor::new(&config, &embedder, &index, Some(&meta));

        let urls = vec![format!("{}/one", server.uri())];
        let summary = ingestor.ingest_urls(&urls).await.unwrap();

        // The side-write is fire-and-forget: the chunk is still stored.
        assert_eq!(summary.chunks_stored(), 1);
        assert_eq!(index.stored_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_run_aborts_when_sitemap_has_no_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a sitemap</html>"))
            .mount(&server)
            .await;

        let config = Config {
            sitemap_url: format!("{}/sitemap.xml", server.uri()),
            ..test_config()
        };
        let embedder = MockEmbedder::new();
        let index = MockIndex::default();
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(err, Error::Sitemap(_)));
        // The collection was never touched.
        assert_eq!(*index.recreate_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_aborts_when_recreate_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<urlset><url><loc>https://example.com/a</loc></url></urlset>",
            ))
            .mount(&server)
            .await;

        let config = Config {
            sitemap_url: format!("{}/sitemap.xml", server.uri()),
            ..test_config()
        };
        let embedder = MockEmbedder::new();
        let index = MockIndex {
            fail_recreate: true,
            ..MockIndex::default()
        };
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(err, Error::Qdrant(_)));
        assert!(index.stored_ids().is_empty());
    }

    #[tokio::test]
    async fn test_run_recreates_before_ingesting() {
        let page_server = MockServer::start().await;
        mount_page(&page_server, "/a", &"a".repeat(10)).await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/a</loc></url></urlset>",
                page_server.uri()
            )))
            .mount(&page_server)
            .await;

        let config = Config {
            sitemap_url: format!("{}/sitemap.xml", page_server.uri()),
            ..test_config()
        };
        let embedder = MockEmbedder::new();
        let index = MockIndex::default();
        let ingestor = Ingestor::new(&config, &embedder, &index, None);

        let summary = ingestor.run().await.unwrap();
        assert_eq!(*index.recreate_calls.lock().unwrap(), 1);
        assert_eq!(summary.chunks_stored(), 1);
    }
}
