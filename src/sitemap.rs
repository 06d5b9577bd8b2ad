//! Sitemap discovery
//!
//! Fetches the site's sitemap and extracts page URLs from `urlset/url/loc`
//! elements. Anything that is not a urlset document yields zero URLs; a
//! fetch failure is reported to the caller, who treats discovery failure as
//! fatal for the whole ingestion run.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Sitemap client
pub struct SitemapClient {
    client: Client,
}

impl SitemapClient {
    /// Create a new sitemap client
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.sitemap_timeout_secs))
            .gzip(true)
            .build()
            .map_err(|e| Error::Sitemap(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch a sitemap and return every page URL it lists.
    ///
    /// An unreachable sitemap or a non-success status is an error; a
    /// reachable document that is not a urlset simply yields no URLs.
    pub async fn discover(&self, sitemap_url: &str) -> Result<Vec<String>> {
        info!("Fetching sitemap: {}", sitemap_url);

        let response = self
            .client
            .get(sitemap_url)
            .send()
            .await
            .map_err(|e| Error::Sitemap(format!("{}: {}", sitemap_url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Sitemap(format!(
                "HTTP {}: {}",
                response.status(),
                sitemap_url
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| Error::Sitemap(format!("{}: {}", sitemap_url, e)))?;

        let urls = parse_urlset(&content);
        info!("Discovered {} URLs from sitemap", urls.len());
        Ok(urls)
    }
}

/// Extract page URLs from a urlset sitemap document.
///
/// Simple string-based XML scanning; documents without `<url>` blocks
/// produce an empty list.
pub fn parse_urlset(content: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for url_block in content.split("<url>").skip(1) {
        if let Some(end) = url_block.find("</url>") {
            let block = &url_block[..end];

            if let Some(loc) = extract_tag(block, "loc") {
                if Url::parse(&loc).is_ok() {
                    urls.push(loc);
                } else {
                    debug!("Skipping invalid sitemap URL: {}", loc);
                }
            }
        }
    }

    urls
}

/// Extract text content from an XML tag
fn extract_tag(content: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    content.find(&start_tag).and_then(|start| {
        let value_start = start + start_tag.len();
        content[value_start..]
            .find(&end_tag)
            .map(|end| content[value_start..value_start + end].trim().to_string())
    })
}
