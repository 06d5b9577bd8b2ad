//! Page fetching and HTML text extraction
//!
//! A fetched page goes through three steps: strip non-content markup
//! (scripts, styles, navigation chrome), collapse whitespace, and reject
//! pages whose text is too large to embed economically. Fetch failures and
//! oversized pages both come back as empty text so the ingestion loop can
//! skip the page and keep going.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Node};
use std::time::Duration;
use tracing::{debug, warn};

/// Elements whose subtrees never contribute page text
const STRIPPED_ELEMENTS: [&str; 7] = [
    "script", "style", "noscript", "head", "nav", "footer", "header",
];

/// Page text extractor
pub struct PageExtractor {
    client: Client,
    max_page_chars: usize,
}

impl PageExtractor {
    /// Create a new extractor with a bounded fetch timeout
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_page_chars: config.max_page_chars,
        })
    }

    /// Fetch a page and return its normalized text.
    ///
    /// Returns an empty string when the fetch fails, the server responds
    /// with a non-success status, or the extracted text exceeds the size
    /// bound. The caller skips pages with empty text.
    pub async fn extract(&self, url: &str) -> String {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, "Fetch failed: {}", e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Fetch returned non-success status");
            return String::new();
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, "Failed to read response body: {}", e);
                return String::new();
            }
        };

        let text = extract_clean_text(&html);
        if text.chars().count() > self.max_page_chars {
            warn!(url = %url, chars = text.chars().count(), "Skipping oversized page");
            return String::new();
        }

        debug!(url = %url, chars = text.chars().count(), "Extracted page text");
        text
    }
}

/// Strip non-content markup from HTML and return whitespace-collapsed text
pub fn extract_clean_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    normalize_whitespace(&out)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if STRIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapse all whitespace runs to single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_strips_nav_and_collapses_whitespace() {
        let html = "<html><nav>Skip</nav><body>Hello   World</body></html>";
        assert_eq!(extract_clean_text(html), "Hello World");
    }

    #[test]
    fn test_strips_script_style_and_chrome() {
        let html = r#"
        <html>
        <head><title>Ignored</title><style>body { color: red; }</style></head>
        <body>
            <header>Site header</header>
            <script>var x = 1;</script>
            <noscript>Enable JS</noscript>
            <p>Visible   paragraph.</p>
            <footer>Copyright</footer>
        </body>
        </html>
        "#;
        assert_eq!(extract_clean_text(html), "Visible paragraph.");
    }

    #[test]
    fn test_nested_content_survives() {
        let html = "<body><div><p>One <b>two</b></p><p>three</p></div></body>";
        assert_eq!(extract_clean_text(html), "One two three");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  \r\n c "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[tokio::test]
    async fn test_extract_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><nav>Menu</nav><body>Hello   World</body></html>",
            ))
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(&ExtractConfig::default()).unwrap();
        let text = extractor.extract(&format!("{}/page", server.uri())).await;
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_empty() {
        let extractor = PageExtractor::new(&ExtractConfig::default()).unwrap();
        // Nothing is listening on this port.
        let text = extractor.extract("http://127.0.0.1:9/page").await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_http_error_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(&ExtractConfig::default()).unwrap();
        let text = extractor.extract(&format!("{}/missing", server.uri())).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_oversized_page_returns_empty() {
        let server = MockServer::start().await;
        let body = format!("<body>{}</body>", "word ".repeat(2_000));
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = ExtractConfig {
            max_page_chars: 100,
            ..ExtractConfig::default()
        };
        let extractor = PageExtractor::new(&config).unwrap();
        let text = extractor.extract(&format!("{}/huge", server.uri())).await;
        assert_eq!(text, "");
    }
}
