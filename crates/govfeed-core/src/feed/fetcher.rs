use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Proxy};

use super::federal::parse_federal_register;
use super::models::RawItem;
use super::parser::parse_feed;
use crate::catalog::{FeedSource, SourceKind};
use crate::config::FetchConfig;
use crate::{Error, Result};

// Rotating User-Agent pool - some government CDNs reject non-browser agents
static USER_AGENT_INDEX: AtomicUsize = AtomicUsize::new(0);
const USER_AGENTS: &[&str] = &[
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Get the next User-Agent in rotation
fn next_user_agent() -> &'static str {
    let index = USER_AGENT_INDEX.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
    USER_AGENTS[index]
}

/// Retrieves and parses one source
///
/// Implementations must not retry: a failed source simply contributes
/// nothing to the current search.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>>;
}

/// Feed fetcher backed by a shared HTTP client
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_bytes: usize,
}

impl HttpFeedFetcher {
    /// Create a new feed fetcher with configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Self::build_client(config.request_timeout_secs, &config.proxy_url)?;

        Ok(Self {
            client,
            max_feed_bytes: config.max_feed_bytes,
        })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ref proxy) = proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for feed fetching");
        }

        builder.build().map_err(Error::Http)
    }

    /// Build browser-like headers for a request
    fn build_headers(kind: SourceKind, user_agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let accept = match kind {
            SourceKind::Rss => {
                "application/rss+xml,application/atom+xml,application/feed+json,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.8"
            }
            SourceKind::FederalRegister => "application/json",
        };
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
        if let Ok(ua) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers
    }

    /// Single GET, mapped onto the per-source error taxonomy
    async fn fetch_body(&self, source: &FeedSource) -> Result<Bytes> {
        let url = source.url();
        let user_agent = next_user_agent();

        tracing::debug!(source = %url, user_agent, "Fetching source");

        let response = self
            .client
            .get(url)
            .headers(Self::build_headers(source.kind(), user_agent))
            .send()
            .await
            .map_err(|e| Error::unavailable(url, e))?;

        let status = response.status();
        let is_cloudflare = response.headers().get("cf-mitigated").is_some()
            || response
                .headers()
                .get("server")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("cloudflare"))
                .unwrap_or(false);

        if status == reqwest::StatusCode::FORBIDDEN && is_cloudflare {
            return Err(Error::unavailable(url, "Cloudflare protection detected"));
        }

        if !status.is_success() {
            return Err(Error::unavailable(url, format!("HTTP {}", status)));
        }

        if let Some(len) = response.content_length() {
            self.ensure_content_size(len as usize, url)?;
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::unavailable(url, e))?;

        self.ensure_content_size(body.len(), url)?;

        if is_cloudflare_challenge(&body) {
            return Err(Error::unavailable(url, "Cloudflare JavaScript challenge detected"));
        }

        Ok(body)
    }

    fn ensure_content_size(&self, size: usize, url: &str) -> Result<()> {
        if size > self.max_feed_bytes {
            return Err(Error::malformed(url, format!("feed too large ({} bytes)", size)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>> {
        let body = self.fetch_body(source).await?;

        match source.kind() {
            SourceKind::Rss => parse_feed(&body, source.url()),
            SourceKind::FederalRegister => parse_federal_register(&body, source.url()),
        }
    }
}

/// Check the first 2KB of a body for Cloudflare challenge markers
fn is_cloudflare_challenge(content: &[u8]) -> bool {
    let check_len = content.len().min(2048);
    let preview = String::from_utf8_lossy(&content[..check_len]);

    preview.contains("Just a moment...")
        || preview.contains("cf-browser-verification")
        || preview.contains("_cf_chl_opt")
        || preview.contains("challenge-platform")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_rotation() {
        let first = next_user_agent();
        let second = next_user_agent();
        assert_ne!(first, second);
        assert!(USER_AGENTS.contains(&first));
    }

    #[test]
    fn test_cloudflare_challenge_detection() {
        assert!(is_cloudflare_challenge(b"<html><title>Just a moment...</title>"));
        assert!(!is_cloudflare_challenge(b"<?xml version=\"1.0\"?><rss></rss>"));
    }

    #[test]
    fn test_content_size_limit() {
        let fetcher = HttpFeedFetcher::new(&FetchConfig {
            max_feed_bytes: 10,
            ..FetchConfig::default()
        })
        .unwrap();

        assert!(fetcher.ensure_content_size(10, "https://example.com").is_ok());
        let err = fetcher.ensure_content_size(11, "https://example.com").unwrap_err();
        assert!(matches!(err, Error::SourceMalformed { .. }));
    }

    #[test]
    fn test_accept_header_per_kind() {
        let headers = HttpFeedFetcher::build_headers(SourceKind::FederalRegister, USER_AGENTS[0]);
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        let headers = HttpFeedFetcher::build_headers(SourceKind::Rss, USER_AGENTS[0]);
        assert!(headers.get(ACCEPT).unwrap().to_str().unwrap().contains("rss+xml"));
    }
}
