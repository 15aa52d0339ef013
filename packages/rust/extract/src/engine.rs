//! Concurrent page fetcher.
//!
//! Fetches a fixed list of URLs with bounded concurrency and a per-request
//! timeout, runs each page through the [`ExtractorRegistry`], and returns one
//! [`ScrapedDocument`] per URL in input order. A failed fetch becomes a failed
//! document; it never aborts the batch.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use medsource_shared::{MedSourceError, Result, ScrapeConfig, ScrapedDocument};

use crate::adapters::ExtractorRegistry;

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches pages and turns them into [`ScrapedDocument`]s.
pub struct Fetcher {
    config: ScrapeConfig,
    client: Client,
    registry: ExtractorRegistry,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl Fetcher {
    /// Create a fetcher with the built-in extractor registry.
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        Self::with_registry(config, ExtractorRegistry::new())
    }

    /// Create a fetcher with a custom extractor registry.
    pub fn with_registry(config: ScrapeConfig, registry: ExtractorRegistry) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout())
            .build()
            .map_err(|e| MedSourceError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            registry,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for tests against mock servers).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// The registry used to route pages to extractors.
    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Fetch and extract every URL. Output order matches `urls`.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<ScrapedDocument> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let client = self.client.clone();
                let sem = semaphore.clone();
                let url = url.clone();
                let allow_localhost = self.allow_localhost;

                tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return Err(MedSourceError::Network("fetch pool closed".into()));
                    };
                    fetch_html(&client, &url, allow_localhost).await
                })
            })
            .collect();

        let mut documents = Vec::with_capacity(urls.len());
        for (url, handle) in urls.iter().zip(handles) {
            let fetched = match handle.await {
                Ok(result) => result,
                Err(e) => Err(MedSourceError::Network(format!("fetch task failed: {e}"))),
            };
            documents.push(self.to_document(url, fetched));
        }

        let failed = documents.iter().filter(|d| d.is_failed()).count();
        info!(
            fetched = documents.len() - failed,
            failed,
            duration_ms = start.elapsed().as_millis(),
            "fetch completed"
        );

        documents
    }

    /// Fetch and extract a single URL.
    pub async fn fetch_one(&self, url: &str) -> ScrapedDocument {
        let fetched = fetch_html(&self.client, url, self.allow_localhost).await;
        self.to_document(url, fetched)
    }

    /// Extract already-fetched markup (no network access).
    pub fn extract_html(&self, url: &str, html: &str) -> ScrapedDocument {
        let side_effects = self.registry.extract_side_effects(url, html);
        ScrapedDocument::extracted(url, html, side_effects)
    }

    fn to_document(&self, url: &str, fetched: Result<String>) -> ScrapedDocument {
        match fetched {
            Ok(html) => self.extract_html(url, &html),
            Err(e) => {
                warn!(url, error = %e, "fetch failed, continuing without this page");
                ScrapedDocument::failed(url, e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// GET a page and return its body text.
async fn fetch_html(client: &Client, url: &str, allow_localhost: bool) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| MedSourceError::Network(format!("{url}: invalid URL: {e}")))?;

    if !allow_localhost && is_ssrf_target(&parsed) {
        return Err(MedSourceError::Network(format!(
            "{url}: refusing to fetch local or private address"
        )));
    }

    debug!(url, "fetching page");

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| MedSourceError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MedSourceError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| MedSourceError::Network(format!("{url}: body read failed: {e}")))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod fetcher_tests {
    use std::time::Duration;

    use super::*;

    fn test_config() -> ScrapeConfig {
        ScrapeConfig {
            timeout_secs: 2,
            concurrency: 2,
            user_agent: "medsource-test".into(),
        }
    }

    #[test]
    fn test_ssrf_protection_blocks_file() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        let url = Url::parse("http://192.168.1.1/admin").unwrap();
        assert!(is_ssrf_target(&url));

        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert!(is_ssrf_target(&url));

        let url = Url::parse("http://[::1]/").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_allows_public() {
        let url = Url::parse("https://medlineplus.gov/druginfo/meds/a601209.html").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[test]
    fn extract_html_routes_by_domain() {
        let fetcher = Fetcher::new(test_config()).unwrap();
        let html = "<h2>Side effects</h2><p>intro</p><ul><li>hives</li></ul>";
        let doc = fetcher.extract_html("https://www.drugs.com/sfx/x.html", html);
        assert_eq!(doc.side_effects(), ["hives".to_string()]);
        assert!(!doc.is_failed());
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_order_and_degrades_failures() {
        let server = wiremock::MockServer::start().await;

        let slow_page = r#"<html><body>
            <h2>Side effects</h2>
            <ul><li>Nausea</li><li>Headache</li></ul>
        </body></html>"#;
        let fast_page = "<html><body><p>This drug may cause drowsiness.</p></body></html>";

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(slow_page)
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/fast"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(fast_page))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/slow", server.uri()),
            format!("{}/missing", server.uri()),
            format!("{}/fast", server.uri()),
        ];

        let fetcher = Fetcher::new(test_config()).unwrap().allow_localhost();
        let docs = fetcher.fetch_all(&urls).await;

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].url(), urls[0]);
        assert_eq!(docs[1].url(), urls[1]);
        assert_eq!(docs[2].url(), urls[2]);

        assert_eq!(docs[0].side_effects(), ["Headache".to_string(), "Nausea".to_string()]);

        assert!(docs[1].is_failed());
        assert!(docs[1].error().unwrap().contains("404"));
        assert!(docs[1].text().is_empty());

        assert_eq!(docs[2].side_effects(), ["drowsiness".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_timeout_becomes_failed_document() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/hang"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = ScrapeConfig {
            timeout_secs: 1,
            ..test_config()
        };
        let fetcher = Fetcher::new(config).unwrap().allow_localhost();
        let doc = fetcher.fetch_one(&format!("{}/hang", server.uri())).await;

        assert!(doc.is_failed());
        assert!(doc.side_effects().is_empty());
    }

    #[tokio::test]
    async fn test_local_addresses_blocked_by_default() {
        let fetcher = Fetcher::new(test_config()).unwrap();
        let doc = fetcher.fetch_one("http://127.0.0.1:9/page").await;
        assert!(doc.is_failed());
        assert!(doc.error().unwrap().contains("refusing"));
    }
}
