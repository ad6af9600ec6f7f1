use crate::headers;
use crate::parsing::ElementExtractor;
use crate::r#trait::PageSource;
use crate::{HarvestConfig, HarvestError, PageElement, Result};
use async_trait::async_trait;
use http_client::{HttpClient, Request, Response};
use http_types::{Method, Url};
use scraper::Html;
use std::fs;
use std::path::Path;

const MAX_REDIRECTS: u32 = 5;

/// [`PageSource`] backed by a real HTTP client and the HTML extractor.
///
/// Pages are fetched with browser-like headers, redirects are followed by
/// hand, and responses that look like throttling are reported as
/// [`HarvestError::RateLimit`] so the retry layer backs off.
///
/// # Examples
///
/// ```rust,no_run
/// use lyrics_harvest::{HarvestConfig, HttpPageSource, PageSource};
///
/// # async fn example() -> lyrics_harvest::Result<()> {
/// let config = HarvestConfig::default();
/// let http_client = http_client::native::NativeClient::new();
/// let source = HttpPageSource::new(Box::new(http_client), &config);
///
/// let (name, url) = source.find_artist("david bowie").await?;
/// let elements = source.discography_elements(&url).await?;
/// println!("{name}: {} elements", elements.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpPageSource {
    client: Box<dyn HttpClient>,
    base_url: String,
    search_url: String,
    rate_limit_patterns: Vec<String>,
    debug_save_responses: bool,
    extractor: ElementExtractor,
}

impl HttpPageSource {
    /// Create a page source for the site configured in `config`.
    pub fn new(client: Box<dyn HttpClient>, config: &HarvestConfig) -> Self {
        Self::with_rate_limit_patterns(
            client,
            config,
            vec![
                "too many requests".to_string(),
                "unusual activity".to_string(),
                "request for access".to_string(),
                "you have been blocked".to_string(),
                "temporarily blocked".to_string(),
                "verify you're human".to_string(),
                "prove you're not a robot".to_string(),
                "rate limit".to_string(),
            ],
        )
    }

    /// Create a page source with custom rate limit detection patterns.
    ///
    /// Patterns are matched case-insensitively against response bodies.
    pub fn with_rate_limit_patterns(
        client: Box<dyn HttpClient>,
        config: &HarvestConfig,
        rate_limit_patterns: Vec<String>,
    ) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client,
            extractor: ElementExtractor::new(&base_url),
            base_url,
            search_url: config.search_url.clone(),
            rate_limit_patterns,
            debug_save_responses: config.save_debug_responses,
        }
    }

    /// Fetch `url` and return the response body.
    async fn get_page(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let mut current_url = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let parsed = current_url
                .parse::<Url>()
                .map_err(|e| HarvestError::Http(format!("Invalid URL '{current_url}': {e}")))?;
            let mut request = Request::new(Method::Get, parsed);
            headers::add_page_headers(&mut request, referer);

            log::debug!("GET {current_url}");
            let mut response = self
                .client
                .send(request)
                .await
                .map_err(|e| HarvestError::Http(e.to_string()))?;

            if response.status() == 301 || response.status() == 302 {
                if let Some(location) = response.header("location").and_then(|h| h.get(0)) {
                    let next = self.extractor.resolve_link(location.as_str());
                    log::debug!("Following redirect from {current_url} to {next}");
                    current_url = next;
                    continue;
                }
            }

            return self.read_body(&current_url, &mut response).await;
        }

        Err(HarvestError::Http(format!("Too many redirects for {url}")))
    }

    /// Classify a response by status and body, then return the body.
    async fn read_body(&self, url: &str, response: &mut Response) -> Result<String> {
        let status = response.status();

        if status == 429 || status == 503 {
            let retry_after = response
                .header("retry-after")
                .and_then(|h| h.get(0))
                .and_then(|v| v.as_str().parse::<u64>().ok())
                .unwrap_or(60);
            log::warn!("Rate limited ({status}) fetching {url}");
            return Err(HarvestError::RateLimit { retry_after });
        }

        let body = response
            .body_string()
            .await
            .map_err(|e| HarvestError::Http(e.to_string()))?;

        if self.debug_save_responses {
            self.save_debug_response(url, status.into(), &body);
        }

        if self.is_rate_limit_response(&body) {
            log::warn!("Response from {url} looks like a block page");
            return Err(HarvestError::RateLimit { retry_after: 60 });
        }

        if !status.is_success() {
            return Err(HarvestError::Http(format!("GET {url} returned {status}")));
        }

        Ok(body)
    }

    /// Check if a response body indicates rate limiting
    fn is_rate_limit_response(&self, response_body: &str) -> bool {
        let body_lower = response_body.to_lowercase();
        self.rate_limit_patterns
            .iter()
            .any(|pattern| body_lower.contains(&pattern.to_lowercase()))
    }

    /// Save response to debug directory (optional debug feature)
    fn save_debug_response(&self, url: &str, status_code: u16, body: &str) {
        if let Err(e) = self.try_save_debug_response(url, status_code, body) {
            log::warn!("Failed to save debug response: {e}");
        }
    }

    fn try_save_debug_response(&self, url: &str, status_code: u16, body: &str) -> Result<()> {
        let debug_dir = Path::new("debug_responses");
        fs::create_dir_all(debug_dir)?;

        let url_path = url.strip_prefix(&self.base_url).unwrap_or(url);

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let safe_path = url_path.replace(['/', '?', '&', '=', '%', '+', ':'], "_");

        let file_path = debug_dir.join(format!("{timestamp}_{safe_path}_status{status_code}.html"));
        fs::write(&file_path, body)?;

        log::debug!("Saved HTTP response to {file_path:?} (status: {status_code}, url: {url_path})");
        Ok(())
    }
}

#[async_trait(?Send)]
impl PageSource for HttpPageSource {
    async fn discography_elements(&self, url: &str) -> Result<Vec<PageElement>> {
        let body = self.get_page(url, None).await?;
        let document = Html::parse_document(&body);
        self.extractor.discography_elements(&document)
    }

    async fn lyrics_elements(&self, url: &str) -> Result<Vec<PageElement>> {
        let body = self.get_page(url, Some(self.base_url.as_str())).await?;
        let document = Html::parse_document(&body);
        self.extractor.lyrics_elements(&document)
    }

    async fn find_artist(&self, artist: &str) -> Result<(String, String)> {
        let url = format!("{}?q={}", self.search_url, urlencoding::encode(artist));
        let body = self.get_page(&url, Some(self.base_url.as_str())).await?;
        let document = Html::parse_document(&body);
        self.extractor.parse_artist_search(&document, artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned `(status, body)` pairs by URL and records requests.
    #[derive(Debug, Default)]
    struct CannedClient {
        pages: HashMap<String, (u16, String)>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages.insert(url.to_string(), (status, body.to_string()));
            self
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn send(&self, req: Request) -> std::result::Result<Response, http_types::Error> {
            let url = req.url().to_string();
            self.requested.lock().unwrap().push(url.clone());

            let (status, body) = self
                .pages
                .get(&url)
                .cloned()
                .unwrap_or((404, "not found".to_string()));
            let mut response = Response::new(status);
            response.set_body(body);
            Ok(response)
        }
    }

    fn source(client: CannedClient) -> HttpPageSource {
        let config = HarvestConfig {
            base_url: "https://lyrics.test".to_string(),
            search_url: "https://search.lyrics.test/search.php".to_string(),
            ..HarvestConfig::default()
        };
        HttpPageSource::new(Box::new(client), &config)
    }

    #[tokio::test]
    async fn test_discography_page() {
        let client = CannedClient::default().with_page(
            "https://lyrics.test/b/bowie.html",
            200,
            r#"<div id="listAlbum"><div class="album">album: "Low" (1977)</div>
               <div class="listalbum-item"><a href="/lyrics/bowie/speedoflife.html">Speed Of Life</a></div></div>"#,
        );
        let elements = source(client)
            .discography_elements("https://lyrics.test/b/bowie.html")
            .await
            .unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(
            elements[1].link.as_deref(),
            Some("https://lyrics.test/lyrics/bowie/speedoflife.html")
        );
    }

    #[tokio::test]
    async fn test_search_url_is_encoded() {
        let client = CannedClient::default().with_page(
            "https://search.lyrics.test/search.php?q=david%20bowie",
            200,
            r#"<div class="panel">Artist results: <a href="/b/bowie.html">1. David Bowie</a></div>"#,
        );
        let (name, url) = source(client).find_artist("david bowie").await.unwrap();
        assert_eq!(name, "David Bowie");
        assert_eq!(url, "https://lyrics.test/b/bowie.html");
    }

    #[tokio::test]
    async fn test_throttling_status_is_rate_limit() {
        let client = CannedClient::default().with_page("https://lyrics.test/x.html", 503, "busy");
        let result = source(client).lyrics_elements("https://lyrics.test/x.html").await;
        assert!(matches!(result, Err(HarvestError::RateLimit { retry_after: 60 })));
    }

    #[tokio::test]
    async fn test_block_page_is_rate_limit() {
        let client = CannedClient::default().with_page(
            "https://lyrics.test/x.html",
            200,
            "<html><body>Our systems have detected unusual activity from your IP</body></html>",
        );
        let result = source(client).lyrics_elements("https://lyrics.test/x.html").await;
        assert!(matches!(result, Err(HarvestError::RateLimit { .. })));
    }

    #[tokio::test]
    async fn test_not_found_is_http_error() {
        let result = source(CannedClient::default())
            .lyrics_elements("https://lyrics.test/missing.html")
            .await;
        assert!(matches!(result, Err(HarvestError::Http(_))));
    }
}
