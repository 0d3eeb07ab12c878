use crate::crawlers::crawler::FetchStrategy;
use crate::error::{Result, ScrapeError};
use crate::fetcher::{Fetcher, HeaderProfile};
use crate::parsers::{Extractor, PayloadKind};
use crate::results::{Page, RawContent};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

/// Upper bound for one browser scrape
const BROWSER_TIMEOUT: Duration = Duration::from_secs(45);

/// Fetches the server-rendered component stream and cleans its Markdown payload
pub struct DirectMarkdownStrategy {
    fetcher: Fetcher,
    extractor: Arc<Extractor>,
}

impl DirectMarkdownStrategy {
    pub fn new(fetcher: Fetcher, extractor: Arc<Extractor>) -> Self {
        Self { fetcher, extractor }
    }

    fn clean(&self, page: Page) -> Result<RawContent> {
        if PayloadKind::detect(&page.body) == PayloadKind::Html {
            ::log::warn!("Expected an artifact stream from {} but got HTML", page.url);
            return Err(ScrapeError::UnexpectedPayload {
                url: page.url.to_string(),
            });
        }

        let markdown = self.extractor.artifact_to_markdown(&page);
        if markdown.trim().is_empty() {
            return Err(ScrapeError::UnexpectedPayload {
                url: page.url.to_string(),
            });
        }
        Ok(RawContent { page, markdown })
    }
}

#[async_trait]
impl FetchStrategy for DirectMarkdownStrategy {
    fn name(&self) -> &'static str {
        "direct-markdown"
    }

    async fn fetch_and_extract(&self, url: &Url) -> Result<RawContent> {
        let page = self
            .fetcher
            .fetch_with(url, HeaderProfile::ComponentStream)
            .await?;
        self.clean(page)
    }

    fn extract_prefetched(&self, page: &Page) -> Option<Result<RawContent>> {
        // A document response still needs the stream request
        match PayloadKind::detect(&page.body) {
            PayloadKind::ArtifactStream => Some(self.clean(page.clone())),
            PayloadKind::Html => None,
        }
    }
}

/// Fetches the HTML document, selects the main content and converts it
pub struct HtmlStrategy {
    fetcher: Fetcher,
    extractor: Arc<Extractor>,
}

impl HtmlStrategy {
    pub fn new(fetcher: Fetcher, extractor: Arc<Extractor>) -> Self {
        Self { fetcher, extractor }
    }

    fn convert(&self, page: Page) -> Result<RawContent> {
        let markdown = self.extractor.html_to_markdown(&page)?;
        Ok(RawContent { page, markdown })
    }
}

#[async_trait]
impl FetchStrategy for HtmlStrategy {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn fetch_and_extract(&self, url: &Url) -> Result<RawContent> {
        let page = self.fetcher.fetch(url).await?;
        self.convert(page)
    }

    fn extract_prefetched(&self, page: &Page) -> Option<Result<RawContent>> {
        Some(self.convert(page.clone()))
    }
}

/// Reads the page source from a WebDriver session
///
/// The session is opened on first use and reused until `shutdown`.
pub struct BrowserStrategy {
    webdriver_url: String,
    extractor: Arc<Extractor>,
    client: Mutex<Option<Client>>,
}

impl BrowserStrategy {
    pub fn new(webdriver_url: &str, extractor: Arc<Extractor>) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            extractor,
            client: Mutex::new(None),
        }
    }

    async fn page_source(&self, url: &Url) -> Result<String> {
        let browser_error = |message: String| ScrapeError::Browser {
            url: url.to_string(),
            message,
        };

        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = connect_to_webdriver(&self.webdriver_url).await;
        }
        let Some(client) = guard.as_mut() else {
            return Err(browser_error(
                "no WebDriver server could be reached".to_string(),
            ));
        };

        let first = scrape(client, url).await;
        let source = match first {
            Err(e) if e.to_string().contains("Unable to find session") => {
                ::log::warn!("Lost WebDriver session while loading {}, reconnecting", url);
                match ClientBuilder::native().connect(&self.webdriver_url).await {
                    Ok(new_client) => {
                        *client = new_client;
                        scrape(client, url).await
                    }
                    Err(connect_error) => {
                        *guard = None;
                        return Err(browser_error(connect_error.to_string()));
                    }
                }
            }
            other => other,
        };
        source.map_err(|e| browser_error(e.to_string()))
    }
}

#[async_trait]
impl FetchStrategy for BrowserStrategy {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch_and_extract(&self, url: &Url) -> Result<RawContent> {
        let source = match timeout(BROWSER_TIMEOUT, self.page_source(url)).await {
            Ok(source) => source?,
            Err(_) => {
                ::log::error!("Timeout scraping: {}", url);
                return Err(ScrapeError::Browser {
                    url: url.to_string(),
                    message: format!("timed out after {}s", BROWSER_TIMEOUT.as_secs()),
                });
            }
        };

        let page = Page::new(url.clone(), source);
        let markdown = self.extractor.html_to_markdown(&page)?;
        Ok(RawContent { page, markdown })
    }

    async fn shutdown(&self) {
        if let Some(client) = self.client.lock().await.take() {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver client: {}", e);
            }
        }
    }
}

async fn scrape(client: &Client, url: &Url) -> std::result::Result<String, fantoccini::error::CmdError> {
    ::log::debug!("SCRAPE: {}", url);
    client.goto(url.as_str()).await?;
    client.source().await
}

/// Connects to the WebDriver instance, trying common local ports on failure
async fn connect_to_webdriver(webdriver_url: &str) -> Option<Client> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Some(client);
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4723", // Appium default
        "http://localhost:9222", // Chrome debug port default
        "http://127.0.0.1:4444",
    ];

    for url in fallback_urls.iter().filter(|u| **u != webdriver_url) {
        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Some(client);
        }
    }

    ::log::error!("Failed to connect to any WebDriver servers");
    ::log::error!("Make sure a WebDriver server is running or pass --webdriver-url");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, ScraperConfig};
    use crate::error::TransportError;
    use crate::fetcher::tests::MockTransport;

    const HTML: &str = "<!DOCTYPE html><html><body><main><h1>Setup</h1><p>Install it.</p></main></body></html>";
    const STREAM: &str = "1:HL[\"/_next/static.css\"]\nT1a2b,# Setup\nInstall it.\nc:null\n5:[[\"$\",\"div\"]]";

    fn extractor() -> Arc<Extractor> {
        let config = ScraperConfig {
            masthead_lines: 0,
            ..ScraperConfig::default()
        };
        Arc::new(Extractor::from_config(&config).unwrap())
    }

    fn fetcher(responses: Vec<std::result::Result<String, TransportError>>) -> (Fetcher, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(responses));
        let retry = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        (Fetcher::new(transport.clone(), retry), transport)
    }

    fn url() -> Url {
        Url::parse("https://example.com/org/lib/2-setup").unwrap()
    }

    #[tokio::test]
    async fn test_direct_markdown_cleans_stream() {
        let (fetcher, transport) = fetcher(vec![Ok(STREAM.to_string())]);
        let strategy = DirectMarkdownStrategy::new(fetcher, extractor());

        let content = strategy.fetch_and_extract(&url()).await.unwrap();
        assert_eq!(content.markdown, "# Setup\nInstall it.");

        let calls = transport.calls.lock().unwrap();
        assert!(calls[0].2.iter().any(|(name, value)| *name == "rsc" && value == "1"));
    }

    #[tokio::test]
    async fn test_direct_markdown_rejects_html() {
        let (fetcher, _) = fetcher(vec![Ok(HTML.to_string())]);
        let strategy = DirectMarkdownStrategy::new(fetcher, extractor());

        let err = strategy.fetch_and_extract(&url()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::UnexpectedPayload { .. }));
        assert!(err.allows_fallback());
    }

    #[tokio::test]
    async fn test_html_strategy_converts_main_content() {
        let (fetcher, _) = fetcher(vec![Ok(HTML.to_string())]);
        let strategy = HtmlStrategy::new(fetcher, extractor());

        let content = strategy.fetch_and_extract(&url()).await.unwrap();
        assert_eq!(content.markdown, "# Setup\n\nInstall it.");
        assert_eq!(content.page.body, HTML);
    }

    #[test]
    fn test_prefetched_pages() {
        let (fetcher, transport) = fetcher(Vec::new());
        let page = Page::new(url(), HTML.to_string());

        let html = HtmlStrategy::new(fetcher.clone(), extractor());
        let reused = html.extract_prefetched(&page).unwrap().unwrap();
        assert_eq!(reused.markdown, "# Setup\n\nInstall it.");

        let direct = DirectMarkdownStrategy::new(fetcher, extractor());
        assert!(direct.extract_prefetched(&page).is_none());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_html_strategy_never_cleans_as_stream() {
        let fragment = "<body><main><h1>Setup</h1><p>Install it.</p></main></body>";
        let (fetcher, _) = fetcher(vec![Ok(fragment.to_string()), Ok(fragment.to_string())]);

        let html = HtmlStrategy::new(fetcher.clone(), extractor());
        let content = html.fetch_and_extract(&url()).await.unwrap();
        assert_eq!(content.markdown, "# Setup\n\nInstall it.");

        let direct = DirectMarkdownStrategy::new(fetcher, extractor());
        let err = direct.fetch_and_extract(&url()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::UnexpectedPayload { .. }));
    }

    #[tokio::test]
    async fn test_html_strategy_reports_missing_content() {
        let (fetcher, _) = fetcher(vec![Ok("<html><body></body></html>".to_string())]);
        let strategy = HtmlStrategy::new(fetcher, extractor());

        let err = strategy.fetch_and_extract(&url()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::ContentNotFound { .. }));
    }
}
