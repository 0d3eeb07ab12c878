use crate::config::{ScraperConfig, StrategyKind};
use crate::crawlers::web::{BrowserStrategy, DirectMarkdownStrategy, HtmlStrategy};
use crate::error::{Result, ScrapeError};
use crate::fetcher::Fetcher;
use crate::parsers::Extractor;
use crate::results::{Page, RawContent};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// One way of turning a page URL into Markdown
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the page and extract its Markdown
    async fn fetch_and_extract(&self, url: &Url) -> Result<RawContent>;

    /// Extract from a page that was already fetched, if this strategy can
    ///
    /// `None` means the strategy needs its own request.
    fn extract_prefetched(&self, _page: &Page) -> Option<Result<RawContent>> {
        None
    }

    /// Release held resources such as browser sessions
    async fn shutdown(&self) {}
}

/// Ordered fallback chain of fetch strategies
pub struct StrategyChain {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the configured chain, primary strategy first
    pub fn from_config(
        config: &ScraperConfig,
        fetcher: Fetcher,
        extractor: Arc<Extractor>,
    ) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|kind| -> Box<dyn FetchStrategy> {
                match kind {
                    StrategyKind::DirectMarkdown => Box::new(DirectMarkdownStrategy::new(
                        fetcher.clone(),
                        Arc::clone(&extractor),
                    )),
                    StrategyKind::Html => {
                        Box::new(HtmlStrategy::new(fetcher.clone(), Arc::clone(&extractor)))
                    }
                    StrategyKind::Browser => Box::new(BrowserStrategy::new(
                        &config.webdriver_url,
                        Arc::clone(&extractor),
                    )),
                }
            })
            .collect();
        Self::new(strategies)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the chain for one URL
    ///
    /// The next strategy is tried only when the previous one failed with an
    /// error that allows fallback. `ContentNotFound` ends the chain.
    pub async fn fetch(&self, url: &Url, prefetched: Option<&Page>) -> Result<RawContent> {
        let mut last_error = None;

        for strategy in &self.strategies {
            ::log::debug!("Trying strategy '{}' for {}", strategy.name(), url);

            let reused = prefetched.and_then(|page| strategy.extract_prefetched(page));
            let result = match reused {
                Some(result) => result,
                None => strategy.fetch_and_extract(url).await,
            };

            match result {
                Ok(content) => {
                    ::log::info!("Extracted {} with strategy '{}'", url, strategy.name());
                    return Ok(content);
                }
                Err(e) if !e.allows_fallback() => {
                    ::log::error!("Strategy '{}' stopped on {}: {}", strategy.name(), url, e);
                    return Err(e);
                }
                Err(e) => {
                    ::log::warn!(
                        "Strategy '{}' failed for {}: {}; falling back",
                        strategy.name(),
                        url,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ScrapeError::Config("at least one fetch strategy is required".to_string())
        }))
    }

    pub async fn shutdown(&self) {
        for strategy in &self.strategies {
            strategy.shutdown().await;
        }
    }
}
