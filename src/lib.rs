pub mod config;
pub mod crawlers;
pub mod error;
pub mod fetcher;
pub mod output;
pub mod parsers;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{OutputFormat, ScraperConfig, StrategyKind};
pub use crawlers::library::{LibraryCrawler, LibraryTarget};
pub use error::{Result, ScrapeError};
pub use results::{BatchSummary, LibraryOutcome, LibraryStatus};

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Builder for a scrape over one or more libraries
pub struct Scraper {
    config: ScraperConfig,
    targets: Vec<LibraryTarget>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Scraper {
    /// Create a scraper with default configuration
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
            targets: Vec::new(),
            cancelled: None,
        }
    }

    /// Add a library; its folder name is derived from the URL when `name` is `None`
    pub fn with_library(mut self, name: Option<&str>, url: &str) -> Self {
        self.targets
            .push(LibraryTarget::new(name.map(str::to_string), url));
        self
    }

    pub fn with_libraries(mut self, targets: impl IntoIterator<Item = LibraryTarget>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.config.output_dir = dir.to_string();
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.config.strategies = strategies;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = ScraperConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = ScraperConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Share a flag that stops the scrape at the next page boundary
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrape every library in order and summarize the batch
    pub async fn run(self) -> Result<BatchSummary> {
        let mut crawler = LibraryCrawler::new(self.config)?;
        if let Some(flag) = self.cancelled {
            crawler.set_cancellation_flag(flag);
        }
        Ok(crawler.run(&self.targets).await)
    }
}

impl Default for Scraper {
    fn default() -> Self {
        Self::new()
    }
}
