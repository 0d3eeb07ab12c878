use crate::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Output formats that can be written next to the Markdown files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw page body under `<folder>/html`
    Html,
    /// Markdown under `<folder>/md` (always written)
    Md,
    /// YAML documents under `<folder>/yaml`
    Yaml,
}

/// Fetch strategies, tried in the configured order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Artifact stream endpoint, cleaned into Markdown
    DirectMarkdown,
    /// Plain HTML fetch, content selection and conversion
    Html,
    /// Page source from a WebDriver session, then selection and conversion
    Browser,
}

/// Retry and backoff settings for the fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds, doubled on every retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Timeout of a single GET
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Configuration for the library scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Root directory for all written files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Extra output formats
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,

    /// Strategy chain, primary first
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Pause before each navigation item fetch
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,

    /// Probe TCP reachability of the landing host before fetching
    #[serde(default)]
    pub probe_reachability: bool,

    /// Timeout of one probe connection
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Stop processing navigation items after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_timeout_secs: Option<u64>,

    /// CSS selector of the navigation list
    #[serde(default = "default_nav_selector")]
    pub nav_selector: String,

    /// Main content selectors, most specific first
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Leading lines dropped from cleaned artifact streams
    #[serde(default = "default_masthead_lines")]
    pub masthead_lines: usize,

    /// Leading lines dropped from converted HTML pages
    #[serde(default)]
    pub html_masthead_lines: usize,

    /// Write one file per top-level heading
    #[serde(default)]
    pub split_by_heading: bool,

    /// URL for the WebDriver instance used by the browser strategy
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Default value for max_retries
fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_jitter_ms() -> u64 {
    200
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_output_dir() -> String {
    "Documents".to_string()
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Md]
}

/// Direct Markdown first, HTML conversion as fallback
fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::DirectMarkdown, StrategyKind::Html]
}

fn default_politeness_delay_ms() -> u64 {
    1000
}

fn default_probe_timeout_secs() -> u64 {
    3
}

/// Navigation sidebar of the wiki layout
fn default_nav_selector() -> String {
    "ul.flex-1.flex-shrink-0.space-y-1.overflow-y-auto.py-1".to_string()
}

fn default_content_selectors() -> Vec<String> {
    [
        "main article",
        "main .content",
        "main",
        "article",
        ".content",
        ".article-content",
        "#content",
        ".markdown-body",
        ".documentation-content",
        "div.container div.row div.col",
        "div[role=\"main\"]",
        ".prose",
        ".page-content",
        "#__next",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Masthead rendered above every page of the wiki
fn default_masthead_lines() -> usize {
    28
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: default_jitter_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn jitter_bound(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            formats: default_formats(),
            strategies: default_strategies(),
            retry: RetryConfig::default(),
            politeness_delay_ms: default_politeness_delay_ms(),
            probe_reachability: false,
            probe_timeout_secs: default_probe_timeout_secs(),
            library_timeout_secs: None,
            nav_selector: default_nav_selector(),
            content_selectors: default_content_selectors(),
            masthead_lines: default_masthead_lines(),
            html_masthead_lines: 0,
            split_by_heading: false,
            webdriver_url: default_webdriver_url(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ScrapeError::io(path, e))?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ScrapeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the crawler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(ScrapeError::Config(
                "at least one fetch strategy is required".to_string(),
            ));
        }
        if self.content_selectors.is_empty() {
            return Err(ScrapeError::Config(
                "content_selectors must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wants(&self, format: OutputFormat) -> bool {
        format == OutputFormat::Md || self.formats.contains(&format)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn library_timeout(&self) -> Option<Duration> {
        self.library_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ScraperConfig::from_json("{}").unwrap();
        assert_eq!(config.output_dir, "Documents");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.jitter_ms, 200);
        assert_eq!(config.masthead_lines, 28);
        assert_eq!(
            config.strategies,
            vec![StrategyKind::DirectMarkdown, StrategyKind::Html]
        );
        assert_eq!(config.content_selectors[0], "main article");
        assert!(config.wants(OutputFormat::Md));
        assert!(!config.wants(OutputFormat::Yaml));
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "formats": ["md", "yaml"],
            "strategies": ["html", "browser"],
            "retry": { "max_retries": 0 },
            "politeness_delay_ms": 0,
            "library_timeout_secs": 60
        }"#;
        let config = ScraperConfig::from_json(json).unwrap();
        assert!(config.wants(OutputFormat::Yaml));
        assert_eq!(
            config.strategies,
            vec![StrategyKind::Html, StrategyKind::Browser]
        );
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.politeness_delay(), Duration::ZERO);
        assert_eq!(config.library_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_empty_strategy_chain_is_rejected() {
        let err = ScraperConfig::from_json(r#"{"strategies": []}"#).unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = ScraperConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
