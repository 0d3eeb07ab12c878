pub mod html;
pub mod links;
pub mod markdown;
pub mod text;
pub mod yaml;


use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::results::Page;
use html::ContentSelector;
use markdown::{MarkdownConverter, drop_leading_lines};
use scraper::{Html, Selector};
use text::ArtifactCleaner;

/// Shape of a fetched response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// An HTML document
    Html,
    /// A framework-serialized stream with an embedded Markdown payload
    ArtifactStream,
}

impl PayloadKind {
    /// Classify a body by its leading markup
    ///
    /// A BOM, whitespace and comments are skipped. A doctype or any start
    /// tag marks HTML, fragments included.
    pub fn detect(body: &str) -> Self {
        let mut rest = body.trim_start_matches('\u{feff}').trim_start();
        while let Some(comment) = rest.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => comment[end + 3..].trim_start(),
                None => "",
            };
        }

        let head: String = rest.chars().take(14).collect::<String>().to_ascii_lowercase();
        let starts_tag = rest
            .strip_prefix('<')
            .and_then(|tag| tag.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic());
        if head.starts_with("<!doctype html") || starts_tag {
            ::log::debug!("Classifying body as HTML");
            PayloadKind::Html
        } else {
            ::log::debug!("Classifying body as artifact stream");
            PayloadKind::ArtifactStream
        }
    }
}

/// Turns fetched pages into Markdown
#[derive(Debug)]
pub struct Extractor {
    selector: ContentSelector,
    converter: MarkdownConverter,
    cleaner: ArtifactCleaner,
    nav_selector: Selector,
    html_masthead_lines: usize,
}

impl Extractor {
    pub fn new(
        selector: ContentSelector,
        converter: MarkdownConverter,
        cleaner: ArtifactCleaner,
        nav_selector: Selector,
        html_masthead_lines: usize,
    ) -> Self {
        Self {
            selector,
            converter,
            cleaner,
            nav_selector,
            html_masthead_lines,
        }
    }

    /// Build an extractor from configuration
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let nav_selector = parse_selector(&config.nav_selector)?;
        Ok(Self::new(
            ContentSelector::new(&config.content_selectors)?,
            MarkdownConverter::new(nav_selector.clone()),
            ArtifactCleaner::new(config.masthead_lines),
            nav_selector,
            config.html_masthead_lines,
        ))
    }

    pub fn nav_selector(&self) -> &Selector {
        &self.nav_selector
    }

    /// Select the main content of an HTML page and convert it
    pub fn html_to_markdown(&self, page: &Page) -> Result<String> {
        let doc = Html::parse_document(&page.body);
        let Some(node) = self.selector.select(&doc) else {
            ::log::warn!("Main content element not found for {}", page.url);
            return Err(ScrapeError::ContentNotFound {
                url: page.url.to_string(),
            });
        };
        let markdown = self.converter.to_markdown(Some(node));
        Ok(drop_leading_lines(&markdown, self.html_masthead_lines))
    }

    /// Clean an artifact stream into Markdown
    pub fn artifact_to_markdown(&self, page: &Page) -> String {
        self.cleaner.clean(&page.body)
    }

    /// Extract Markdown from a page of either shape
    pub fn extract(&self, page: &Page) -> Result<String> {
        match PayloadKind::detect(&page.body) {
            PayloadKind::Html => self.html_to_markdown(page),
            PayloadKind::ArtifactStream => Ok(self.artifact_to_markdown(page)),
        }
    }
}

pub fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| ScrapeError::Config(format!("invalid selector '{raw}': {e}")))
}
