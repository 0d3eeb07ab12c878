use crate::config::{OutputFormat, ScraperConfig};
use crate::crawlers::crawler::StrategyChain;
use crate::error::{Result, ScrapeError};
use crate::fetcher::{self, Fetcher};
use crate::output::{OutputWriter, SaveOutcome};
use crate::parsers::Extractor;
use crate::parsers::html::extract_navigation_items;
use crate::parsers::links::normalize_directory;
use crate::results::{
    BatchSummary, LibraryOutcome, LibraryStatus, MarkdownDocument, NavigationItem, Page,
};
use crate::utils::{file_stem, library_folder, library_name_from_url};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;
use url::Url;

/// A library to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTarget {
    /// Folder name; derived from the URL when absent
    pub name: Option<String>,
    pub url: String,
}

impl LibraryTarget {
    pub fn new(name: Option<String>, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
        }
    }
}

/// Steps of one library crawl
#[derive(Debug)]
enum CrawlState {
    Start,
    FetchMain,
    ExtractNav(Page),
    ProcessSingle(Page),
    ProcessEach(Page, Vec<NavigationItem>),
    NormalizeLinks,
    Done,
    Failed(String),
}

/// Crawls documentation libraries one page at a time
pub struct LibraryCrawler {
    config: ScraperConfig,
    fetcher: Fetcher,
    extractor: Arc<Extractor>,
    chain: StrategyChain,
    cancelled: Arc<AtomicBool>,
}

impl LibraryCrawler {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config.retry)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Build a crawler around an existing fetcher
    pub fn with_fetcher(config: ScraperConfig, fetcher: Fetcher) -> Result<Self> {
        config.validate()?;
        let extractor = Arc::new(Extractor::from_config(&config)?);
        let chain = StrategyChain::from_config(&config, fetcher.clone(), Arc::clone(&extractor));
        Ok(Self {
            config,
            fetcher,
            extractor,
            chain,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the crawl before the next page when set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn set_cancellation_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancelled = flag;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Crawl every target in order
    ///
    /// A failed library never stops the batch.
    pub async fn run(&self, targets: &[LibraryTarget]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (index, target) in targets.iter().enumerate() {
            if self.is_cancelled() {
                ::log::warn!("Cancelled; skipping {} remaining libraries", targets.len() - index);
                break;
            }
            ::log::info!(
                "Processing library {}/{}: {}",
                index + 1,
                targets.len(),
                target.url
            );
            summary.libraries.push(self.crawl(target).await);
        }
        self.chain.shutdown().await;
        summary
    }

    /// Crawl one library and report what happened
    pub async fn crawl(&self, target: &LibraryTarget) -> LibraryOutcome {
        let url = match Url::parse(&target.url) {
            Ok(url) => url,
            Err(source) => {
                let err = ScrapeError::InvalidUrl {
                    url: target.url.clone(),
                    source,
                };
                ::log::error!("{}", err);
                let name = target.name.clone().unwrap_or_else(|| target.url.clone());
                return LibraryOutcome::failed(&name, &target.url, err.to_string());
            }
        };

        let name = target
            .name
            .clone()
            .unwrap_or_else(|| library_name_from_url(&url));
        let folder = library_folder(target.name.as_deref(), &url);

        let mut outcome = LibraryOutcome::new(&name, &target.url);
        let mut writer = OutputWriter::new(
            PathBuf::from(&self.config.output_dir).join(&folder),
            &self.config,
        );
        let deadline = self.config.library_timeout().map(|t| Instant::now() + t);

        let mut state = CrawlState::Start;
        loop {
            state = match state {
                CrawlState::Start => {
                    if self.config.probe_reachability {
                        match fetcher::probe(&url, self.config.probe_timeout()).await {
                            Ok(()) => CrawlState::FetchMain,
                            Err(e) => CrawlState::Failed(e.to_string()),
                        }
                    } else {
                        CrawlState::FetchMain
                    }
                }
                CrawlState::FetchMain => match self.fetcher.fetch(&url).await {
                    Ok(page) => CrawlState::ExtractNav(page),
                    Err(e) => CrawlState::Failed(e.to_string()),
                },
                CrawlState::ExtractNav(page) => {
                    let items = extract_navigation_items(
                        &page.body,
                        &page.url,
                        self.extractor.nav_selector(),
                    );
                    if items.is_empty() {
                        ::log::info!("No navigation items found; processing {} as a single page", url);
                        CrawlState::ProcessSingle(page)
                    } else {
                        CrawlState::ProcessEach(page, items)
                    }
                }
                CrawlState::ProcessSingle(page) => {
                    self.process_page(&page.url, None, Some(&page), &mut writer, &mut outcome)
                        .await;
                    CrawlState::NormalizeLinks
                }
                CrawlState::ProcessEach(page, items) => {
                    self.process_page(&page.url, None, Some(&page), &mut writer, &mut outcome)
                        .await;
                    for (index, item) in items.iter().enumerate() {
                        if self.is_cancelled() {
                            ::log::warn!("Cancelled; skipping {} navigation items", items.len() - index);
                            outcome.pages_skipped += items.len() - index;
                            break;
                        }
                        if deadline.is_some_and(|d| Instant::now() >= d) {
                            ::log::warn!(
                                "Time limit for {} reached; skipping {} navigation items",
                                name,
                                items.len() - index
                            );
                            outcome.pages_skipped += items.len() - index;
                            break;
                        }

                        ::log::info!("Processing {}/{}: {}", index + 1, items.len(), item.title);
                        tokio::time::sleep(self.config.politeness_delay()).await;
                        self.process_page(
                            &item.url,
                            Some(&item.title),
                            None,
                            &mut writer,
                            &mut outcome,
                        )
                        .await;
                    }
                    CrawlState::NormalizeLinks
                }
                CrawlState::NormalizeLinks => {
                    match normalize_directory(&writer.md_dir()) {
                        Ok(changed) => outcome.links_fixed = changed,
                        Err(e) => ::log::error!("Link normalization failed: {}", e),
                    }
                    if self.config.wants(OutputFormat::Yaml) {
                        if let Err(e) = writer.write_yaml() {
                            ::log::error!("YAML conversion failed: {}", e);
                        }
                    }
                    CrawlState::Done
                }
                CrawlState::Done => {
                    if outcome.pages_succeeded == 0 {
                        outcome.status =
                            LibraryStatus::Failed("no page could be extracted".to_string());
                    }
                    break;
                }
                CrawlState::Failed(reason) => {
                    ::log::error!("Library {} failed: {}", name, reason);
                    outcome.status = LibraryStatus::Failed(reason);
                    break;
                }
            };
        }

        ::log::info!(
            "Finished {}: {} pages saved, {} failed, {} skipped, {} links fixed",
            name,
            outcome.pages_succeeded,
            outcome.pages_failed,
            outcome.pages_skipped,
            outcome.links_fixed
        );
        outcome
    }

    /// Run the strategy chain for one page and save the result
    ///
    /// Files are named after `title`, or after the page's first heading when
    /// no navigation title is known.
    async fn process_page(
        &self,
        url: &Url,
        title: Option<&str>,
        prefetched: Option<&Page>,
        writer: &mut OutputWriter,
        outcome: &mut LibraryOutcome,
    ) {
        let content = match self.chain.fetch(url, prefetched).await {
            Ok(content) => content,
            Err(e) => {
                ::log::error!("Skipping {}: {}", url, e);
                outcome.pages_failed += 1;
                return;
            }
        };

        let url_stem = file_stem(url);
        let doc = MarkdownDocument::new(content.markdown, url.clone(), &url_stem);
        let stem = writer.stem_for(title.unwrap_or(&doc.title), &url_stem);
        match writer.save(&doc, &stem, &content.page) {
            Ok(SaveOutcome::Written(files)) => {
                outcome.pages_succeeded += 1;
                outcome.files.extend(files);
            }
            Ok(SaveOutcome::Duplicate) => outcome.pages_skipped += 1,
            Err(e) => {
                ::log::error!("Failed to save {}: {}", url, e);
                outcome.pages_failed += 1;
            }
        }
    }
}
