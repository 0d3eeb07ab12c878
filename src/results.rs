use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::PathBuf;
use url::Url;

/// A fetched response body
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the body was fetched from
    pub url: Url,

    /// HTML or artifact stream, exactly as received
    pub body: String,

    pub fetched_at: DateTime<Utc>,
}

impl Page {
    pub fn new(url: Url, body: String) -> Self {
        Self {
            url,
            body,
            fetched_at: Utc::now(),
        }
    }
}

/// One entry of the navigation list of a landing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationItem {
    pub title: String,

    /// Absolute URL, joined against the page it was found on
    pub url: Url,
}

/// Markdown extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    /// First heading of the body, else the file stem
    pub title: String,
    pub body: String,
    pub source_url: Url,
}

impl MarkdownDocument {
    /// Build a document, deriving the title from the first heading
    pub fn new(body: String, source_url: Url, fallback_title: &str) -> Self {
        let title = body
            .lines()
            .map(str::trim_start)
            .find_map(|line| {
                let text = line.trim_start_matches('#');
                (text.len() < line.len() && text.starts_with(' '))
                    .then(|| text.trim().to_string())
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title.to_string());

        Self {
            title,
            body,
            source_url,
        }
    }
}

/// What a fetch strategy hands back to the crawler
#[derive(Debug, Clone)]
pub struct RawContent {
    pub page: Page,
    pub markdown: String,
}

/// Terminal state of one library crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryStatus {
    Succeeded,
    Failed(String),
}

/// Result of crawling one library
#[derive(Debug, Clone)]
pub struct LibraryOutcome {
    pub name: String,
    pub url: String,
    pub status: LibraryStatus,

    /// Markdown files written for this library
    pub files: Vec<PathBuf>,
    pub pages_succeeded: usize,
    pub pages_failed: usize,

    /// Duplicates of the previous page, and items left by a deadline or cancellation
    pub pages_skipped: usize,
    pub links_fixed: usize,
}

impl LibraryOutcome {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            status: LibraryStatus::Succeeded,
            files: Vec::new(),
            pages_succeeded: 0,
            pages_failed: 0,
            pages_skipped: 0,
            links_fixed: 0,
        }
    }

    pub fn failed(name: &str, url: &str, reason: impl Into<String>) -> Self {
        Self {
            status: LibraryStatus::Failed(reason.into()),
            ..Self::new(name, url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LibraryStatus::Succeeded
    }
}

/// Summary over a batch of libraries
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub libraries: Vec<LibraryOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.libraries.iter().filter(|l| l.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.libraries.len() - self.succeeded()
    }

    pub fn pages_succeeded(&self) -> usize {
        self.libraries.iter().map(|l| l.pages_succeeded).sum()
    }

    pub fn pages_failed(&self) -> usize {
        self.libraries.iter().map(|l| l.pages_failed).sum()
    }

    /// Process exit code: 0 on at least partial success
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() > 0 { 0 } else { 1 }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n=== Scrape Summary ===")?;
        for library in &self.libraries {
            match &library.status {
                LibraryStatus::Succeeded => writeln!(
                    out,
                    "[ok]     {} ({} pages, {} failed, {} links fixed)",
                    library.name, library.pages_succeeded, library.pages_failed, library.links_fixed
                )?,
                LibraryStatus::Failed(reason) => {
                    writeln!(out, "[failed] {}: {}", library.name, reason)?
                }
            }
        }
        writeln!(
            out,
            "Libraries: {} succeeded, {} failed",
            self.succeeded(),
            self.failed()
        )?;
        writeln!(
            out,
            "Pages: {} succeeded, {} failed",
            self.pages_succeeded(),
            self.pages_failed()
        )?;
        writeln!(out, "======================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/org/lib/1-overview").unwrap()
    }

    #[test]
    fn test_title_from_first_heading() {
        let doc = MarkdownDocument::new("intro\n## Setup Guide\n# Later".into(), url(), "stem");
        assert_eq!(doc.title, "Setup Guide");
    }

    #[test]
    fn test_title_falls_back_to_stem() {
        let doc = MarkdownDocument::new("no heading\n#hashtag".into(), url(), "1-overview");
        assert_eq!(doc.title, "1-overview");
    }

    #[test]
    fn test_summary_counts_and_exit_code() {
        let mut ok = LibraryOutcome::new("a", "https://example.com/a");
        ok.pages_succeeded = 3;
        ok.pages_failed = 1;
        let failed = LibraryOutcome::failed("b", "https://example.com/b", "landing fetch failed");

        let summary = BatchSummary {
            libraries: vec![ok, failed],
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.pages_succeeded(), 3);
        assert_eq!(summary.pages_failed(), 1);
        assert_eq!(summary.exit_code(), 0);

        let mut out = Vec::new();
        summary.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[failed] b: landing fetch failed"));
        assert!(text.contains("Libraries: 1 succeeded, 1 failed"));
    }

    #[test]
    fn test_all_failed_is_nonzero_exit() {
        let summary = BatchSummary {
            libraries: vec![LibraryOutcome::failed("a", "u", "x")],
        };
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(BatchSummary::default().exit_code(), 1);
    }
}
