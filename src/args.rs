use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use wiki_page::{LibraryTarget, OutputFormat, ScraperConfig, StrategyKind};

#[derive(Parser, Debug)]
#[command(name = "wiki-page")]
#[command(about = "Scrapes wiki documentation libraries into Markdown")]
#[command(version)]
pub struct Args {
    /// Library URL to scrape; its folder name is derived from the path
    pub url: Option<String>,

    /// Library as NAME URL (repeatable)
    #[arg(short = 'l', long = "library", num_args = 2, value_names = ["NAME", "URL"], action = ArgAction::Append)]
    pub libraries: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output formats, comma separated (md is always written)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub formats: Vec<FormatArg>,

    /// Fetch strategies in fallback order, comma separated
    #[arg(long, value_enum, value_delimiter = ',')]
    pub strategy: Vec<StrategyArg>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Retries after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base backoff delay in seconds
    #[arg(long)]
    pub base_delay: Option<f64>,

    /// Pause between navigation pages in seconds
    #[arg(long)]
    pub delay: Option<f64>,

    /// WebDriver URL for the browser strategy
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Write one file per top-level heading
    #[arg(long)]
    pub split_headings: bool,

    /// Check that the host accepts TCP connections before fetching
    #[arg(long)]
    pub probe: bool,

    /// Per-library time limit in seconds
    #[arg(long)]
    pub library_timeout: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Md,
    Html,
    Yaml,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    DirectMarkdown,
    Html,
    Browser,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Md => OutputFormat::Md,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::DirectMarkdown => StrategyKind::DirectMarkdown,
            StrategyArg::Html => StrategyKind::Html,
            StrategyArg::Browser => StrategyKind::Browser,
        }
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

impl Args {
    /// Libraries named on the command line, positional URL first
    pub fn targets(&self) -> Vec<LibraryTarget> {
        let mut targets = Vec::new();
        if let Some(url) = &self.url {
            targets.push(LibraryTarget::new(None, url.clone()));
        }
        for pair in self.libraries.chunks_exact(2) {
            targets.push(LibraryTarget::new(Some(pair[0].clone()), pair[1].clone()));
        }
        targets
    }

    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut ScraperConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if !self.formats.is_empty() {
            config.formats = self.formats.iter().map(|f| (*f).into()).collect();
        }
        if !self.strategy.is_empty() {
            config.strategies = self.strategy.iter().map(|s| (*s).into()).collect();
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(base_delay) = self.base_delay {
            config.retry.base_delay_ms = secs_to_ms(base_delay);
        }
        if let Some(delay) = self.delay {
            config.politeness_delay_ms = secs_to_ms(delay);
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
        if self.split_headings {
            config.split_by_heading = true;
        }
        if self.probe {
            config.probe_reachability = true;
        }
        if let Some(timeout) = self.library_timeout {
            config.library_timeout_secs = Some(timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_url_and_libraries() {
        let args = Args::try_parse_from([
            "wiki-page",
            "https://example.com/org/one",
            "-l",
            "two",
            "https://example.com/org/two",
            "--library",
            "three",
            "https://example.com/org/three",
        ])
        .unwrap();

        let targets = args.targets();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0], LibraryTarget::new(None, "https://example.com/org/one"));
        assert_eq!(
            targets[2],
            LibraryTarget::new(Some("three".to_string()), "https://example.com/org/three")
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "wiki-page",
            "https://example.com/org/lib",
            "-o",
            "out",
            "-f",
            "md,yaml",
            "--strategy",
            "html,browser",
            "--max-retries",
            "1",
            "--base-delay",
            "0.5",
            "--delay",
            "0",
            "--split-headings",
            "--library-timeout",
            "90",
        ])
        .unwrap();

        let mut config = ScraperConfig::default();
        args.apply(&mut config);
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.formats, vec![OutputFormat::Md, OutputFormat::Yaml]);
        assert_eq!(config.strategies, vec![StrategyKind::Html, StrategyKind::Browser]);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.politeness_delay_ms, 0);
        assert!(config.split_by_heading);
        assert!(!config.probe_reachability);
        assert_eq!(config.library_timeout_secs, Some(90));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["wiki-page"]).unwrap();
        assert!(args.targets().is_empty());

        let mut config = ScraperConfig::default();
        args.apply(&mut config);
        assert_eq!(config.strategies, ScraperConfig::default().strategies);
        assert_eq!(config.politeness_delay_ms, 1000);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Args::try_parse_from(["wiki-page", "--strategy", "carrier-pigeon"]).is_err());
    }
}
