use httpmock::{Method::GET, MockServer};
use regex::Regex;
use std::fs;
use std::path::Path;
use wiki_page::parsers::links::markdown_files;
use wiki_page::{OutputFormat, Scraper, ScraperConfig, StrategyKind};

fn landing() -> String {
    r#"<!DOCTYPE html><html><head><title>lib</title></head><body>
        <nav>
            <ul class="flex-1 flex-shrink-0 space-y-1 overflow-y-auto py-1">
                <li><a href="/org/lib/1-overview">Overview</a></li>
                <li><a href="/org/lib/2-setup">Setup</a></li>
            </ul>
        </nav>
        <main>
            <h1>lib</h1>
            <p>Hosted on <a href="https://github.com/org/lib">GitHub</a>.</p>
            <p>Start with the <a href="/org/lib/1-overview">overview</a>.</p>
        </main>
    </body></html>"#
        .to_string()
}

fn content_page(title: &str, external: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><body><main>
            <h1>{title}</h1>
            <p>Read <a href="{external}">the reference</a>.</p>
            <pre><code>cargo add lib</code></pre>
        </main></body></html>"#
    )
}

fn config(output: &Path, strategies: Vec<StrategyKind>) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.output_dir = output.to_string_lossy().into_owned();
    config.strategies = strategies;
    config.politeness_delay_ms = 0;
    config.retry.max_retries = 0;
    config
}

fn assert_no_external_links(dir: &Path) {
    let external = Regex::new(r"\]\(\s*https?://").unwrap();
    for file in markdown_files(dir).unwrap() {
        let content = fs::read_to_string(&file).unwrap();
        assert!(
            !external.is_match(&content),
            "external link left in {}",
            file.display()
        );
    }
}

#[tokio::test]
async fn test_crawl_library_with_navigation() {
    let server = MockServer::start_async().await;
    let landing_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib");
            then.status(200).body(landing());
        })
        .await;
    let overview_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib/1-overview");
            then.status(200)
                .body(content_page("Overview", "https://docs.rs/lib"));
        })
        .await;
    let setup_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib/2-setup");
            then.status(200)
                .body(content_page("Setup", "http://example.org/install"));
        })
        .await;

    let output = tempfile::tempdir().unwrap();
    let summary = Scraper::new()
        .with_config(config(output.path(), vec![StrategyKind::Html]))
        .with_library(Some("lib"), &server.url("/org/lib"))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.pages_succeeded(), 3);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(landing_mock.hits_async().await, 1);
    assert_eq!(overview_mock.hits_async().await, 1);
    assert_eq!(setup_mock.hits_async().await, 1);

    let md_dir = output.path().join("lib").join("md");
    assert_eq!(markdown_files(&md_dir).unwrap().len(), 3);
    assert_no_external_links(&md_dir);

    let landing_md = fs::read_to_string(md_dir.join("lib.md")).unwrap();
    assert!(landing_md.starts_with("# lib"));
    assert!(landing_md.contains("[GitHub]()"));
    assert!(landing_md.contains("[overview](/org/lib/1-overview)"));
    assert!(!landing_md.contains("Setup"));

    assert!(md_dir.join("Overview.md").exists());
    let setup_md = fs::read_to_string(md_dir.join("Setup.md")).unwrap();
    assert!(setup_md.starts_with("# Setup"));
    assert!(setup_md.contains("```\ncargo add lib\n```"));
}

#[tokio::test]
async fn test_failed_library_does_not_stop_batch() {
    let server = MockServer::start_async().await;
    let broken = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/broken");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/org/works");
            then.status(200).body(content_page("Works", "https://x.com"));
        })
        .await;

    let output = tempfile::tempdir().unwrap();
    let summary = Scraper::new()
        .with_config(config(output.path(), vec![StrategyKind::Html]))
        .with_library(Some("broken"), &server.url("/org/broken"))
        .with_library(Some("works"), &server.url("/org/works"))
        .run()
        .await
        .unwrap();

    assert_eq!(broken.hits_async().await, 1);
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.exit_code(), 0);
    assert!(!summary.libraries[0].is_success());
    assert!(output.path().join("works/md/Works.md").exists());
}

#[tokio::test]
async fn test_direct_markdown_falls_back_to_html() {
    let server = MockServer::start_async().await;
    let landing_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib");
            then.status(200).body(landing());
        })
        .await;
    let overview_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib/1-overview");
            then.status(200).body(content_page("Overview", "https://docs.rs"));
        })
        .await;
    let setup_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/lib/2-setup");
            then.status(200).body(content_page("Setup", "https://docs.rs"));
        })
        .await;

    let output = tempfile::tempdir().unwrap();
    let summary = Scraper::new()
        .with_config(config(
            output.path(),
            vec![StrategyKind::DirectMarkdown, StrategyKind::Html],
        ))
        .with_library(Some("lib"), &server.url("/org/lib"))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_succeeded(), 3);
    // Landing: document fetch plus the stream request; the HTML fallback reuses the document
    assert_eq!(landing_mock.hits_async().await, 2);
    // Items: stream request, then the HTML fetch
    assert_eq!(overview_mock.hits_async().await, 2);
    assert_eq!(setup_mock.hits_async().await, 2);
}

#[tokio::test]
async fn test_artifact_stream_library_with_yaml() {
    let stream = "0:[\"$\",\"html\"]\nT3f1,# Streamed Guide\nSee [docs](https://docs.rs/x) and [next](2-next).\nc:null\n7:[[\"$\",\"div\"]]";
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/org/streamed");
            then.status(200).body(stream);
        })
        .await;

    let output = tempfile::tempdir().unwrap();
    let mut config = config(output.path(), vec![StrategyKind::DirectMarkdown]);
    config.masthead_lines = 0;
    config.formats = vec![OutputFormat::Md, OutputFormat::Yaml];

    let summary = Scraper::new()
        .with_config(config)
        .with_library(None, &server.url("/org/streamed"))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(mock.hits_async().await, 1);

    let folder = output.path().join("streamed");
    let md = fs::read_to_string(folder.join("md/Streamed_Guide.md")).unwrap();
    assert_eq!(md, "# Streamed Guide\nSee [docs]() and [next](2-next).");

    let yaml = fs::read_to_string(folder.join("yaml/Streamed_Guide.yaml")).unwrap();
    assert!(yaml.contains("title: Streamed Guide"));
    assert!(!yaml.contains("https://docs.rs"));
}
