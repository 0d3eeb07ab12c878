use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use wiki_page::{Scraper, ScraperConfig, StrategyKind};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let targets = args.targets();
    if targets.is_empty() {
        eprintln!("No library given. Pass a URL or one or more `-l NAME URL` pairs.");
        std::process::exit(2);
    }

    let mut config = match &args.config {
        Some(path) => match ScraperConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => ScraperConfig::default(),
    };
    args.apply(&mut config);

    if config.strategies.contains(&StrategyKind::Browser) {
        println!("Note: the browser strategy requires a WebDriver server (e.g., ChromeDriver).");
        println!("Pass --webdriver-url if not using {}", config.webdriver_url);
    }

    // Stop after the current page on Ctrl-C
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::warn!("Interrupted; finishing the current page");
            flag.store(true, Ordering::Relaxed);
        }
    });

    ::log::info!(
        "Scraping {} libraries into {}",
        targets.len(),
        config.output_dir
    );
    let start_time = std::time::Instant::now();

    let summary = match Scraper::new()
        .with_config(config)
        .with_libraries(targets)
        .with_cancellation(cancelled)
        .run()
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            ::log::error!("Failed to start scraper: {}", e);
            std::process::exit(1);
        }
    };

    ::log::info!(
        "Scraping complete in {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );
    if let Err(e) = summary.write_to(&mut std::io::stderr()) {
        ::log::error!("Failed to print summary: {}", e);
    }
    std::process::exit(summary.exit_code());
}
