use clap::Parser;
use std::error::Error;
use wiki_page::Scraper;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Library URL to scrape
    #[arg(short, long)]
    url: String,

    /// Folder name for the library
    #[arg(short, long)]
    name: Option<String>,

    /// JSON configuration string
    #[arg(short, long)]
    config: Option<String>,

    /// Path to JSON configuration file
    #[arg(long)]
    config_file: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    println!("Starting scraper for URL: {}", args.url);

    let mut scraper = Scraper::new();

    if let Some(config_file) = args.config_file {
        println!("Loading configuration from file: {}", config_file);
        scraper = scraper.with_config_file(config_file)?;
    }

    // A configuration string replaces the file configuration
    if let Some(config_str) = args.config {
        println!("Applying configuration from string");
        scraper = scraper.with_config_str(&config_str)?;
    }

    if let Some(output) = args.output {
        println!("Writing to: {}", output);
        scraper = scraper.with_output_dir(&output);
    }

    let start_time = std::time::Instant::now();
    let summary = scraper
        .with_library(args.name.as_deref(), &args.url)
        .run()
        .await?;

    for library in &summary.libraries {
        println!("{}: {} files", library.name, library.files.len());
        for file in &library.files {
            println!("  {}", file.display());
        }
    }
    println!(
        "Scraping complete. {} pages in {:.2} seconds.",
        summary.pages_succeeded(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
