//! CLI entry point for the catalog mirror tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_mirror::{
    CatalogCrawler, DownloadEngine, HttpClient, RetryPolicy, SizePolicy, build_client,
    load_records, write_html,
};
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::LoadedConfig;
use cli::{Cli, Command, CrawlArgs, DownloadArgs, RenderArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    let loaded = app_config::load_default_file_config()?;
    if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
        debug!(path = %path.display(), "loaded config file");
    }

    match &cli.command {
        Command::Crawl(args) => run_crawl(args, &loaded).await,
        Command::Download(args) => run_download(args, &loaded).await,
        Command::Render(args) => run_render(args, &loaded).await,
    }
}

async fn run_crawl(args: &CrawlArgs, loaded: &LoadedConfig) -> Result<()> {
    let settings = app_config::crawl_settings(args, loaded);
    let client = build_client(&settings.client).context("Failed to build HTTP client")?;
    let crawler = CatalogCrawler::new(client, settings.page_size);

    let count = crawler
        .crawl_to_file(&settings.endpoint, &settings.output)
        .await
        .with_context(|| format!("Crawl of {} failed", settings.endpoint))?;

    info!(records = count, output = %settings.output.display(), "Crawl complete");
    Ok(())
}

async fn run_download(args: &DownloadArgs, loaded: &LoadedConfig) -> Result<()> {
    let settings = app_config::download_settings(args, loaded);
    let records = load_records(&settings.input)
        .await
        .with_context(|| format!("Failed to load records from '{}'", settings.input.display()))?;

    let client = HttpClient::with_options(&settings.client).context("Failed to build HTTP client")?;
    let retry_policy = RetryPolicy::with_max_attempts(settings.max_attempts)
        .with_success_pause(settings.success_pause);
    let size_policy = SizePolicy::with_max_size_bytes(settings.max_size_bytes);

    let engine = DownloadEngine::new(Arc::new(client), retry_policy, size_policy);
    let stats = engine.run(&records, &settings.output_dir).await;

    info!(
        downloaded = stats.downloaded(),
        skipped = stats.skipped(),
        forbidden = stats.forbidden(),
        failed = stats.failed(),
        retried = stats.retried(),
        total = stats.total(),
        "Download complete"
    );
    Ok(())
}

async fn run_render(args: &RenderArgs, loaded: &LoadedConfig) -> Result<()> {
    let settings = app_config::render_settings(args, loaded);
    let count = write_html(&settings.input, &settings.output)
        .await
        .with_context(|| format!("Failed to render '{}'", settings.input.display()))?;
    info!(records = count, output = %settings.output.display(), "HTML generated");
    Ok(())
}
