//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Mirror a public records catalog: harvest metadata, download attachments,
/// render a browsable page.
#[derive(Parser, Debug)]
#[command(name = "catalog-mirror")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest every catalog record into a JSON file
    Crawl(CrawlArgs),
    /// Download the attachments listed in a record file
    Download(DownloadArgs),
    /// Render a record file as a static HTML page
    Render(RenderArgs),
}

/// Arguments for `crawl`.
#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    /// Search endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Records requested per page (1-10000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub page_size: Option<u32>,

    /// Where to write the harvested records
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Per-request connect and read timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: Option<u64>,

    /// Skip TLS certificate verification for the search endpoint
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for `download`.
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Record file produced by `crawl`
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Root directory for downloaded attachments
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Attempts per attachment, including the first (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Pause after each successful download in seconds (0-600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=600))]
    pub pause_secs: Option<u64>,

    /// Largest declared attachment size admitted, in bytes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_size_bytes: Option<u64>,

    /// Per-request connect and read timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: Option<u64>,

    /// Skip TLS certificate verification for attachment hosts
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for `render`.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Record file produced by `crawl`
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where to write the HTML page
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
