//! Catalog Mirror Core Library
//!
//! Mirrors a public records catalog to local disk: harvests record metadata
//! from the paginated search API, downloads every eligible attachment into a
//! deterministic directory tree, and renders a browsable static page.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`catalog`] - Record model and lenient JSON loading
//! - [`crawl`] - Paginated metadata harvest
//! - [`download`] - Size policy, path resolution, retrying fetch, bulk engine
//! - [`render`] - Static HTML page generation
//! - [`http`] - Shared client construction
//! - [`size`] - Byte-size helpers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod crawl;
pub mod download;
pub mod http;
pub mod render;
pub mod size;
mod user_agent;

// Re-export commonly used types
pub use catalog::{AttachmentRef, CatalogError, CatalogRecord, ReferenceId, load_records};
pub use crawl::{CatalogCrawler, CrawlError};
pub use download::{
    DEFAULT_MAX_ATTEMPTS, DownloadEngine, DownloadError, DownloadOutcome, DownloadStats,
    DownloadTarget, FailureType, Fetcher, HttpClient, RetryDecision, RetryPolicy,
    RetryingDownloader, SizePolicy, SkipReason, classify_error,
};
pub use http::{ClientOptions, build_client};
pub use render::{RenderError, render_html, write_html};
pub use size::humanize_bytes;
