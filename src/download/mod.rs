//! Bulk attachment mirroring.
//!
//! This module turns catalog records into files on disk:
//!
//! - [`SizePolicy`] decides whether an attachment is eligible at all
//! - [`path`] maps a record and attachment to a deterministic destination
//! - [`HttpClient`] performs one streamed GET per attempt ([`Fetcher`])
//! - [`RetryingDownloader`] adds bounded retries with quadratic backoff
//! - [`DownloadEngine`] walks the record list and ties it together
//!
//! # Example
//!
//! ```no_run
//! use catalog_mirror::download::{DownloadTarget, HttpClient, RetryPolicy, RetryingDownloader};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let downloader = RetryingDownloader::new(Arc::new(HttpClient::new()), RetryPolicy::default());
//! let target = DownloadTarget {
//!     directory: PathBuf::from("data/Publication/42"),
//!     file_name: "doc.pdf".to_string(),
//!     url: "https://example.com/doc.pdf".to_string(),
//!     size_bytes: 500,
//! };
//! let outcome = downloader.download(&target).await;
//! println!("{outcome:?}");
//! # }
//! ```

mod client;
mod constants;
mod downloader;
mod engine;
mod error;
pub mod path;
mod policy;
mod retry;

pub use client::{Fetcher, HttpClient};
pub use constants::{DEFAULT_MAX_SIZE_BYTES, DEFAULT_SUCCESS_PAUSE, DEFAULT_TIMEOUT_SECS};
pub use downloader::{DownloadOutcome, DownloadTarget, RetryingDownloader, SkipReason};
pub use engine::{DownloadEngine, DownloadStats};
pub use error::DownloadError;
pub use policy::{Admission, SizePolicy, is_web_service, normalize_segment};
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
