//! Streaming HTTP fetcher.
//!
//! This module provides the [`Fetcher`] seam and its reqwest-backed
//! implementation, [`HttpClient`]. A fetch is one GET whose body is streamed
//! to a hidden staging file and linked onto the destination only once the
//! transfer is complete, so an interrupted run never leaves a truncated file
//! at a path the orchestrator would later treat as done.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{PARTIAL_SUFFIX, STAGING_PREFIX, WRITE_BUFFER_BYTES};
use super::error::DownloadError;
use crate::http::{ClientOptions, build_client};

/// Performs a single download attempt.
///
/// Implementations write the complete body to `destination` and return the
/// number of bytes written, or a [`DownloadError`] describing why the attempt
/// failed. Retrying is the caller's concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` into `destination`.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;
}

/// HTTP fetcher with streaming support.
///
/// Designed to be created once and reused for a whole run, taking advantage
/// of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default options (60s timeouts, TLS verified).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static default
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_options(&ClientOptions::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client from explicit options.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the client cannot be built.
    pub fn with_options(options: &ClientOptions) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(options)?,
        })
    }

    /// Wraps an already configured reqwest client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    /// Streams `url` to `destination` through a hidden staging file.
    ///
    /// The staging file is created exclusively under a random name in the
    /// destination directory, so it can never truncate another attachment.
    /// It is linked onto `destination` only if nothing exists there yet.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns a non-success status
    /// - The body ends before the advertised `Content-Length`
    /// - Writing on disk fails, or `destination` already exists
    #[instrument(skip(self), fields(url = %url, path = %destination.display()))]
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        debug!("starting download");
        let response = self.send(url).await?;
        let expected_bytes = response.content_length();

        let (file, staging) = create_staging_file(destination)?;

        // Dropping `staging` on any early return removes the partial file.
        let bytes_written = stream_to_file(File::from_std(file), response, url, &staging).await?;
        ensure_complete(url, expected_bytes, bytes_written)?;

        staging
            .persist_noclobber(destination)
            .map_err(|e| DownloadError::io(destination.to_path_buf(), e.error))?;

        debug!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }
}

/// Creates `.<random>.part` next to `destination`.
fn create_staging_file(destination: &Path) -> Result<(std::fs::File, TempPath), DownloadError> {
    let directory = destination
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(directory)
        .map_err(|e| DownloadError::io(directory.to_path_buf(), e))?;
    debug!(path = %staged.path().display(), "staging file created");
    Ok(staged.into_parts())
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

/// Fails when fewer bytes arrived than the server announced.
fn ensure_complete(url: &str, expected: Option<u64>, actual: u64) -> Result<(), DownloadError> {
    match expected {
        Some(expected) if actual < expected => Err(DownloadError::truncated(url, expected, actual)),
        _ => Ok(()),
    }
}
