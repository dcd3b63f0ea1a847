//! Bulk download orchestration over a catalog record list.
//!
//! The engine walks records and their attachments strictly in input order,
//! one request at a time. Every attachment passes the same gates before any
//! network traffic happens:
//!
//! 1. web-service resource types are skipped
//! 2. the [`SizePolicy`] ceiling is applied to the declared size
//! 3. the destination is resolved (attachments without a file name or URL are skipped)
//! 4. an existing destination file is left untouched, and a destination
//!    whose existence cannot be checked counts as failed
//!
//! Whatever happens to one attachment, the engine carries on with the next;
//! the per-attachment loop is the failure boundary.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use catalog_mirror::catalog::load_records;
//! use catalog_mirror::download::{DownloadEngine, HttpClient, RetryPolicy, SizePolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = load_records(Path::new("output.json")).await?;
//! let engine = DownloadEngine::new(
//!     Arc::new(HttpClient::new()),
//!     RetryPolicy::default(),
//!     SizePolicy::default(),
//! );
//! let stats = engine.run(&records, Path::new("data")).await;
//! println!("downloaded {} files", stats.downloaded());
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::client::Fetcher;
use super::downloader::{DownloadOutcome, DownloadTarget, RetryingDownloader, SkipReason};
use super::error::DownloadError;
use super::path::{directory_for, https_url, resolve};
use super::policy::{Admission, SizePolicy, is_web_service};
use super::retry::RetryPolicy;
use crate::catalog::{AttachmentRef, CatalogRecord, ReferenceId};
use crate::size::humanize_bytes;

/// Counters for one engine run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadStats {
    downloaded: usize,
    skipped: usize,
    forbidden: usize,
    failed: usize,
    retried: usize,
    bytes: u64,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files written during this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    /// Attachments skipped by policy, missing data or idempotence.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Attachments the server refused with 403.
    #[must_use]
    pub fn forbidden(&self) -> usize {
        self.forbidden
    }

    /// Attachments that failed after all attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Extra attempts made beyond the first, across all attachments.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried
    }

    /// Total bytes written.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Every attachment seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.forbidden + self.failed
    }

    /// Folds one outcome into the counters.
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        let attempts = usize::try_from(outcome.attempts()).unwrap_or(usize::MAX);
        self.retried += attempts.saturating_sub(1);
        match outcome {
            DownloadOutcome::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Skipped(_) => self.skipped += 1,
            DownloadOutcome::Forbidden => self.forbidden += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
    }

    fn add_failed(&mut self, count: usize) {
        self.failed += count;
    }
}

/// Sequential bulk downloader for catalog attachments.
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    downloader: RetryingDownloader,
    size_policy: SizePolicy,
}

impl DownloadEngine {
    /// Creates an engine fetching through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, retry_policy: RetryPolicy, size_policy: SizePolicy) -> Self {
        debug!(
            max_attempts = retry_policy.max_attempts(),
            success_pause_secs = retry_policy.success_pause().as_secs_f64(),
            max_size = %humanize_bytes(size_policy.max_size_bytes()),
            "creating download engine"
        );
        Self {
            downloader: RetryingDownloader::new(fetcher, retry_policy),
            size_policy,
        }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.downloader.policy()
    }

    /// Returns the configured size policy.
    #[must_use]
    pub fn size_policy(&self) -> &SizePolicy {
        &self.size_policy
    }

    /// Mirrors every attachment of `records` under `base_dir`.
    ///
    /// Individual attachment failures never end the run; they are logged and
    /// counted in the returned stats.
    #[instrument(skip(self, records), fields(base_dir = %base_dir.display(), records = records.len()))]
    pub async fn run(&self, records: &[CatalogRecord], base_dir: &Path) -> DownloadStats {
        let mut stats = DownloadStats::new();
        let total = records.len();

        info!("starting bulk download");

        for (index, record) in records.iter().enumerate() {
            let position = index + 1;
            info!(
                record = position,
                total,
                progress = %format_progress(position, total),
                "processing record"
            );
            self.process_record(record, base_dir, &mut stats).await;
        }

        info!(
            downloaded = stats.downloaded(),
            skipped = stats.skipped(),
            forbidden = stats.forbidden(),
            failed = stats.failed(),
            retried = stats.retried(),
            size = %humanize_bytes(stats.bytes()),
            "bulk download complete"
        );
        stats
    }

    async fn process_record(&self, record: &CatalogRecord, base_dir: &Path, stats: &mut DownloadStats) {
        let (Some(reference_type), Some(reference_id)) =
            (record.reference_type.as_deref(), record.reference_id.as_ref())
        else {
            warn!(
                attachments = record.linked_resources.len(),
                "record has no reference type or id, skipping"
            );
            for _ in &record.linked_resources {
                stats.record(&DownloadOutcome::Skipped(SkipReason::MissingReference));
            }
            return;
        };

        let directory = directory_for(base_dir, reference_type, reference_id);
        if let Err(e) = tokio::fs::create_dir_all(&directory).await {
            warn!(
                path = %directory.display(),
                error = %e,
                "failed to create record directory, skipping record"
            );
            stats.add_failed(record.linked_resources.len());
            return;
        }

        let count = record.linked_resources.len();
        for (index, attachment) in record.linked_resources.iter().enumerate() {
            debug!(resource = index + 1, total = count, "processing resource");
            let outcome = self
                .process_attachment(base_dir, reference_type, reference_id, attachment)
                .await;
            stats.record(&outcome);
        }
    }

    async fn process_attachment(
        &self,
        base_dir: &Path,
        reference_type: &str,
        reference_id: &ReferenceId,
        attachment: &AttachmentRef,
    ) -> DownloadOutcome {
        let resource_type = attachment.resource_type();
        if is_web_service(resource_type) {
            return DownloadOutcome::Skipped(SkipReason::WebService);
        }

        let file_label = attachment.file_name.as_deref().unwrap_or("<unnamed>");
        if let Admission::TooLarge { bytes } =
            self.size_policy.evaluate(resource_type, attachment.file_size)
        {
            info!(
                file = file_label,
                size = %humanize_bytes(bytes),
                "skipping attachment above size ceiling"
            );
            return DownloadOutcome::Skipped(SkipReason::TooLarge { bytes });
        }

        let Some(path) = resolve(
            base_dir,
            reference_type,
            reference_id,
            attachment.file_name.as_deref(),
        ) else {
            warn!(%reference_id, "attachment has no file name, skipping");
            return DownloadOutcome::Skipped(SkipReason::MissingFileName);
        };

        let Some(url) = attachment.url.as_deref().filter(|u| !u.is_empty()) else {
            warn!(path = %path.display(), "attachment has no url, skipping");
            return DownloadOutcome::Skipped(SkipReason::MissingUrl);
        };

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                info!(path = %path.display(), "already present, skipping");
                return DownloadOutcome::Skipped(SkipReason::AlreadyPresent);
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot tell whether destination exists, not downloading"
                );
                return DownloadOutcome::Failed {
                    error: DownloadError::io(path, e),
                    attempts: 0,
                };
            }
        }

        let target = DownloadTarget {
            directory: path
                .parent()
                .map_or_else(|| base_dir.to_path_buf(), Path::to_path_buf),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            url: https_url(url),
            size_bytes: attachment.declared_size(),
        };

        info!(
            url = %target.url,
            path = %path.display(),
            declared_size = %humanize_bytes(target.size_bytes),
            "downloading"
        );
        self.downloader.download(&target).await
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_progress(position: usize, total: usize) -> String {
    if total == 0 {
        return "100.00%".to_string();
    }
    format!("{:.2}%", position as f64 / total as f64 * 100.0)
}
