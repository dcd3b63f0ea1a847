//! Bounded-retry wrapper around a [`Fetcher`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::client::Fetcher;
use super::error::DownloadError;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::size::humanize_bytes;

/// A resolved attachment ready to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Per-record directory.
    pub directory: PathBuf,
    /// File name inside `directory`.
    pub file_name: String,
    /// URL with the scheme already normalized to https.
    pub url: String,
    /// Declared size in bytes (zero when unknown).
    pub size_bytes: u64,
}

impl DownloadTarget {
    /// Full destination path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Why an attachment was not fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Resource is a web-service endpoint.
    WebService,
    /// Declared size is above the ceiling.
    TooLarge {
        /// Declared size in bytes.
        bytes: u64,
    },
    /// Record has no reference type or id.
    MissingReference,
    /// Attachment has no file name.
    MissingFileName,
    /// Attachment has no URL.
    MissingUrl,
    /// The destination file already exists.
    AlreadyPresent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebService => f.write_str("web service endpoint"),
            Self::TooLarge { bytes } => write!(f, "too large ({})", humanize_bytes(*bytes)),
            Self::MissingReference => f.write_str("record has no reference type or id"),
            Self::MissingFileName => f.write_str("missing file name"),
            Self::MissingUrl => f.write_str("missing url"),
            Self::AlreadyPresent => f.write_str("already present"),
        }
    }
}

/// Result of processing one attachment.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// File written.
    Downloaded {
        /// Bytes written to disk.
        bytes: u64,
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Not fetched, by policy or idempotence.
    Skipped(SkipReason),
    /// Server answered 403; not retried.
    Forbidden,
    /// All attempts failed, or the failure was permanent.
    Failed {
        /// Error from the last attempt.
        error: DownloadError,
        /// Attempts used.
        attempts: u32,
    },
}

impl DownloadOutcome {
    /// Number of fetch attempts this outcome consumed.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Downloaded { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
            Self::Forbidden => 1,
            Self::Skipped(_) => 0,
        }
    }
}

/// Runs a [`Fetcher`] under a [`RetryPolicy`].
///
/// - Success: pause for the policy's success pause, then return `Downloaded`.
/// - HTTP 403: return `Forbidden` after the single attempt.
/// - Transient failure: sleep the backoff delay and try again until the
///   budget is spent, then return `Failed` with the last error.
/// - Permanent failure: return `Failed` immediately.
#[derive(Clone)]
pub struct RetryingDownloader {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl fmt::Debug for RetryingDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingDownloader")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingDownloader {
    /// Creates a downloader over `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Downloads `target`, retrying transient failures.
    #[instrument(skip(self, target), fields(url = %target.url))]
    pub async fn download(&self, target: &DownloadTarget) -> DownloadOutcome {
        let destination = target.path();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.fetcher.fetch(&target.url, &destination).await {
                Ok(bytes) => {
                    info!(
                        path = %destination.display(),
                        size = %humanize_bytes(bytes),
                        attempt,
                        "downloaded"
                    );
                    tokio::time::sleep(self.policy.success_pause()).await;
                    return DownloadOutcome::Downloaded {
                        bytes,
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    let failure_type = classify_error(&error);
                    if failure_type == FailureType::Forbidden {
                        warn!(url = %target.url, "access forbidden, skipping");
                        return DownloadOutcome::Forbidden;
                    }

                    match self.policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            warn!(
                                url = %target.url,
                                error = %error,
                                attempt = next_attempt,
                                max_attempts = self.policy.max_attempts(),
                                delay_secs = delay.as_secs_f64(),
                                "retrying download"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(
                                url = %target.url,
                                error = %error,
                                attempts = attempt,
                                %reason,
                                "download failed"
                            );
                            return DownloadOutcome::Failed {
                                error,
                                attempts: attempt,
                            };
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;

    /// Fetcher that replays a fixed script of results.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<u64, DownloadError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<u64, DownloadError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, _destination: &Path) -> Result<u64, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DownloadError::http_status(url, 500)))
        }
    }

    fn target() -> DownloadTarget {
        DownloadTarget {
            directory: PathBuf::from("base/Publication/42"),
            file_name: "doc.pdf".to_string(),
            url: "https://x/doc.pdf".to_string(),
            size_bytes: 500,
        }
    }

    #[test]
    fn test_target_path_joins_directory_and_file() {
        assert_eq!(
            target().path(),
            PathBuf::from("base/Publication/42/doc.pdf")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try_pauses_before_returning() {
        let fetcher = ScriptedFetcher::new(vec![Ok(500)]);
        let downloader = RetryingDownloader::new(fetcher.clone(), RetryPolicy::default());

        let started = Instant::now();
        let outcome = downloader.download(&target()).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Downloaded {
                bytes: 500,
                attempts: 1
            }
        ));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(DownloadError::timeout("https://x/doc.pdf")),
            Err(DownloadError::http_status("https://x/doc.pdf", 503)),
            Ok(500),
        ]);
        let policy = RetryPolicy::default().with_success_pause(Duration::ZERO);
        let downloader = RetryingDownloader::new(fetcher.clone(), policy);

        let started = Instant::now();
        let outcome = downloader.download(&target()).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Downloaded { attempts: 3, .. }
        ));
        assert_eq!(fetcher.calls(), 3);
        // 5^2 + 6^2 seconds of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(25 + 36));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(DownloadError::http_status(
            "https://x/doc.pdf",
            403,
        ))]);
        let downloader = RetryingDownloader::new(fetcher.clone(), RetryPolicy::default());

        let started = Instant::now();
        let outcome = downloader.download(&target()).await;

        assert!(matches!(outcome, DownloadOutcome::Forbidden));
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_report_last_error() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(DownloadError::timeout("https://x/doc.pdf")),
            Err(DownloadError::timeout("https://x/doc.pdf")),
            Err(DownloadError::truncated("https://x/doc.pdf", 500, 10)),
        ]);
        let downloader = RetryingDownloader::new(fetcher.clone(), RetryPolicy::default());

        let outcome = downloader.download(&target()).await;

        match outcome {
            DownloadOutcome::Failed { error, attempts } => {
                assert_eq!(attempts, 3);
                assert!(matches!(error, DownloadError::Truncated { .. }));
            }
            other => panic!("Expected Failed, got: {other:?}"),
        }
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(DownloadError::invalid_url("::"))]);
        let downloader = RetryingDownloader::new(fetcher.clone(), RetryPolicy::default());

        let outcome = downloader.download(&target()).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::Failed { attempts: 1, .. }
        ));
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::AlreadyPresent.to_string(), "already present");
        assert_eq!(
            SkipReason::TooLarge { bytes: 1 << 31 }.to_string(),
            "too large (2 Gb)"
        );
    }
}
