//! Retry policy with quadratic backoff for transient download failures.
//!
//! A failed attempt is classified into a [`FailureType`]; the [`RetryPolicy`]
//! then decides whether another attempt is made and how long to wait first.
//!
//! # Example
//!
//! ```
//! use catalog_mirror::download::{
//!     DownloadError, FailureType, RetryDecision, RetryPolicy, classify_error,
//! };
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/file.pdf", 503);
//! assert_eq!(classify_error(&error), FailureType::Transient);
//!
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_secs(25));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{BACKOFF_OFFSET, DEFAULT_SUCCESS_PAUSE};

/// Default attempt budget (including the first attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default unit the squared backoff factor is multiplied by.
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeout, connection reset, truncated body, any non-403 HTTP status.
    Transient,

    /// HTTP 403. The resource is categorically inaccessible.
    Forbidden,

    /// Local failure that another request would not fix.
    ///
    /// Examples: invalid URL, disk write error.
    Permanent,
}

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the download after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the download.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt budget and pacing for downloads.
///
/// # Delay Calculation
///
/// ```text
/// delay = backoff_unit * (attempt + 4)^2
/// ```
///
/// where `attempt` is the 1-indexed attempt that just failed. With defaults
/// this waits 25s after the first failure and 36s after the second. After a
/// success the downloader pauses for `success_pause` (5s by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Unit multiplied by the squared backoff factor.
    backoff_unit: Duration,

    /// Pause after a successful download.
    success_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            success_pause: DEFAULT_SUCCESS_PAUSE,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_unit: Duration, success_pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
            success_pause,
        }
    }

    /// Creates a policy with a custom attempt budget, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns a copy with a different post-success pause.
    #[must_use]
    pub fn with_success_pause(mut self, success_pause: Duration) -> Self {
        self.success_pause = success_pause;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the pause applied after a successful download.
    #[must_use]
    pub fn success_pause(&self) -> Duration {
        self.success_pause
    }

    /// Determines whether to retry a failed download.
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Forbidden => {
                return RetryDecision::DoNotRetry {
                    reason: "access forbidden - retry would not help".to_string(),
                };
            }
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.backoff_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_secs = delay.as_secs_f64(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Backoff after the given failed attempt: `unit * (attempt + 4)^2`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(attempt) + BACKOFF_OFFSET;
        let squared = u32::try_from(factor * factor).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(squared)
    }
}

/// Classifies a download error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 403 | Forbidden |
/// | Any other HTTP status | Transient |
/// | Timeout / Network / Truncated | Transient |
/// | Io / InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status: 403, .. } => FailureType::Forbidden,
        DownloadError::HttpStatus { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::Network { .. }
        | DownloadError::Truncated { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}
