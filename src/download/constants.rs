//! Constants for the download module (timeouts, admission, retry pacing).

use std::time::Duration;

/// Default HTTP connect and read timeout (60 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Buffer size used when streaming response bodies to disk (8 KiB).
pub const WRITE_BUFFER_BYTES: usize = 8 * 1024;

/// Default admission ceiling for a single attachment (1 GiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 1 << 30;

/// Default pause after a successful download before the next attachment.
pub const DEFAULT_SUCCESS_PAUSE: Duration = Duration::from_secs(5);

/// Offset added to the attempt number before squaring for backoff.
pub const BACKOFF_OFFSET: u64 = 4;

/// Resource type that denotes an API endpoint rather than a file.
pub const WEB_SERVICE_RESOURCE_TYPE: &str = "Web_Service";

/// Prefix of the staging file written during a transfer (hidden on Unix).
pub const STAGING_PREFIX: &str = ".";

/// Suffix of the staging file written during a transfer.
pub const PARTIAL_SUFFIX: &str = ".part";
