//! Admission control for attachments.
//!
//! Decides from catalog metadata alone whether an attachment is worth a
//! network request: web-service pointers are never files, and anything
//! declared above the size ceiling is left alone to bound run time and disk
//! usage.

use tracing::info;

use super::constants::{DEFAULT_MAX_SIZE_BYTES, WEB_SERVICE_RESOURCE_TYPE};
use crate::size::{bytes_to_gigabytes, humanize_bytes};

/// Result of evaluating an attachment against a [`SizePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Eligible for download.
    Admitted,
    /// Resource type is a web service endpoint, not a file.
    ExcludedType,
    /// Declared size is above the ceiling.
    TooLarge {
        /// Declared size in bytes.
        bytes: u64,
    },
}

impl Admission {
    /// Returns true when the attachment may be downloaded.
    #[must_use]
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Size ceiling and resource-type exclusion for attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    max_size_bytes: u64,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

impl SizePolicy {
    /// Creates a policy with a custom ceiling in bytes.
    #[must_use]
    pub fn with_max_size_bytes(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    /// Returns the configured ceiling in bytes.
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Classifies an attachment. `None` sizes count as zero.
    ///
    /// A size exactly at the ceiling is admitted.
    #[must_use]
    pub fn evaluate(&self, resource_type: &str, declared_size: Option<u64>) -> Admission {
        if is_web_service(resource_type) {
            return Admission::ExcludedType;
        }
        let bytes = declared_size.unwrap_or(0);
        if bytes > self.max_size_bytes {
            return Admission::TooLarge { bytes };
        }
        Admission::Admitted
    }

    /// Returns whether an attachment may be downloaded, logging size rejections.
    #[must_use]
    pub fn admit(&self, resource_type: &str, declared_size: Option<u64>) -> bool {
        let admission = self.evaluate(resource_type, declared_size);
        if let Admission::TooLarge { bytes } = admission {
            info!(
                size = %humanize_bytes(bytes),
                gigabytes = format!("{:.2}", bytes_to_gigabytes(bytes)),
                "attachment exceeds size ceiling"
            );
        }
        admission.is_admitted()
    }
}

/// Replaces every space with an underscore.
#[must_use]
pub fn normalize_segment(value: &str) -> String {
    value.replace(' ', "_")
}

/// Returns true for the sentinel web-service resource type, in either
/// spaced or underscored spelling.
#[must_use]
pub fn is_web_service(resource_type: &str) -> bool {
    normalize_segment(resource_type) == WEB_SERVICE_RESOURCE_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;

    #[test]
    fn test_web_service_never_admitted() {
        let policy = SizePolicy::default();
        for size in [None, Some(0), Some(1), Some(GIB), Some(u64::MAX)] {
            assert!(!policy.admit("Web Service", size), "size {size:?}");
            assert!(!policy.admit("Web_Service", size), "size {size:?}");
        }
        assert_eq!(
            policy.evaluate("Web Service", Some(10)),
            Admission::ExcludedType
        );
    }

    #[test]
    fn test_missing_size_is_admitted_as_zero() {
        let policy = SizePolicy::default();
        assert!(policy.admit("Digital Document", None));
        assert!(policy.admit("Digital Document", Some(0)));
    }

    #[test]
    fn test_exactly_one_gib_is_admitted() {
        let policy = SizePolicy::default();
        assert!(policy.admit("Digital Document", Some(GIB)));
    }

    #[test]
    fn test_over_one_gib_is_rejected() {
        let policy = SizePolicy::default();
        assert!(!policy.admit("Digital Document", Some(GIB + 1)));
        assert_eq!(
            policy.evaluate("Digital Document", Some(2_147_483_648_000)),
            Admission::TooLarge {
                bytes: 2_147_483_648_000
            }
        );
    }

    #[test]
    fn test_custom_ceiling() {
        let policy = SizePolicy::with_max_size_bytes(100);
        assert_eq!(policy.max_size_bytes(), 100);
        assert!(policy.admit("Image", Some(100)));
        assert!(!policy.admit("Image", Some(101)));
    }

    #[test]
    fn test_similar_resource_types_are_not_excluded() {
        let policy = SizePolicy::default();
        assert!(policy.admit("Web Services", Some(1)));
        assert!(policy.admit("web service", Some(1)));
        assert!(policy.admit("", Some(1)));
    }

    #[test]
    fn test_normalize_segment_replaces_every_space() {
        assert_eq!(normalize_segment("Some Type"), "Some_Type");
        assert_eq!(normalize_segment(" a  b "), "_a__b_");
        assert_eq!(normalize_segment("NoSpaces"), "NoSpaces");
    }
}
