//! Human-readable byte counts shared by the download log and the HTML page.

/// Unit labels, base 1024.
const UNITS: [&str; 5] = ["bytes", "Kb", "Mb", "Gb", "Tb"];

/// Number of bytes in one gibibyte.
pub const BYTES_PER_GIB: u64 = 1 << 30;

/// Converts a byte count to gibibytes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_gigabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB as f64
}

/// Formats a byte count with base-1024 units.
///
/// The value is rounded to two decimals and a trailing `.00` is dropped, so
/// `1024` renders as `1 Kb` and `1536` as `1.50 Kb`. Values beyond the terabyte
/// range stay in `Tb`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn humanize_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{value:.2}");
    let trimmed = formatted.strip_suffix(".00").unwrap_or(&formatted);
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_bytes_small_values_stay_in_bytes() {
        assert_eq!(humanize_bytes(0), "0 bytes");
        assert_eq!(humanize_bytes(500), "500 bytes");
        assert_eq!(humanize_bytes(1023), "1023 bytes");
    }

    #[test]
    fn test_humanize_bytes_strips_zero_decimals() {
        assert_eq!(humanize_bytes(1024), "1 Kb");
        assert_eq!(humanize_bytes(1024 * 1024), "1 Mb");
        assert_eq!(humanize_bytes(BYTES_PER_GIB), "1 Gb");
        assert_eq!(humanize_bytes(BYTES_PER_GIB * 1024), "1 Tb");
    }

    #[test]
    fn test_humanize_bytes_fractional_values() {
        assert_eq!(humanize_bytes(1536), "1.50 Kb");
        assert_eq!(humanize_bytes(1300), "1.27 Kb");
        assert_eq!(humanize_bytes(5 * 1024 * 1024 + 256 * 1024), "5.25 Mb");
    }

    #[test]
    fn test_humanize_bytes_caps_at_terabytes() {
        assert_eq!(humanize_bytes(BYTES_PER_GIB * 1024 * 2048), "2048 Tb");
    }

    #[test]
    fn test_bytes_to_gigabytes() {
        assert!((bytes_to_gigabytes(BYTES_PER_GIB) - 1.0).abs() < f64::EPSILON);
        assert!((bytes_to_gigabytes(BYTES_PER_GIB / 2) - 0.5).abs() < f64::EPSILON);
    }
}
