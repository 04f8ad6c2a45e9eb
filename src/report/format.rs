//! Human-readable sizes and durations for the final report.

use std::time::Duration;

const KIB: f64 = 1024.0;

/// Formats a byte count as `B`, `KB`, `MB` or `GB`.
///
/// ```
/// use doihive_core::report::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / KIB;
    for unit in ["KB", "MB"] {
        if value < KIB {
            return format!("{value:.2} {unit}");
        }
        value /= KIB;
    }
    format!("{value:.2} GB")
}

/// Formats a duration as milliseconds, seconds, minutes or hours.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else if secs < 3600.0 {
        format!("{:.1}min", secs / 60.0)
    } else {
        format!("{:.2}h", secs / 3600.0)
    }
}
