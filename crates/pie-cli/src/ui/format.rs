//! Sizes and durations for build summaries.

use std::time::Duration;

/// `512 B`, `1.5 KB`, `2.3 MB`.
///
/// ```
/// use pie_cli::ui::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

/// `80ms`, `1.2s`, `2m 5s`. Rebuilds are usually in the first two ranges.
///
/// ```
/// use std::time::Duration;
/// use pie_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(80)), "80ms");
/// assert_eq!(format_duration(Duration::from_millis(1400)), "1.4s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    match duration.as_millis() {
        ms @ 0..=999 => format!("{}ms", ms),
        1000..=59_999 => format!("{:.1}s", duration.as_secs_f64()),
        _ => {
            let secs = duration.as_secs();
            format!("{}m {}s", secs / 60, secs % 60)
        }
    }
}
