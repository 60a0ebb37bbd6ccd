//! Human-readable size reporting.

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Format a byte count as `"N B"`, `"x.xx KB"` or `"x.xx MB"`.
pub fn format_file_size(bytes: u64) -> String {
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{:.2} MB", b / MB)
    }
}

/// Percentage of `original` saved by `compressed`, rounded to one decimal.
///
/// Negative when the output grew. Returns 0.0 for an empty original.
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = (original as f64 - compressed as f64) / original as f64 * 100.0;
    (saved * 10.0).round() / 10.0
}
