//! Pluralization utilities.

/// Format count with noun, handling pluralization
///
/// # Examples
///
/// - `plural_count(1, "file")` -> `"1 file"`
/// - `plural_count(5, "file")` -> `"5 files"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
