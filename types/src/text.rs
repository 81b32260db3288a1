//! Small pure text helpers.

/// Keep the first `max_content` characters of `raw`, appending `suffix` only
/// when something was cut.
///
/// The suffix does NOT count toward the budget. Counts `char`s, not bytes, so
/// multi-byte text is never split mid-scalar.
#[must_use]
pub fn truncate_preview(raw: &str, max_content: usize, suffix: &str) -> String {
    match raw.char_indices().nth(max_content) {
        Some((cut, _)) => format!("{}{suffix}", &raw[..cut]),
        None => raw.to_string(),
    }
}

/// Short single-purpose preview for log lines: 200 characters then `...`.
#[must_use]
pub fn log_preview(raw: &str) -> String {
    truncate_preview(raw, 200, "...")
}
