use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, Local};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-insensitive substring test. `needle` must already be lowercased.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(needle)
}

/// Base letters of `s`: canonically decomposed, combining marks dropped,
/// lowercased.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Collation-style comparison for display names.
///
/// Three levels, as a collator would apply them:
/// 1. base letters, ignoring accents and case ("Édgewood" sorts with "edgewood")
/// 2. accents, unaccented first
/// 3. case, lowercase first
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| {
            a.nfd()
                .flat_map(char::to_lowercase)
                .cmp(b.nfd().flat_map(char::to_lowercase))
        })
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .find(|(x, y)| x != y)
                .map(|(x, y)| y.is_lowercase().cmp(&x.is_lowercase()).then(x.cmp(&y)))
                .unwrap_or(Ordering::Equal)
        })
}

/// Truncate a string to a maximum number of characters, adding "..." if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a Last-Modified timestamp in local time
pub fn format_last_modified(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&Local).format("%b %-d, %Y %-I:%M %p").to_string()
}
