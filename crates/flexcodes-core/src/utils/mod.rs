//! Utility functions for string comparison and formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, format_last_modified, locale_cmp, truncate};
