//! Utility functions for string formatting.

pub mod format;

pub use format::{age_display, format_count, format_inventory, truncate_string};
