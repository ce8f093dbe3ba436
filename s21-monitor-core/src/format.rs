//! Display helpers shared by the renderer

use crate::types::Timestamp;

/// Default maximum length for [`truncate_value`]
pub const DEFAULT_TRUNCATE: usize = 20;

/// Format a timestamp as `HH:MM:SS`
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// Shorten `value` to `max_length` characters, replacing the tail with "..."
pub fn truncate_value(value: &str, max_length: usize) -> String {
    if value.chars().count() <= max_length {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_length.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}
