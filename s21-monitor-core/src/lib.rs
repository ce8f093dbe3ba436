//! S21 Monitor Core Library
//!
//! State tracking and change detection for S21 traffic observed on an MQTT bus.
//!
//! # Architecture
//!
//! This library contains no I/O:
//! - Normalizes S21 JSON packets into command records
//! - Tracks the current value of every command and a short change history
//! - Computes character-level highlights between old and new values
//!
//! Transport, configuration and terminal output live in the application
//! layer (s21-monitor-cli).
//!
//! # Example Usage
//!
//! ```
//! use chrono::Local;
//! use s21_monitor_core::{highlight, parse_s21_packet, CommandTracker, Direction, HISTORY_LIMIT};
//!
//! let mut tracker = CommandTracker::new();
//!
//! for payload in [r#"{"protocol":"S21","F1":"00"}"#, r#"{"protocol":"S21","F1":"01"}"#] {
//!     let records = parse_s21_packet(payload, Direction::Rx, Local::now()).unwrap();
//!     for record in &records {
//!         tracker.apply(record);
//!     }
//! }
//!
//! let change = tracker.recent_changes(HISTORY_LIMIT)[0];
//! let (old, new) = highlight(&change.old_value, &change.new_value);
//! println!("{} -> {}", old, new);
//! ```

// Public modules
pub mod format;
pub mod highlight;
pub mod parser;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use format::{format_timestamp, truncate_value, DEFAULT_TRUNCATE};
pub use highlight::{highlight, Highlighted, Segment};
pub use parser::{parse_s21_packet, to_hex_string};
pub use tracker::{CommandTracker, HISTORY_LIMIT};
pub use types::{
    ChangeRecord, CommandRecord, CommandState, Direction, MonitorError, Result, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
