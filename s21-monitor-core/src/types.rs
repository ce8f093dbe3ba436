//! Core types for the S21 monitor
//!
//! This module defines the records the packet normalizer emits, the per-command
//! state the tracker keeps, and the change records it produces.

use chrono::{DateTime, Local};
use std::fmt;
use std::str::FromStr;

/// Timestamp type used throughout the monitor
pub type Timestamp = DateTime<Local>;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while normalizing S21 traffic
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to parse S21 packet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid direction: {0:?} (expected TX or RX)")]
    InvalidDirection(String),
}

/// Traffic direction of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Transmitted by the controller
    Tx,
    /// Received from the unit
    Rx,
}

impl Direction {
    /// Derive the direction from a topic name (`.../tx` is TX, everything else RX)
    pub fn from_topic(topic: &str) -> Self {
        if topic.ends_with("/tx") {
            Direction::Tx
        } else {
            Direction::Rx
        }
    }

    /// Short label used in the display ("TX" or "RX")
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Tx => "TX",
            Direction::Rx => "RX",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers in table rows apply
        f.pad(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("tx") {
            Ok(Direction::Tx)
        } else if s.eq_ignore_ascii_case("rx") {
            Ok(Direction::Rx)
        } else {
            Err(MonitorError::InvalidDirection(s.to_string()))
        }
    }
}

/// One command/value pair extracted from an S21 packet
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    /// Command name (JSON key, e.g. "F1", "RH")
    pub command: String,
    /// Hex-encoded value
    pub payload: String,
    /// Value text before hex encoding
    pub raw_payload: String,
    /// Dump text shared by all commands of the packet
    pub dump: String,
    /// Direction of the topic the packet arrived on
    pub direction: Direction,
    /// Time the packet was received
    pub timestamp: Timestamp,
}

/// Current state of a single command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandState {
    pub value: String,
    pub dump: String,
    pub direction: Direction,
    pub last_updated: Timestamp,
}

/// Snapshot of one value or dump transition
///
/// Only produced for commands that already had a state, and only when the
/// value or the dump differs from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub command: String,
    pub direction: Direction,
    pub timestamp: Timestamp,
    pub old_value: String,
    pub new_value: String,
    pub value_changed: bool,
    pub old_dump: String,
    pub new_dump: String,
    pub dump_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_topic() {
        assert_eq!(Direction::from_topic("info/abc123/tx"), Direction::Tx);
        assert_eq!(Direction::from_topic("info/abc123/rx"), Direction::Rx);
        // Anything that isn't a TX topic counts as received traffic
        assert_eq!(Direction::from_topic("info/abc123/txt"), Direction::Rx);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("TX".parse::<Direction>().unwrap(), Direction::Tx);
        assert_eq!("rx".parse::<Direction>().unwrap(), Direction::Rx);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(MonitorError::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(format!("{}", Direction::Tx), "TX");
        assert_eq!(format!("{:<4}|", Direction::Rx), "RX  |");
    }
}
