//! Command state tracking
//!
//! Keeps the current value of every command seen on the bus and a short
//! history of value/dump transitions.

use crate::types::{ChangeRecord, CommandRecord, CommandState, Direction, Timestamp};
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of change records kept
pub const HISTORY_LIMIT: usize = 5;

/// Tracks the latest state of each command and the most recent changes
#[derive(Debug, Default)]
pub struct CommandTracker {
    /// Current state per command, ordered by command name
    commands: BTreeMap<String, CommandState>,
    /// Change history in arrival order, oldest first
    history: VecDeque<ChangeRecord>,
}

impl CommandTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of `command`
    ///
    /// Returns `true` when the command is new or when its value, dump or
    /// direction differs from the stored state. Only value and dump changes
    /// are added to the history; a first sighting never is.
    ///
    /// The stored state is always replaced, including the timestamp.
    pub fn update(
        &mut self,
        command: &str,
        value: &str,
        direction: Direction,
        timestamp: Timestamp,
        dump: &str,
    ) -> bool {
        let new_state = CommandState {
            value: value.to_string(),
            dump: dump.to_string(),
            direction,
            last_updated: timestamp,
        };

        let Some(existing) = self.commands.get_mut(command) else {
            log::debug!("New command {} ({}) = {:?}", command, direction, value);
            self.commands.insert(command.to_string(), new_state);
            return true;
        };

        let value_changed = existing.value != value;
        let dump_changed = existing.dump != dump;
        let direction_changed = existing.direction != direction;

        if value_changed || dump_changed {
            log::debug!(
                "Command {} changed: {:?} -> {:?} (dump changed: {})",
                command,
                existing.value,
                value,
                dump_changed
            );
            let old = std::mem::replace(existing, new_state);
            self.push_change(ChangeRecord {
                command: command.to_string(),
                direction,
                timestamp,
                old_value: old.value,
                new_value: value.to_string(),
                value_changed,
                old_dump: old.dump,
                new_dump: dump.to_string(),
                dump_changed,
            });
        } else {
            *existing = new_state;
        }

        value_changed || dump_changed || direction_changed
    }

    /// Apply a normalized record, see [`CommandTracker::update`]
    pub fn apply(&mut self, record: &CommandRecord) -> bool {
        self.update(
            &record.command,
            &record.payload,
            record.direction,
            record.timestamp,
            &record.dump,
        )
    }

    fn push_change(&mut self, change: ChangeRecord) {
        self.history.push_back(change);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// All tracked commands sorted by name
    pub fn snapshot(&self) -> Vec<(&str, &CommandState)> {
        self.commands
            .iter()
            .map(|(command, state)| (command.as_str(), state))
            .collect()
    }

    /// Up to `limit` most recent changes, oldest first
    pub fn recent_changes(&self, limit: usize) -> Vec<&ChangeRecord> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).collect()
    }

    /// Current state of a single command
    pub fn get(&self, command: &str) -> Option<&CommandState> {
        self.commands.get(command)
    }

    /// Number of distinct commands seen
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
