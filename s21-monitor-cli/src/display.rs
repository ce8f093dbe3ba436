//! Terminal rendering
//!
//! The screen is built as a single string and written after clearing the
//! terminal, so each redraw replaces the previous one in place.

use crate::config::DisplayConfig;
use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use s21_monitor_core::{
    format_timestamp, highlight, truncate_value, ChangeRecord, CommandTracker, HISTORY_LIMIT,
};
use std::fmt::{self, Write as _};
use std::io::{self, Write};

pub struct Renderer {
    config: DisplayConfig,
}

impl Renderer {
    pub fn new(config: DisplayConfig) -> Self {
        Self { config }
    }

    /// Clear the terminal and draw the current state
    pub fn draw(&self, tracker: &CommandTracker) -> Result<()> {
        let screen = self.render(tracker)?;
        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        stdout.write_all(screen.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    /// Build the full screen text
    pub fn render(&self, tracker: &CommandTracker) -> Result<String> {
        let mut out = String::new();
        self.render_into(&mut out, tracker)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String, tracker: &CommandTracker) -> fmt::Result {
        let heavy = "=".repeat(self.config.rule_width);
        let light = "-".repeat(self.config.rule_width);

        writeln!(out, "S21 Protocol Monitor")?;
        writeln!(out, "{}", heavy)?;

        if tracker.is_empty() {
            writeln!(out, "\nWaiting for S21 commands...")?;
        } else {
            writeln!(out, "\nAll Commands (Total: {}):", tracker.len())?;
            writeln!(out, "{}", light)?;
            writeln!(
                out,
                "{:<8} {:<4} {:<20} {:<25} {:<10}",
                "CMD", "DIR", "HEX VALUE", "DUMP", "TIME"
            )?;
            writeln!(out, "{}", light)?;

            for (command, state) in tracker.snapshot() {
                writeln!(
                    out,
                    "{:<8} {:<4} {:<20} {:<25} {:<10}",
                    command,
                    state.direction,
                    truncate_value(&state.value, self.config.value_width),
                    truncate_value(&state.dump, self.config.dump_width),
                    format_timestamp(&state.last_updated),
                )?;
            }
        }

        let changes = tracker.recent_changes(HISTORY_LIMIT);
        if !changes.is_empty() {
            writeln!(out, "\n{}", heavy)?;
            writeln!(out, "RECENT CHANGES")?;
            writeln!(out, "{}", light)?;
            for change in changes {
                self.render_change(out, change)?;
            }
        }

        Ok(())
    }

    fn render_change(&self, out: &mut String, change: &ChangeRecord) -> fmt::Result {
        if change.value_changed {
            let (old, new) = highlight(&change.old_value, &change.new_value);
            writeln!(
                out,
                "{:<8} {:<4} VALUE: {} → {} [{}]",
                change.command,
                change.direction,
                old,
                new,
                format_timestamp(&change.timestamp),
            )?;
        }

        if change.dump_changed && (!change.old_dump.is_empty() || !change.new_dump.is_empty()) {
            let (old, new) = highlight(&change.old_dump, &change.new_dump);
            let width = self.config.change_dump_width;
            writeln!(
                out,
                "{:>12}  DUMP:  {} → {}",
                "",
                old.truncate(width),
                new.truncate(width),
            )?;
        }

        writeln!(out)
    }
}
