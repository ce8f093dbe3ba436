//! Monitor loop
//!
//! Feeds bus messages through the packet normalizer into the command tracker
//! and redraws the screen whenever something changed.

use crate::display::Renderer;
use crate::source::{MessageSource, SourceEvent};
use anyhow::Result;
use chrono::Local;
use s21_monitor_core::{parse_s21_packet, CommandTracker, Direction};

pub struct Monitor {
    tracker: CommandTracker,
    renderer: Renderer,
}

impl Monitor {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            tracker: CommandTracker::new(),
            renderer,
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &CommandTracker {
        &self.tracker
    }

    /// Run until the source is exhausted
    pub fn run<S: MessageSource>(&mut self, source: &mut S) -> Result<()> {
        while let Some(event) = source.next_event() {
            match event {
                SourceEvent::Connected => self.renderer.draw(&self.tracker)?,
                SourceEvent::Message { topic, payload } => {
                    if self.handle_message(&topic, &payload) {
                        self.renderer.draw(&self.tracker)?;
                    }
                }
                SourceEvent::Disconnected(reason) => {
                    log::debug!("Source disconnected: {}", reason);
                }
            }
        }

        println!("\n\nDebug monitoring stopped.");
        Ok(())
    }

    /// Apply one bus message; returns true if any command changed
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> bool {
        let direction = Direction::from_topic(topic);

        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Dropping non-UTF-8 message on {}: {}", topic, e);
                return false;
            }
        };

        let records = match parse_s21_packet(text, direction, Local::now()) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Dropping message on {}: {}", topic, e);
                return false;
            }
        };

        let mut changed = false;
        for record in &records {
            changed |= self.tracker.apply(record);
        }
        changed
    }
}
