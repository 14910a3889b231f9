//! Bounded record of recent events and requests for the status dump.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which way a history entry flowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// An event from the engine.
    Inbound,
    /// A request we sent.
    Outbound,
    /// A fault caught by the loop.
    Fault,
}

/// One remembered event or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Wall-clock time it was recorded.
    pub at: DateTime<Utc>,
    /// Pulse count at the time.
    pub pulse: u64,
    /// Inbound, outbound, or fault.
    pub direction: Direction,
    /// Short label, e.g. `piece_placed` or `end_turn`.
    pub label: String,
}

/// A ring of the most recent entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// An empty history keeping at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, dropping the oldest when full.
    pub fn record(&mut self, pulse: u64, direction: Direction, label: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            at: Utc::now(),
            pulse,
            direction,
            label: label.into(),
        });
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_fall_off() {
        let mut history = History::new(2);
        history.record(1, Direction::Inbound, "pulse");
        history.record(2, Direction::Outbound, "roll_dice");
        history.record(3, Direction::Inbound, "dice_result");
        let labels: Vec<&str> = history.entries().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["roll_dice", "dice_result"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = History::new(0);
        history.record(1, Direction::Fault, "boom");
        assert!(history.is_empty());
    }
}
