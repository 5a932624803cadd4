//! Bounded record of successfully handled routes

use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteHistoryEntry {
    pub path: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// FIFO that keeps the most recent `capacity` entries
#[derive(Debug)]
pub struct RouteHistory {
    entries: VecDeque<RouteHistoryEntry>,
    capacity: usize,
}

impl RouteHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, path: impl Into<String>, timestamp: i64) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(RouteHistoryEntry {
            path: path.into(),
            timestamp,
        });
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<RouteHistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
