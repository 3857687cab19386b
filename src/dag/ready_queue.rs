// src/dag/ready_queue.rs

use std::collections::{HashSet, VecDeque};

use crate::types::Day;

/// FIFO of nodes whose dependency counter reached zero.
///
/// A node can be pushed at most once for the lifetime of the queue, so a
/// node is never re-enqueued after it has been taken.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<Day>,
    seen: HashSet<Day>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `day`. Returns `false` if it was enqueued before.
    pub fn push(&mut self, day: Day) -> bool {
        if !self.seen.insert(day) {
            return false;
        }
        self.queue.push_back(day);
        true
    }

    pub fn pop(&mut self) -> Option<Day> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
