//! Ready set for the priority policy.
//!
//! Entries are keyed by `(priority, admission sequence)` so the lowest
//! priority value wins and equal priorities leave in admission order.
//! Iteration order is fully determined by the keys.

use std::collections::BTreeMap;

use crate::types::Priority;

/// Priority-ordered set of admitted, not yet dispatched processes.
///
/// Values are indices into the caller's record slice.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: BTreeMap<(Priority, u64), usize>,
    /// Monotonic counter used as the tiebreaker for equal priorities.
    admission_counter: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the record at `idx`.
    pub fn admit(&mut self, idx: usize, priority: Priority) {
        let seq = self.admission_counter;
        self.admission_counter += 1;
        self.entries.insert((priority, seq), idx);
    }

    /// Remove and return the best entry.
    pub fn pop(&mut self) -> Option<usize> {
        self.entries.pop_first().map(|(_, idx)| idx)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices in dispatch order, without consuming.
    #[cfg(test)]
    fn ordered(&self) -> Vec<usize> {
        self.entries.values().copied().collect()
    }
}
