// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellable single-shot timers keyed by entity.
//!
//! Time is a host-supplied monotonic [`Duration`]. Scheduling a key that is
//! already pending replaces its deadline, so at most one timer exists per key.
//! Due timers pop in deadline order; equal deadlines pop in scheduling order.

use alloc::collections::BTreeMap;
use core::time::Duration;

/// A set of pending single-shot timers, at most one per key.
#[derive(Clone, Debug)]
pub struct Timers<K> {
    pending: BTreeMap<K, (Duration, u64)>,
    seq: u64,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            seq: 0,
        }
    }
}

impl<K: Ord + Copy> Timers<K> {
    /// Create an empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` to fire at `deadline`, cancelling any earlier schedule of it.
    pub fn schedule(&mut self, key: K, deadline: Duration) {
        self.seq += 1;
        self.pending.insert(key, (deadline, self.seq));
    }

    /// Cancel `key`. Returns `true` if it was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        self.pending.remove(&key).is_some()
    }

    /// Whether `key` is pending.
    pub fn is_scheduled(&self, key: K) -> bool {
        self.pending.contains_key(&key)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().map(|(d, _)| *d).min()
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<K> {
        let (key, _) = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .min_by_key(|(_, (deadline, order))| (*deadline, *order))?;
        let key = *key;
        self.pending.remove(&key);
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn reschedule_replaces_previous_deadline() {
        let mut t = Timers::new();
        t.schedule(1_u32, MS * 10);
        t.schedule(1, MS * 50);
        assert_eq!(t.len(), 1);
        assert_eq!(t.pop_due(MS * 20), None, "first deadline was cancelled");
        assert_eq!(t.pop_due(MS * 50), Some(1));
        assert!(t.is_empty());
    }

    #[test]
    fn pops_in_deadline_then_schedule_order() {
        let mut t = Timers::new();
        t.schedule(3_u8, MS * 5);
        t.schedule(1, MS * 2);
        t.schedule(2, MS * 5);
        assert_eq!(t.next_deadline(), Some(MS * 2));
        assert_eq!(t.pop_due(MS * 10), Some(1));
        assert_eq!(t.pop_due(MS * 10), Some(3));
        assert_eq!(t.pop_due(MS * 10), Some(2));
        assert_eq!(t.pop_due(MS * 10), None);
    }

    #[test]
    fn cancel_only_drops_its_key() {
        let mut t = Timers::new();
        for k in 0_u8..4 {
            t.schedule(k, MS);
        }
        assert!(t.cancel(0));
        assert!(!t.cancel(0));
        assert!(!t.is_scheduled(0));
        assert!(t.is_scheduled(3));
        assert_eq!(t.len(), 3);
        assert_eq!(t.pop_due(MS), Some(1));
    }
}
