// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational storage shared by every scope.

use alloc::vec::Vec;
use core::marker::PhantomData;

/// A generational handle into an [`Arena`].
pub(crate) trait Handle: Copy + Eq {
    fn new(idx: u32, generation: u32) -> Self;
    fn idx(self) -> usize;
    fn generation(self) -> u32;
}

/// Slots keyed by generational handles.
///
/// - On insert, a fresh slot gets generation `1`; a reused slot bumps its generation.
/// - On remove, the slot is freed and every outstanding handle to it goes stale.
/// - Iteration yields live entries in slot order, which is deterministic for a
///   given sequence of inserts and removes.
pub(crate) struct Arena<H, T> {
    entries: Vec<Option<T>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    _handle: PhantomData<fn() -> H>,
}

impl<H: Handle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            _handle: PhantomData,
        }
    }
}

impl<H, T> core::fmt::Debug for Arena<H, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Arena")
            .field("total", &self.entries.len())
            .field("alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<H: Handle, T> Arena<H, T> {
    /// Insert a value built from its own handle.
    pub(crate) fn insert_with(&mut self, make: impl FnOnce(H) -> T) -> H {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.entries.push(None);
            self.generations.push(1);
            (self.entries.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Handles use 32-bit indices by design."
        )]
        let handle = H::new(idx as u32, generation);
        self.entries[idx] = Some(make(handle));
        handle
    }

    pub(crate) fn remove(&mut self, handle: H) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let value = self.entries[handle.idx()].take();
        self.free_list.push(handle.idx());
        value
    }

    pub(crate) fn contains(&self, handle: H) -> bool {
        self.entries
            .get(handle.idx())
            .is_some_and(|e| e.is_some() && self.generations[handle.idx()] == handle.generation())
    }

    pub(crate) fn get(&self, handle: H) -> Option<&T> {
        if !self.contains(handle) {
            return None;
        }
        self.entries[handle.idx()].as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        self.entries[handle.idx()].as_mut()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Handles use 32-bit indices by design."
            )]
            let handle = H::new(i as u32, self.generations[i]);
            e.as_ref().map(|v| (handle, v))
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotId;

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut arena: Arena<SlotId, &str> = Arena::default();
        let a = arena.insert_with(|_| "a");
        assert_eq!(arena.remove(a), Some("a"));
        let b = arena.insert_with(|_| "b");
        assert_eq!(a.idx(), b.idx(), "freed slot is reused");
        assert!(!arena.contains(a), "old generation is stale");
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn insert_with_sees_its_own_handle() {
        let mut arena: Arena<SlotId, SlotId> = Arena::default();
        let id = arena.insert_with(|id| id);
        assert_eq!(arena.get(id), Some(&id));
        assert_eq!(arena.iter().map(|(h, _)| h).collect::<Vec<_>>(), [id]);
    }
}
