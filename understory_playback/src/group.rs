// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group scopes: the managers of one top-level screen.
//!
//! ## Ordering
//!
//! Managers are consulted sticky first, then prioritized managers by
//! descending priority, then the rest in registration order. Equal priorities
//! keep registration order.
//!
//! ## Distances
//!
//! After arbitration every slot of the group gets a distance to the selection:
//! `0` for the selection, `1..` for the other active slots ranked by the distance
//! between their container center and the center of the cover, and
//! [`INACTIVE_DISTANCE`] for the rest. The cover is the selection's rect, or the
//! union of all active rects when nothing is selected.

use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::Rect;

use crate::arena::Arena;
use crate::bridge::Prioritized;
use crate::error::{Error, Result};
use crate::manager::ManagerScope;
use crate::memory::MemoryMode;
use crate::slot::{INACTIVE_DISTANCE, Slot};
use crate::types::{GroupId, LifecycleState, ManagerId, SlotId};

/// Configuration of a group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupConfig {
    /// Overrides the arbiter's memory mode for this group.
    pub memory_mode: Option<MemoryMode>,
    /// Initial host lifecycle state. A group below [`Started`](LifecycleState::Started)
    /// selects nothing.
    pub lifecycle: LifecycleState,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            memory_mode: None,
            lifecycle: LifecycleState::Resumed,
        }
    }
}

/// The managers of one top-level screen and its single selection.
#[derive(Debug)]
pub struct GroupScope {
    pub(crate) id: GroupId,
    pub(crate) memory_mode: Option<MemoryMode>,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) managers: Vec<ManagerId>,
    pub(crate) sticky: Option<ManagerId>,
    pub(crate) selection: Option<SlotId>,
    pub(crate) locked: bool,
}

impl GroupScope {
    pub(crate) fn new(id: GroupId, config: GroupConfig) -> Self {
        Self {
            id,
            memory_mode: config.memory_mode,
            lifecycle: config.lifecycle,
            managers: Vec::new(),
            sticky: None,
            selection: None,
            locked: false,
        }
    }

    /// Handle of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The slot currently selected to play.
    pub fn selection(&self) -> Option<SlotId> {
        self.selection
    }

    /// Current host lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// True if the group is locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Managers in precedence order.
    pub fn managers(&self) -> impl Iterator<Item = ManagerId> + '_ {
        self.sticky.into_iter().chain(
            self.managers
                .iter()
                .copied()
                .filter(move |m| Some(*m) != self.sticky),
        )
    }

    /// Inserts `id` by priority. Fails if a comparator is not antisymmetric.
    pub(crate) fn insert_manager(
        &mut self,
        id: ManagerId,
        managers: &Arena<ManagerId, ManagerScope>,
    ) -> Result<()> {
        if self.managers.contains(&id) {
            return Ok(());
        }
        let Some(new) = managers.get(id).and_then(|m| m.priority.as_deref()) else {
            self.managers.push(id);
            return Ok(());
        };
        let mut at = self.managers.len();
        for (i, other) in self.managers.iter().enumerate() {
            let Some(other) = managers.get(*other).and_then(|m| m.priority.as_deref()) else {
                at = i;
                break;
            };
            if compare_and_check(new, other)? == Ordering::Greater {
                at = i;
                break;
            }
        }
        self.managers.insert(at, id);
        Ok(())
    }

    pub(crate) fn remove_manager(&mut self, id: ManagerId) {
        self.managers.retain(|m| *m != id);
        if self.sticky == Some(id) {
            self.sticky = None;
        }
    }
}

/// Compares two prioritized hosts in both directions.
///
/// Returns `a` against `b`, or [`Error::AsymmetricPriority`] if the two
/// directions do not cancel out.
pub fn compare_and_check(a: &dyn Prioritized, b: &dyn Prioritized) -> Result<Ordering> {
    let ab = a.compare(b);
    let ba = b.compare(a);
    let sum = ab as i8 + ba as i8;
    if sum != 0 {
        return Err(Error::AsymmetricPriority { sum });
    }
    Ok(ab)
}

/// Ranks active slots by proximity to the selection.
///
/// Returns `(slot, distance)` for every slot in `slots`: non-selected active
/// slots first in ascending rank, then the selection, then inactive slots.
pub fn rank_distances(selection: Option<SlotId>, slots: &[&Slot]) -> Vec<(SlotId, u32)> {
    let selected = selection.and_then(|id| slots.iter().find(|s| s.id == id));
    let active = || slots.iter().filter(|s| s.is_active());
    let cover = match selected {
        Some(s) => s.token.container_rect,
        None => active()
            .map(|s| s.token.container_rect)
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO),
    };
    let target = cover.center();

    let mut others: Vec<(&Slot, f64)> = active()
        .filter(|s| Some(s.id) != selection)
        .map(|s| (*s, s.token.container_rect.center().distance(target)))
        .collect();
    others.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut out = Vec::with_capacity(slots.len());
    for (rank, (slot, _)) in others.iter().enumerate() {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Slot counts stay far below u32::MAX."
        )]
        let distance = rank as u32 + 1;
        out.push((slot.id, distance));
    }
    if let Some(s) = selected {
        out.push((s.id, 0));
    }
    out.extend(
        slots
            .iter()
            .filter(|s| !s.is_active() && Some(s.id) != selection)
            .map(|s| (s.id, INACTIVE_DISTANCE)),
    );
    out
}
