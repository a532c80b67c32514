// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buckets: slots sharing one scrollable container, and the shared selection rule.
//!
//! A bucket owns a root container and a [`BucketPolicy`] that says which
//! containers belong to it and along which axes its root scrolls. Selection is
//! not pluggable: every bucket runs [`select_to_play`], so the comparator and the
//! manual-priority rule are identical across container kinds.

use alloc::boxed::Box;
use core::cmp::Ordering;

use crate::bridge::ContainerTree;
use crate::slot::Slot;
use crate::types::{Axes, BucketId, ContainerId, ManagerId, MediaId, SlotId};

/// Capability interface of one container kind (list, pager, plain group, ...).
pub trait BucketPolicy {
    /// The scrollable container this bucket is rooted at.
    fn root(&self) -> ContainerId;

    /// Whether `container` logically belongs to this bucket.
    ///
    /// The default walks the ancestor chain of `container` looking for the root.
    fn accepts(&self, tree: &dyn ContainerTree, container: ContainerId) -> bool {
        let root = self.root();
        let mut cur = tree.parent_of(container);
        while let Some(c) = cur {
            if c == root {
                return true;
            }
            cur = tree.parent_of(c);
        }
        false
    }

    /// Axes along which the root currently scrolls. Empty means no scroll axis.
    fn orientation(&self, tree: &dyn ContainerTree) -> Axes;

    /// Whether the slot may be offered to [`select_to_play`].
    fn allow_to_play(&self, tree: &dyn ContainerTree, slot: &Slot) -> bool {
        let _ = tree;
        slot.token().should_play()
    }
}

/// A registered bucket.
pub struct Bucket {
    pub(crate) id: BucketId,
    pub(crate) manager: ManagerId,
    pub(crate) policy: Box<dyn BucketPolicy>,
    pub(crate) locked: bool,
}

impl core::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("manager", &self.manager)
            .field("root", &self.policy.root())
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl Bucket {
    /// Handle of this bucket.
    pub fn id(&self) -> BucketId {
        self.id
    }

    /// The manager that owns this bucket.
    pub fn manager(&self) -> ManagerId {
        self.manager
    }

    /// Root container.
    pub fn root(&self) -> ContainerId {
        self.policy.root()
    }

    /// True if the bucket is locked and selects nothing.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Orders two candidates along `axes`: the smaller is preferred.
///
/// The primary key is the container center along the scroll axis. With both axes
/// the two per-axis orderings must agree (or one must be a tie), otherwise the
/// primary key is a tie. With no axis there is no primary key. Ties go to the
/// more visible slot.
pub fn compare_by_orientation(a: &Slot, b: &Slot, axes: Axes) -> Ordering {
    let (ca, cb) = (a.token.container_rect.center(), b.token.container_rect.center());
    let vertical = ca.y.total_cmp(&cb.y);
    let horizontal = ca.x.total_cmp(&cb.x);
    let primary = match (
        axes.contains(Axes::VERTICAL),
        axes.contains(Axes::HORIZONTAL),
    ) {
        (true, false) => vertical,
        (false, true) => horizontal,
        (true, true) => match (vertical, horizontal) {
            (v, h) if v == h => v,
            (Ordering::Equal, o) | (o, Ordering::Equal) => o,
            _ => Ordering::Equal,
        },
        (false, false) => Ordering::Equal,
    };
    primary.then_with(|| b.token.area_offset.total_cmp(&a.token.area_offset))
}

/// Picks at most one winner among `candidates`.
///
/// Candidates with a [`Controller`](crate::slot::Controller) win over automatic
/// ones. Among manual candidates the one whose media was started by the user most
/// recently wins (`started_by_user` is ordered oldest first); failing that, the
/// best by [`compare_by_orientation`]. Otherwise the best automatic candidate.
pub fn select_to_play(
    candidates: &[&Slot],
    axes: Axes,
    started_by_user: &[MediaId],
) -> Option<SlotId> {
    let best = |manual: bool| {
        candidates
            .iter()
            .copied()
            .filter(|s| s.is_manual() == manual)
            .min_by(|a, b| compare_by_orientation(a, b, axes))
    };
    let recent = started_by_user.iter().rev().find_map(|media| {
        candidates
            .iter()
            .find(|s| s.is_manual() && s.media == *media)
    });
    recent
        .copied()
        .or_else(|| best(true))
        .or_else(|| best(false))
        .map(|s| s.id)
}
