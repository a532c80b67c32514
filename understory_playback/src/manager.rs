// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manager scopes: buckets and slots of one screen region.
//!
//! A manager refreshes the tokens of its slots, moves them between
//! [`Attached`](SlotState::Attached) and [`Active`](SlotState::Active), and then
//! splits its attached slots into a `to_play` set (the winner of the first bucket
//! that selects anything) and a `to_pause` set (everything else).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use tracing::{debug, trace};

use crate::arena::Arena;
use crate::bridge::{ContainerTree, Prioritized, RendererProvider};
use crate::bucket::{Bucket, select_to_play};
use crate::error::{Error, Result};
use crate::memory::MemoryMode;
use crate::slot::{Slot, SlotState};
use crate::token::Token;
use crate::types::{BucketId, ContainerId, GroupId, LifecycleState, ManagerId, MediaId, SlotId};

/// Options for [`Arbiter::add_manager`](crate::Arbiter::add_manager).
pub struct ManagerOptions {
    /// Stable tag of the region; scopes saved resume positions.
    pub tag: String,
    /// Overrides the group's memory mode for slots of this manager.
    pub memory_mode: Option<MemoryMode>,
    /// Lifecycle state from which the manager may play. Below it, every slot is paused.
    pub active_lifecycle: LifecycleState,
    /// Initial host lifecycle state.
    pub lifecycle: LifecycleState,
    /// Orders this manager within its group. Prioritized managers come first.
    pub priority: Option<Box<dyn Prioritized>>,
    /// Hands out renderers when slots become active.
    pub renderer: Option<Box<dyn RendererProvider>>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            tag: String::new(),
            memory_mode: None,
            active_lifecycle: LifecycleState::Started,
            lifecycle: LifecycleState::Resumed,
            priority: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("tag", &self.tag)
            .field("memory_mode", &self.memory_mode)
            .field("active_lifecycle", &self.active_lifecycle)
            .field("lifecycle", &self.lifecycle)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// The outcome of one manager refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Split {
    pub(crate) to_play: Vec<SlotId>,
    pub(crate) to_pause: Vec<SlotId>,
}

/// Buckets and slots of one logical screen region.
pub struct ManagerScope {
    pub(crate) id: ManagerId,
    pub(crate) group: GroupId,
    pub(crate) tag: String,
    pub(crate) memory_mode: Option<MemoryMode>,
    pub(crate) active_lifecycle: LifecycleState,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) priority: Option<Box<dyn Prioritized>>,
    renderer: Option<Box<dyn RendererProvider>>,
    pub(crate) buckets: Vec<BucketId>,
    pub(crate) sticky_bucket: Option<BucketId>,
    pub(crate) slots: BTreeMap<ContainerId, SlotId>,
    pub(crate) locked: bool,
}

impl fmt::Debug for ManagerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerScope")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("tag", &self.tag)
            .field("lifecycle", &self.lifecycle)
            .field("buckets", &self.buckets)
            .field("sticky_bucket", &self.sticky_bucket)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl ManagerScope {
    pub(crate) fn new(id: ManagerId, group: GroupId, options: ManagerOptions) -> Self {
        Self {
            id,
            group,
            tag: options.tag,
            memory_mode: options.memory_mode,
            active_lifecycle: options.active_lifecycle,
            lifecycle: options.lifecycle,
            priority: options.priority,
            renderer: options.renderer,
            buckets: Vec::new(),
            sticky_bucket: None,
            slots: BTreeMap::new(),
            locked: false,
        }
    }

    /// Handle of this manager.
    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// The owning group.
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Stable tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Current host lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Buckets in precedence order: the sticky bucket, then registration order.
    pub fn buckets(&self) -> impl Iterator<Item = BucketId> + '_ {
        self.sticky_bucket.into_iter().chain(
            self.buckets
                .iter()
                .copied()
                .filter(move |b| Some(*b) != self.sticky_bucket),
        )
    }

    /// Slots keyed by container.
    pub fn slots(&self) -> impl Iterator<Item = (ContainerId, SlotId)> + '_ {
        self.slots.iter().map(|(c, s)| (*c, *s))
    }

    /// True if the manager is locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn activate(&mut self, slot: &mut Slot) -> Result<()> {
        slot.on_active()?;
        if let Some(renderer) = &mut self.renderer {
            slot.renderer = renderer.acquire_renderer(slot.id, slot.media);
        }
        Ok(())
    }

    pub(crate) fn deactivate(&mut self, slot: &mut Slot) -> Result<()> {
        slot.on_inactive()?;
        if let Some(handle) = slot.renderer.take()
            && let Some(renderer) = &mut self.renderer
        {
            renderer.release_renderer(slot.id, slot.media, handle);
        }
        Ok(())
    }

    /// Walks a slot down to [`Added`](SlotState::Added) through every intermediate state.
    pub(crate) fn detach(&mut self, slot: &mut Slot) -> Result<()> {
        if slot.state == SlotState::Active {
            self.deactivate(slot)?;
        }
        if slot.state == SlotState::Attached {
            slot.on_detached()?;
        }
        Ok(())
    }

    /// Recomputes tokens and activation, then splits attached slots.
    ///
    /// `inherited_lock` is the lock state of the enclosing group.
    pub(crate) fn split(
        &mut self,
        slots: &mut Arena<SlotId, Slot>,
        buckets: &Arena<BucketId, Bucket>,
        tree: &dyn ContainerTree,
        started_by_user: &[MediaId],
        inherited_lock: bool,
    ) -> Result<Split> {
        let ids: Vec<SlotId> = self.slots.values().copied().collect();
        for &id in &ids {
            let slot = slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
            if slot.state == SlotState::Added && tree.is_attached(slot.container) {
                debug!(slot = ?id, "attached without notification");
                slot.on_attached()?;
            }
            slot.token = if slot.is_attached() {
                Token::compute(tree, slot.container, self.lifecycle, slot.config.threshold)
            } else {
                Token::inactive(slot.config.threshold)
            };
            trace!(slot = ?id, offset = slot.token.area_offset, "token");
            let prepare = slot.token.should_prepare();
            if prepare && slot.state == SlotState::Attached {
                self.activate(slot)?;
            } else if !prepare && slot.state == SlotState::Active {
                self.deactivate(slot)?;
            }
        }

        let attached: Vec<&Slot> = ids
            .iter()
            .filter_map(|id| slots.get(*id))
            .filter(|s| s.is_attached())
            .collect();
        let locked = inherited_lock || self.locked;
        let mut winner = None;
        if !locked {
            for bucket_id in self.buckets() {
                let Some(bucket) = buckets.get(bucket_id) else {
                    continue;
                };
                if bucket.locked {
                    continue;
                }
                let candidates: Vec<&Slot> = attached
                    .iter()
                    .copied()
                    .filter(|s| s.bucket == bucket_id && bucket.policy.allow_to_play(tree, s))
                    .collect();
                if candidates.is_empty() {
                    continue;
                }
                let axes = bucket.policy.orientation(tree);
                winner = select_to_play(&candidates, axes, started_by_user);
                if winner.is_some() {
                    break;
                }
            }
        }

        let mut split = Split::default();
        split.to_play.extend(winner);
        split.to_pause.extend(
            attached
                .iter()
                .map(|s| s.id)
                .filter(|id| Some(*id) != winner),
        );
        if locked || self.lifecycle < self.active_lifecycle {
            split.to_pause.append(&mut split.to_play);
        }
        debug!(manager = ?self.id, to_play = ?split.to_play, to_pause = split.to_pause.len(), "split");
        Ok(split)
    }
}
