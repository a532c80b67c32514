// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The arbiter: the explicitly constructed root of every scope.
//!
//! ## Flow
//!
//! Host events (attach, detach, layout, scroll, lifecycle, user requests)
//! never refresh synchronously. They schedule a refresh of the affected group
//! [`ArbiterConfig::refresh_delay`] after the current time; a new request
//! replaces a pending one, so bursts coalesce into one refresh.
//!
//! [`Arbiter::advance`] moves virtual time forward and runs whatever came due,
//! earliest first: group refreshes and delayed starts of media units.
//!
//! A group refresh:
//! 1. splits every manager (sticky first, then by priority) into `to_play`
//!    and `to_pause`;
//! 2. selects the first unlocked `to_play` slot, unless the group is locked or
//!    below [`Started`](LifecycleState::Started);
//! 3. ranks the distance of every slot to the selection and applies the
//!    memory policy to every slot whose distance changed;
//! 4. pauses `(old selection ∪ to_pause ∪ to_play) − selection` and plays the
//!    selection through the dispatcher.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::time::Duration;

use tracing::{debug, debug_span, warn};

use crate::arena::Arena;
use crate::bridge::{
    ContainerTree, MediaBridge, MediaState, MemoryResumeStore, ResumeKey, ResumeStore,
    SlotCallback, SlotListener,
};
use crate::bucket::{Bucket, BucketPolicy};
use crate::dispatcher::{Dispatcher, UserAction};
use crate::error::{Error, MediaError, Result};
use crate::group::{GroupConfig, GroupScope, rank_distances};
use crate::manager::{ManagerOptions, ManagerScope};
use crate::memory::{MemoryAction, MemoryMode, memory_action};
use crate::playable::{MediaStatus, Playable};
use crate::slot::{Controller, INACTIVE_DISTANCE, Slot, SlotConfig, SlotState};
use crate::timer::Timers;
use crate::types::{
    BucketId, ContainerId, GroupId, LifecycleState, ManagerId, MediaId, SlotId,
};

/// Arbiter-wide configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArbiterConfig {
    /// Debounce delay between a host event and the refresh it triggers.
    pub refresh_delay: Duration,
    /// Memory mode of groups and managers that do not set their own.
    pub memory_mode: MemoryMode,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_millis(33),
            memory_mode: MemoryMode::default(),
        }
    }
}

/// What [`Arbiter::lock`] and [`Arbiter::unlock`] apply to.
///
/// Locks are inherited downward: a locked group locks its managers, a locked
/// manager its buckets. Unlocking a child does not override a parent's lock.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LockTarget {
    /// Every group.
    Global,
    /// One group: it selects nothing.
    Group(GroupId),
    /// One manager: it reports nothing to play.
    Manager(ManagerId),
    /// One bucket: it selects nothing.
    Bucket(BucketId),
    /// One slot: it is never selected.
    Slot(SlotId),
}

/// A media unit to bind to a container, built up before [`Arbiter::bind`].
pub struct Binding {
    media: MediaId,
    container: ContainerId,
    config: SlotConfig,
    callbacks: Vec<Box<dyn SlotCallback>>,
    listeners: Vec<Box<dyn SlotListener>>,
}

impl core::fmt::Debug for Binding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Binding")
            .field("media", &self.media)
            .field("container", &self.container)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Binding {
    /// Bind `media` to `container` with the default [`SlotConfig`].
    pub fn new(media: MediaId, container: ContainerId) -> Self {
        Self {
            media,
            container,
            config: SlotConfig::default(),
            callbacks: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Use `config` for the slot.
    pub fn with_config(mut self, config: SlotConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a transition callback. Callbacks fire in registration order.
    pub fn with_callback(mut self, callback: Box<dyn SlotCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Register a media listener. Listeners fire in registration order.
    pub fn with_listener(mut self, listener: Box<dyn SlotListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

/// The root of all playback scopes.
pub struct Arbiter {
    config: ArbiterConfig,
    groups: Arena<GroupId, GroupScope>,
    managers: Arena<ManagerId, ManagerScope>,
    buckets: Arena<BucketId, Bucket>,
    slots: Arena<SlotId, Slot>,
    containers: BTreeMap<ContainerId, SlotId>,
    dispatcher: Dispatcher,
    refreshes: Timers<GroupId>,
    resume_store: Box<dyn ResumeStore>,
    now: Duration,
    locked: bool,
}

impl core::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arbiter")
            .field("config", &self.config)
            .field("groups", &self.groups)
            .field("managers", &self.managers)
            .field("buckets", &self.buckets)
            .field("slots", &self.slots)
            .field("now", &self.now)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new(ArbiterConfig::default())
    }
}

impl Arbiter {
    /// Create an arbiter with an in-memory resume store.
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_resume_store(config, Box::new(MemoryResumeStore::new()))
    }

    /// Create an arbiter persisting resume positions in `store`.
    pub fn with_resume_store(config: ArbiterConfig, store: Box<dyn ResumeStore>) -> Self {
        Self {
            config,
            groups: Arena::default(),
            managers: Arena::default(),
            buckets: Arena::default(),
            slots: Arena::default(),
            containers: BTreeMap::new(),
            dispatcher: Dispatcher::default(),
            refreshes: Timers::new(),
            resume_store: store,
            now: Duration::ZERO,
            locked: false,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    // --- time ---

    /// The latest time passed to [`advance`](Self::advance).
    pub fn now(&self) -> Duration {
        self.now
    }

    /// When [`advance`](Self::advance) next has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.refreshes.next_deadline(), self.dispatcher.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Move time to `now` and run every refresh and delayed start due by then.
    ///
    /// Time never goes backwards; an earlier `now` is treated as the current time.
    pub fn advance(&mut self, now: Duration, tree: &dyn ContainerTree) -> Result<()> {
        self.now = self.now.max(now);
        loop {
            let refresh = self.refreshes.next_deadline().filter(|d| *d <= self.now);
            let start = self.dispatcher.next_deadline().filter(|d| *d <= self.now);
            match (refresh, start) {
                (Some(r), s) if s.is_none_or(|s| r <= s) => {
                    if let Some(group) = self.refreshes.pop_due(r) {
                        self.refresh_group(group, tree)?;
                    }
                }
                (_, Some(s)) => {
                    if let Some(media) = self.dispatcher.pop_due(s) {
                        self.fire_start(media);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn fire_start(&mut self, media: MediaId) {
        let Some(slot) = self.bound_slot(media).filter(|s| s.is_active()) else {
            debug!(?media, "delayed start dropped: slot not active");
            return;
        };
        let (preload, repeat) = (slot.config.preload, slot.config.repeat_mode);
        debug!(?media, "delayed start fired");
        self.dispatcher.fire(media, preload, repeat);
    }

    fn request_refresh(&mut self, group: GroupId) {
        if self.groups.contains(group) {
            self.refreshes.schedule(group, self.now + self.config.refresh_delay);
        }
    }

    // --- structure ---

    /// Create a group.
    pub fn add_group(&mut self, config: GroupConfig) -> GroupId {
        let id = self.groups.insert_with(|id| GroupScope::new(id, config));
        debug!(group = ?id, "group added");
        id
    }

    /// Tear down a group with all of its managers.
    pub fn remove_group(&mut self, group: GroupId) -> Result<()> {
        let managers: Vec<ManagerId> = self.group_ref(group)?.managers.clone();
        for manager in managers {
            self.remove_manager(manager)?;
        }
        self.refreshes.cancel(group);
        self.groups.remove(group);
        debug!(?group, "group removed");
        Ok(())
    }

    /// Create a manager in `group`.
    ///
    /// Fails with [`Error::AsymmetricPriority`] if its priority comparator is
    /// inconsistent with one already registered; the manager is not added.
    pub fn add_manager(&mut self, group: GroupId, options: ManagerOptions) -> Result<ManagerId> {
        self.group_ref(group)?;
        let id = self
            .managers
            .insert_with(|id| ManagerScope::new(id, group, options));
        let inserted = match self.groups.get_mut(group) {
            Some(g) => g.insert_manager(id, &self.managers),
            None => Err(Error::UnknownGroup(group)),
        };
        if let Err(err) = inserted {
            self.managers.remove(id);
            return Err(err);
        }
        debug!(manager = ?id, ?group, "manager added");
        self.request_refresh(group);
        Ok(id)
    }

    /// Tear down a manager: unbind its slots and drop its buckets.
    pub fn remove_manager(&mut self, manager: ManagerId) -> Result<()> {
        let m = self.manager_ref(manager)?;
        let group = m.group;
        let slots: Vec<SlotId> = m.slots.values().copied().collect();
        let buckets = m.buckets.clone();
        for slot in slots {
            self.remove_slot(slot, false)?;
        }
        for bucket in buckets {
            self.buckets.remove(bucket);
        }
        if let Some(g) = self.groups.get_mut(group) {
            g.remove_manager(manager);
        }
        self.managers.remove(manager);
        debug!(?manager, "manager removed");
        self.request_refresh(group);
        Ok(())
    }

    /// Register a bucket. Registering a second bucket with the same root returns
    /// the existing one.
    pub fn add_bucket(
        &mut self,
        manager: ManagerId,
        policy: Box<dyn BucketPolicy>,
    ) -> Result<BucketId> {
        let root = policy.root();
        let m = self.manager_ref(manager)?;
        let group = m.group;
        if let Some(existing) = m
            .buckets
            .iter()
            .copied()
            .find(|b| self.buckets.get(*b).is_some_and(|b| b.root() == root))
        {
            return Ok(existing);
        }
        let id = self.buckets.insert_with(|id| Bucket {
            id,
            manager,
            policy,
            locked: false,
        });
        self.manager_mut(manager)?.buckets.push(id);
        debug!(bucket = ?id, ?manager, ?root, "bucket added");
        self.request_refresh(group);
        Ok(id)
    }

    /// Remove a bucket and unbind its slots.
    pub fn remove_bucket(&mut self, bucket: BucketId) -> Result<()> {
        let manager = self.bucket_ref(bucket)?.manager;
        let m = self.manager_ref(manager)?;
        let group = m.group;
        let doomed: Vec<SlotId> = m
            .slots
            .values()
            .copied()
            .filter(|s| self.slots.get(*s).is_some_and(|s| s.bucket == bucket))
            .collect();
        for slot in doomed {
            self.remove_slot(slot, false)?;
        }
        let m = self.manager_mut(manager)?;
        m.buckets.retain(|b| *b != bucket);
        if m.sticky_bucket == Some(bucket) {
            m.sticky_bucket = None;
        }
        self.buckets.remove(bucket);
        self.request_refresh(group);
        Ok(())
    }

    /// Register a media unit with its engine bridge.
    pub fn add_media(&mut self, media: MediaId, bridge: Box<dyn MediaBridge>) -> Result<()> {
        if self.dispatcher.playables.contains_key(&media) {
            return Err(Error::DuplicateMedia(media));
        }
        self.dispatcher
            .playables
            .insert(media, Playable::new(media, bridge));
        Ok(())
    }

    /// Unbind and release a media unit and return its bridge.
    pub fn remove_media(&mut self, media: MediaId) -> Result<Box<dyn MediaBridge>> {
        let slot = self.playable_ref(media)?.slot;
        if let Some(slot) = slot {
            self.remove_slot(slot, false)?;
        }
        self.dispatcher.forget(media);
        let mut playable = self
            .dispatcher
            .playables
            .remove(&media)
            .ok_or(Error::UnknownMedia(media))?;
        playable.release();
        Ok(playable.bridge)
    }

    /// Bind a media unit to a container of `manager`.
    ///
    /// An existing slot on the container (same manager) or of the media unit is
    /// removed first, so its `on_removed` fires before the new slot's `on_added`.
    /// The media unit keeps its bridge across the move.
    pub fn bind(
        &mut self,
        tree: &dyn ContainerTree,
        manager: ManagerId,
        binding: Binding,
    ) -> Result<SlotId> {
        let Binding {
            media,
            container,
            config,
            callbacks,
            listeners,
        } = binding;
        self.playable_ref(media)?;
        let m = self.manager_ref(manager)?;
        let group = m.group;
        let bucket = m
            .buckets()
            .find(|b| {
                self.buckets
                    .get(*b)
                    .is_some_and(|b| b.policy.accepts(tree, container))
            })
            .ok_or(Error::MissingBucket { manager, container })?;

        if let Some(&existing) = self.containers.get(&container) {
            let owner = self.slot_ref(existing)?.manager;
            if owner != manager {
                return Err(Error::ContainerAlreadyBound {
                    container,
                    slot: existing,
                });
            }
            let rebinding = self.slot_ref(existing)?.media == media;
            self.remove_slot(existing, rebinding)?;
        }
        if let Some(previous) = self.dispatcher.playables.get(&media).and_then(|p| p.slot) {
            self.remove_slot(previous, true)?;
        }

        let id = self
            .slots
            .insert_with(|id| Slot::new(id, media, container, bucket, manager, config));
        let slot = self.slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
        for callback in callbacks {
            slot.add_callback(callback);
        }
        for listener in listeners {
            slot.add_listener(listener);
        }
        slot.on_added()?;
        if tree.is_attached(container) {
            slot.on_attached()?;
        }
        self.manager_mut(manager)?.slots.insert(container, id);
        self.containers.insert(container, id);
        if let Some(p) = self.dispatcher.playables.get_mut(&media) {
            p.slot = Some(id);
        }
        debug!(slot = ?id, ?media, ?container, ?bucket, "bound");
        self.request_refresh(group);
        Ok(id)
    }

    /// Remove a slot. The media unit is paused and released.
    pub fn unbind(&mut self, slot: SlotId) -> Result<()> {
        self.slot_ref(slot)?;
        self.remove_slot(slot, false)
    }

    /// Walks the slot to `Removed` and drops it. With `rebinding`, the media
    /// unit is about to move to another slot and keeps its resources.
    fn remove_slot(&mut self, id: SlotId, rebinding: bool) -> Result<()> {
        let (manager, container, media) = {
            let s = self.slot_ref(id)?;
            (s.manager, s.container, s.media)
        };
        let m = self.managers.get_mut(manager).ok_or(Error::UnknownManager(manager))?;
        let group = m.group;
        let slot = self.slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
        m.detach(slot)?;
        slot.on_removed()?;
        m.slots.remove(&container);
        self.slots.remove(id);
        if self.containers.get(&container) == Some(&id) {
            self.containers.remove(&container);
        }
        if let Some(g) = self.groups.get_mut(group)
            && g.selection == Some(id)
        {
            g.selection = None;
        }
        let owned = self
            .dispatcher
            .playables
            .get(&media)
            .is_some_and(|p| p.slot == Some(id));
        if owned {
            if !rebinding {
                self.dispatcher.cancel_start(media);
            }
            let scope = self
                .managers
                .get(manager)
                .map(|m| m.tag.clone())
                .unwrap_or_default();
            if let Some(p) = self.dispatcher.playables.get_mut(&media) {
                p.slot = None;
                if !rebinding {
                    p.pause();
                    if let Some(position) = p.release() {
                        self.resume_store.save(ResumeKey { scope, media }, position);
                    }
                }
            }
        }
        debug!(slot = ?id, ?media, rebinding, "unbound");
        self.request_refresh(group);
        Ok(())
    }

    /// Promote a bucket to the front of its manager's precedence.
    pub fn stick_bucket(&mut self, bucket: BucketId) -> Result<()> {
        let manager = self.bucket_ref(bucket)?.manager;
        let m = self.manager_mut(manager)?;
        m.sticky_bucket = Some(bucket);
        let group = m.group;
        self.request_refresh(group);
        Ok(())
    }

    /// Undo [`stick_bucket`](Self::stick_bucket).
    pub fn unstick_bucket(&mut self, bucket: BucketId) -> Result<()> {
        let manager = self.bucket_ref(bucket)?.manager;
        let m = self.manager_mut(manager)?;
        if m.sticky_bucket == Some(bucket) {
            m.sticky_bucket = None;
        }
        let group = m.group;
        self.request_refresh(group);
        Ok(())
    }

    /// Promote a manager to the front of its group's precedence.
    pub fn stick_manager(&mut self, manager: ManagerId) -> Result<()> {
        let group = self.manager_ref(manager)?.group;
        self.group_mut(group)?.sticky = Some(manager);
        self.request_refresh(group);
        Ok(())
    }

    /// Undo [`stick_manager`](Self::stick_manager).
    pub fn unstick_manager(&mut self, manager: ManagerId) -> Result<()> {
        let group = self.manager_ref(manager)?.group;
        let g = self.group_mut(group)?;
        if g.sticky == Some(manager) {
            g.sticky = None;
        }
        self.request_refresh(group);
        Ok(())
    }

    /// Lock a scope. See [`LockTarget`].
    pub fn lock(&mut self, target: LockTarget) -> Result<()> {
        self.set_lock(target, true)
    }

    /// Unlock a scope. See [`LockTarget`].
    pub fn unlock(&mut self, target: LockTarget) -> Result<()> {
        self.set_lock(target, false)
    }

    fn set_lock(&mut self, target: LockTarget, locked: bool) -> Result<()> {
        debug!(?target, locked, "lock");
        let group = match target {
            LockTarget::Global => {
                self.locked = locked;
                let groups: Vec<GroupId> = self.groups.iter().map(|(id, _)| id).collect();
                for group in groups {
                    self.request_refresh(group);
                }
                return Ok(());
            }
            LockTarget::Group(group) => {
                self.group_mut(group)?.locked = locked;
                group
            }
            LockTarget::Manager(manager) => {
                let m = self.manager_mut(manager)?;
                m.locked = locked;
                m.group
            }
            LockTarget::Bucket(bucket) => {
                let b = self.buckets.get_mut(bucket).ok_or(Error::UnknownBucket(bucket))?;
                b.locked = locked;
                let manager = b.manager;
                self.manager_ref(manager)?.group
            }
            LockTarget::Slot(slot) => {
                let s = self.slots.get_mut(slot).ok_or(Error::UnknownSlot(slot))?;
                s.locked = locked;
                let manager = s.manager;
                self.manager_ref(manager)?.group
            }
        };
        self.request_refresh(group);
        Ok(())
    }

    // --- host events ---

    /// The container joined the live tree.
    pub fn on_container_attached(&mut self, container: ContainerId) -> Result<()> {
        let Some(&id) = self.containers.get(&container) else {
            return self.on_container_scrolled(container);
        };
        let slot = self.slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
        if slot.state == SlotState::Added {
            slot.on_attached()?;
        }
        let manager = slot.manager;
        self.refresh_manager_group(manager)
    }

    /// The container left the live tree.
    pub fn on_container_detached(&mut self, container: ContainerId) -> Result<()> {
        let Some(&id) = self.containers.get(&container) else {
            return self.on_container_scrolled(container);
        };
        let manager = self.slot_ref(id)?.manager;
        let m = self.managers.get_mut(manager).ok_or(Error::UnknownManager(manager))?;
        let slot = self.slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
        m.detach(slot)?;
        let media = slot.media;
        self.cancel_start_of(id, media);
        self.refresh_manager_group(manager)
    }

    /// The container moved or resized.
    pub fn on_container_layout_changed(&mut self, container: ContainerId) -> Result<()> {
        self.on_container_scrolled(container)
    }

    /// A bucket root scrolled, a pager changed page, or a bound container moved.
    ///
    /// Containers the arbiter does not know are ignored.
    pub fn on_container_scrolled(&mut self, container: ContainerId) -> Result<()> {
        if let Some(&id) = self.containers.get(&container) {
            let manager = self.slot_ref(id)?.manager;
            return self.refresh_manager_group(manager);
        }
        let groups: Vec<GroupId> = self
            .buckets
            .iter()
            .filter(|(_, b)| b.root() == container)
            .filter_map(|(_, b)| self.managers.get(b.manager).map(|m| m.group))
            .collect();
        for group in groups {
            self.request_refresh(group);
        }
        Ok(())
    }

    /// Host lifecycle of a manager changed.
    ///
    /// Below [`Started`](LifecycleState::Started) active slots are deactivated at
    /// once and lose their delayed starts;
    /// [`Destroyed`](LifecycleState::Destroyed) removes the manager.
    pub fn on_lifecycle_changed(&mut self, manager: ManagerId, state: LifecycleState) -> Result<()> {
        if state == LifecycleState::Destroyed {
            return self.remove_manager(manager);
        }
        let m = self.managers.get_mut(manager).ok_or(Error::UnknownManager(manager))?;
        debug!(?manager, from = ?m.lifecycle, to = ?state, "manager lifecycle");
        m.lifecycle = state;
        if state < LifecycleState::Started {
            let ids: Vec<SlotId> = m.slots.values().copied().collect();
            let mut deactivated = Vec::new();
            for id in ids {
                if let Some(slot) = self.slots.get_mut(id)
                    && slot.is_active()
                {
                    m.deactivate(slot)?;
                    deactivated.push((id, slot.media));
                }
            }
            for (id, media) in deactivated {
                self.cancel_start_of(id, media);
            }
        }
        let group = self.manager_ref(manager)?.group;
        self.request_refresh(group);
        Ok(())
    }

    /// Host lifecycle of a group changed.
    ///
    /// Below [`Started`](LifecycleState::Started) the pending refresh and every
    /// delayed start of the group are cancelled, the selection is paused and
    /// distances are re-ranked without it;
    /// [`Destroyed`](LifecycleState::Destroyed) removes the group.
    pub fn on_group_lifecycle_changed(&mut self, group: GroupId, state: LifecycleState) -> Result<()> {
        if state == LifecycleState::Destroyed {
            return self.remove_group(group);
        }
        let g = self.group_mut(group)?;
        debug!(?group, from = ?g.lifecycle, to = ?state, "group lifecycle");
        g.lifecycle = state;
        let selection = if state < LifecycleState::Started {
            g.selection.take()
        } else {
            self.request_refresh(group);
            return Ok(());
        };
        self.refreshes.cancel(group);
        for media in self.group_media(group) {
            self.dispatcher.cancel_start(media);
        }
        if let Some(slot) = selection.and_then(|s| self.slots.get(s)) {
            self.dispatcher.pause(slot, true);
        }
        self.apply_distances(group, None)
    }

    /// The engine of `media` reports a new state; forwarded to the slot's listeners.
    pub fn on_media_state_changed(&mut self, media: MediaId, state: MediaState) -> Result<()> {
        let playable = self
            .dispatcher
            .playables
            .get_mut(&media)
            .ok_or(Error::UnknownMedia(media))?;
        playable.on_state_changed(state);
        let Some(slot) = playable.slot.and_then(|s| self.slots.get_mut(s)) else {
            return Ok(());
        };
        let id = slot.id;
        for listener in &mut slot.listeners {
            match state {
                MediaState::Idle => {}
                MediaState::Buffering { play_when_ready } => {
                    listener.on_buffering(id, play_when_ready);
                }
                MediaState::Ready {
                    play_when_ready: true,
                } => listener.on_playing(id),
                MediaState::Ready {
                    play_when_ready: false,
                } => listener.on_paused(id),
                MediaState::Ended => listener.on_ended(id),
            }
        }
        Ok(())
    }

    /// The engine of `media` failed. The error is forwarded to the slot's
    /// listeners; nothing is retried.
    pub fn on_media_error(&mut self, media: MediaId, error: &MediaError) -> Result<()> {
        let playable = self
            .dispatcher
            .playables
            .get_mut(&media)
            .ok_or(Error::UnknownMedia(media))?;
        warn!(?media, %error, "media error");
        playable.playing = false;
        let Some(slot) = playable.slot.and_then(|s| self.slots.get_mut(s)) else {
            return Ok(());
        };
        let id = slot.id;
        for listener in &mut slot.listeners {
            listener.on_error(id, error);
        }
        Ok(())
    }

    // --- user requests ---

    /// The user asked `media` to play. Only units with a controller are affected.
    pub fn play(&mut self, media: MediaId) -> Result<()> {
        let (controller, manager) = self.user_target(media)?;
        if self.dispatcher.request_play(media, controller)
            && let Some(manager) = manager
        {
            self.refresh_manager_group(manager)?;
        }
        Ok(())
    }

    /// The user asked `media` to pause. Only units with a controller are affected.
    pub fn pause(&mut self, media: MediaId) -> Result<()> {
        let (controller, manager) = self.user_target(media)?;
        if self.dispatcher.request_pause(media, controller)
            && let Some(manager) = manager
        {
            self.refresh_manager_group(manager)?;
        }
        Ok(())
    }

    fn user_target(
        &self,
        media: MediaId,
    ) -> Result<(Option<Controller>, Option<ManagerId>)> {
        let slot = self.playable_ref(media)?.slot.and_then(|s| self.slots.get(s));
        Ok((
            slot.and_then(|s| s.config.controller),
            slot.map(|s| s.manager),
        ))
    }

    // --- queries ---

    /// A slot by handle.
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// The slot bound to `container`.
    pub fn slot_for_container(&self, container: ContainerId) -> Option<SlotId> {
        self.containers.get(&container).copied()
    }

    /// A group by handle.
    pub fn group(&self, id: GroupId) -> Option<&GroupScope> {
        self.groups.get(id)
    }

    /// A manager by handle.
    pub fn manager(&self, id: ManagerId) -> Option<&ManagerScope> {
        self.managers.get(id)
    }

    /// A bucket by handle.
    pub fn bucket(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(id)
    }

    /// The current selection of `group`.
    pub fn selection(&self, group: GroupId) -> Option<SlotId> {
        self.groups.get(group).and_then(|g| g.selection)
    }

    /// Status of a media unit.
    pub fn media_status(&self, media: MediaId) -> Option<MediaStatus> {
        self.dispatcher.status(media)
    }

    /// The last explicit user request for `media`.
    pub fn pending_action(&self, media: MediaId) -> Option<UserAction> {
        self.dispatcher.pending_action(media)
    }

    /// Number of live slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    // --- refresh ---

    fn refresh_manager_group(&mut self, manager: ManagerId) -> Result<()> {
        let group = self.manager_ref(manager)?.group;
        self.request_refresh(group);
        Ok(())
    }

    fn refresh_group(&mut self, group_id: GroupId, tree: &dyn ContainerTree) -> Result<()> {
        let Some(group) = self.groups.get(group_id) else {
            return Ok(());
        };
        let _span = debug_span!("refresh", group = ?group_id).entered();
        let group_locked = self.locked || group.locked;
        let group_playable = !group_locked && group.lifecycle >= LifecycleState::Started;
        let order: Vec<ManagerId> = group.managers().collect();
        let old = group.selection;

        let mut to_play = Vec::new();
        let mut to_pause = Vec::new();
        for manager in &order {
            let Some(m) = self.managers.get_mut(*manager) else {
                continue;
            };
            let split = m.split(
                &mut self.slots,
                &self.buckets,
                tree,
                self.dispatcher.started_by_user(),
                group_locked,
            )?;
            to_play.extend(split.to_play);
            to_pause.extend(split.to_pause);
        }

        let selection = if group_playable {
            to_play.iter().copied().find(|s| !self.is_slot_locked(*s))
        } else {
            None
        };
        debug!(?selection, candidates = to_play.len(), "selection");

        self.apply_distances(group_id, selection)?;

        self.group_mut(group_id)?.selection = selection;
        let any_selection = self.groups.iter().any(|(_, g)| g.selection.is_some());
        let mut pause: Vec<SlotId> = Vec::new();
        for id in old.into_iter().chain(to_pause).chain(to_play) {
            if Some(id) != selection && !pause.contains(&id) {
                pause.push(id);
            }
        }
        for id in pause {
            if let Some(slot) = self.slots.get(id) {
                self.dispatcher.pause(slot, any_selection);
            }
        }
        if let Some(slot) = selection.and_then(|s| self.slots.get(s)) {
            self.dispatcher.play(slot, self.now);
        }
        Ok(())
    }

    /// Ranks every slot of the group around `selection` and runs the memory hook.
    fn apply_distances(&mut self, group_id: GroupId, selection: Option<SlotId>) -> Result<()> {
        let slot_ids: Vec<SlotId> = self
            .group_ref(group_id)?
            .managers()
            .filter_map(|m| self.managers.get(m))
            .flat_map(|m| m.slots.values().copied())
            .collect();
        let ranked = {
            let refs: Vec<&Slot> = slot_ids.iter().filter_map(|s| self.slots.get(*s)).collect();
            rank_distances(selection, &refs)
        };
        // Releases first, so resources are free before the selection prepares.
        let (released, kept): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .partition(|(_, d)| *d == INACTIVE_DISTANCE);
        for (id, distance) in released.into_iter().chain(kept) {
            self.set_distance(group_id, id, distance)?;
        }
        Ok(())
    }

    fn set_distance(&mut self, group: GroupId, id: SlotId, distance: u32) -> Result<()> {
        let slot = self.slots.get_mut(id).ok_or(Error::UnknownSlot(id))?;
        let from = slot.distance;
        if from == distance {
            return Ok(());
        }
        slot.distance = distance;
        let (media, manager) = (slot.media, slot.manager);
        let (preload, repeat) = (slot.config.preload, slot.config.repeat_mode);

        let m = self.manager_ref(manager)?;
        let mode = m
            .memory_mode
            .or_else(|| self.groups.get(group).and_then(|g| g.memory_mode))
            .unwrap_or(self.config.memory_mode);
        let key = ResumeKey {
            scope: m.tag.clone(),
            media,
        };
        let action = memory_action(mode, distance);
        debug!(slot = ?id, ?media, from, to = distance, ?mode, ?action, "distance changed");

        let Some(playable) = self.dispatcher.playables.get_mut(&media) else {
            return Ok(());
        };
        if playable.slot != Some(id) {
            return Ok(());
        }
        match action {
            MemoryAction::Prepare => {
                let resume = self.resume_store.take(&key);
                playable.prepare(resume, preload, repeat);
            }
            MemoryAction::Reset => playable.reset(),
            MemoryAction::Keep => {}
            MemoryAction::Release => {
                if let Some(position) = playable.release() {
                    self.resume_store.save(key, position);
                }
                self.dispatcher.cancel_start(media);
            }
        }
        Ok(())
    }

    fn is_slot_locked(&self, id: SlotId) -> bool {
        let Some(slot) = self.slots.get(id) else {
            return true;
        };
        slot.locked
            || self.buckets.get(slot.bucket).is_some_and(|b| b.locked)
            || self.managers.get(slot.manager).is_some_and(|m| m.locked)
    }

    fn group_media(&self, group: GroupId) -> Vec<MediaId> {
        self.slots
            .iter()
            .filter(|(_, s)| {
                self.managers
                    .get(s.manager)
                    .is_some_and(|m| m.group == group)
            })
            .map(|(_, s)| s.media)
            .collect()
    }

    /// Cancels the delayed start of `media` if it is still bound to `slot`.
    fn cancel_start_of(&mut self, slot: SlotId, media: MediaId) {
        let owned = self
            .dispatcher
            .playables
            .get(&media)
            .is_some_and(|p| p.slot == Some(slot));
        if owned && self.dispatcher.cancel_start(media) {
            debug!(?slot, ?media, "delayed start cancelled");
        }
    }

    fn bound_slot(&self, media: MediaId) -> Option<&Slot> {
        let slot = self.dispatcher.playables.get(&media)?.slot?;
        self.slots.get(slot)
    }

    // --- lookups ---

    fn group_ref(&self, id: GroupId) -> Result<&GroupScope> {
        self.groups.get(id).ok_or(Error::UnknownGroup(id))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut GroupScope> {
        self.groups.get_mut(id).ok_or(Error::UnknownGroup(id))
    }

    fn manager_ref(&self, id: ManagerId) -> Result<&ManagerScope> {
        self.managers.get(id).ok_or(Error::UnknownManager(id))
    }

    fn manager_mut(&mut self, id: ManagerId) -> Result<&mut ManagerScope> {
        self.managers.get_mut(id).ok_or(Error::UnknownManager(id))
    }

    fn bucket_ref(&self, id: BucketId) -> Result<&Bucket> {
        self.buckets.get(id).ok_or(Error::UnknownBucket(id))
    }

    fn slot_ref(&self, id: SlotId) -> Result<&Slot> {
        self.slots.get(id).ok_or(Error::UnknownSlot(id))
    }

    fn playable_ref(&self, media: MediaId) -> Result<&Playable> {
        self.dispatcher
            .playables
            .get(&media)
            .ok_or(Error::UnknownMedia(media))
    }
}
