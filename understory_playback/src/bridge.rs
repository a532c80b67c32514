// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interfaces to the collaborators the arbiter drives but does not implement.
//!
//! ## Overview
//!
//! - [`ContainerTree`]: geometry and attachment of host containers (the live view tree).
//! - [`MediaBridge`]: the media engine of one media unit (prepare, play, pause, reset, release).
//! - [`RendererProvider`]: hands out rendering surfaces when a slot becomes active.
//! - [`ResumeStore`]: key→value persistence of resume positions.
//! - [`Prioritized`]: ordering of managers inside a group.
//! - [`SlotCallback`] / [`SlotListener`]: observers of slot transitions and media state.
//!
//! The arbiter calls these synchronously on the thread that drives it. None of them
//! may call back into the arbiter.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::cmp::Ordering;
use core::time::Duration;

use kurbo::Rect;

use crate::error::MediaError;
use crate::types::{ContainerId, MediaId, RendererHandle, RepeatMode, SlotId};

/// Geometry and attachment queries over the host's container hierarchy.
///
/// All rectangles are in one shared coordinate space (for example window
/// coordinates), except [`drawing_rect`](Self::drawing_rect) which is local.
pub trait ContainerTree {
    /// Returns the parent of `container`, or `None` for a root.
    fn parent_of(&self, container: ContainerId) -> Option<ContainerId>;

    /// Whether the container is currently part of the live tree.
    fn is_attached(&self, container: ContainerId) -> bool;

    /// The visible part of the container after every ancestor clip.
    ///
    /// Returns `None` when nothing of the container is on screen.
    fn visible_rect(&self, container: ContainerId) -> Option<Rect>;

    /// The drawable area of the container in its own coordinates, after its own clip.
    fn drawing_rect(&self, container: ContainerId) -> Rect;

    /// Finds the item of `root` (a list cell, a page) that holds `container`.
    ///
    /// The default walks up the ancestry and returns the ancestor whose parent is
    /// `root`, or `container` itself if it is a direct child.
    fn item_of(&self, root: ContainerId, container: ContainerId) -> Option<ContainerId> {
        let mut cur = container;
        loop {
            let parent = self.parent_of(cur)?;
            if parent == root {
                return Some(cur);
            }
            cur = parent;
        }
    }
}

/// Player state reported by the media engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MediaState {
    /// Nothing loaded.
    Idle,
    /// Waiting for data.
    Buffering {
        /// Playback starts once enough data is buffered.
        play_when_ready: bool,
    },
    /// Data is available.
    Ready {
        /// `true` while playing, `false` while paused.
        play_when_ready: bool,
    },
    /// Reached the end of the media.
    Ended,
}

/// The media engine of one media unit.
///
/// The arbiter decides *when* to call these; it never touches codecs or network.
pub trait MediaBridge {
    /// Allocate resources and load the media, optionally seeking to `resume`.
    fn prepare(&mut self, resume: Option<Duration>, preload: bool);

    /// Start or resume playback.
    fn play(&mut self);

    /// Pause playback.
    fn pause(&mut self);

    /// Drop media-specific state but keep allocated resources.
    fn reset(&mut self, keep_state: bool);

    /// Release every resource held for this unit.
    fn release(&mut self);

    /// Apply the repeat mode configured on the slot.
    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        let _ = mode;
    }

    /// Current position, saved before the unit is released.
    fn resume_position(&self) -> Option<Duration> {
        None
    }
}

/// Supplies rendering surfaces to active slots.
///
/// [`acquire_renderer`](Self::acquire_renderer) is called exactly when a slot becomes
/// active and [`release_renderer`](Self::release_renderer) exactly when it stops being active.
pub trait RendererProvider {
    /// Returns a renderer for the slot, or `None` if none can be provided now.
    fn acquire_renderer(&mut self, slot: SlotId, media: MediaId) -> Option<RendererHandle>;

    /// Takes back a renderer previously handed out for the slot.
    fn release_renderer(&mut self, slot: SlotId, media: MediaId, renderer: RendererHandle);
}

/// Key of a saved resume position: the manager's stable tag plus the media identity.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResumeKey {
    /// Stable tag of the manager that owned the slot.
    pub scope: String,
    /// The media unit.
    pub media: MediaId,
}

/// Persistence of resume positions across releases.
pub trait ResumeStore {
    /// Remember `position` for `key`, replacing any previous value.
    fn save(&mut self, key: ResumeKey, position: Duration);

    /// Take the saved position for `key`, if any.
    fn take(&mut self, key: &ResumeKey) -> Option<Duration>;
}

/// In-memory [`ResumeStore`]; the default store of an [`Arbiter`](crate::Arbiter).
#[derive(Clone, Debug, Default)]
pub struct MemoryResumeStore {
    positions: BTreeMap<ResumeKey, Duration>,
}

impl MemoryResumeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl ResumeStore for MemoryResumeStore {
    fn save(&mut self, key: ResumeKey, position: Duration) {
        self.positions.insert(key, position);
    }

    fn take(&mut self, key: &ResumeKey) -> Option<Duration> {
        self.positions.remove(key)
    }
}

/// Ordering of managers within a group. Higher priority is consulted first.
///
/// Implementations must be antisymmetric: `a.compare(b)` and `b.compare(a)` must
/// cancel out. The arbiter checks both directions and rejects a comparator that
/// does not with [`Error::AsymmetricPriority`](crate::Error::AsymmetricPriority).
pub trait Prioritized: core::fmt::Debug {
    /// Numeric priority used by the default comparison.
    fn priority(&self) -> i32;

    /// Compare against another prioritized host.
    fn compare(&self, other: &dyn Prioritized) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

/// Observer of slot transitions, invoked in registration order.
///
/// Activation is the point where a host typically attaches a renderer or starts
/// a thumbnail; deactivation where it detaches.
pub trait SlotCallback {
    /// The slot was registered into a manager.
    fn on_added(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The slot was unregistered. No further callbacks follow.
    fn on_removed(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The slot's container joined the live tree.
    fn on_attached(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The slot's container left the live tree.
    fn on_detached(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The slot became prepareable.
    fn on_active(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The slot stopped being prepareable.
    fn on_inactive(&mut self, slot: SlotId) {
        let _ = slot;
    }
}

/// Observer of media events on a slot, invoked in registration order.
pub trait SlotListener {
    /// Buffering started; `play_when_ready` tells whether playback follows.
    fn on_buffering(&mut self, slot: SlotId, play_when_ready: bool) {
        let _ = (slot, play_when_ready);
    }

    /// Playback is running.
    fn on_playing(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// Playback is paused.
    fn on_paused(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// Playback reached the end.
    fn on_ended(&mut self, slot: SlotId) {
        let _ = slot;
    }

    /// The engine reported a recoverable failure. Retrying is up to the listener.
    fn on_error(&mut self, slot: SlotId, error: &MediaError) {
        let _ = (slot, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chain;

    // 1 -> 2 -> 3, 2 -> 4
    impl ContainerTree for Chain {
        fn parent_of(&self, container: ContainerId) -> Option<ContainerId> {
            match container.0 {
                2 => Some(ContainerId(1)),
                3 | 4 => Some(ContainerId(2)),
                _ => None,
            }
        }

        fn is_attached(&self, _container: ContainerId) -> bool {
            true
        }

        fn visible_rect(&self, _container: ContainerId) -> Option<Rect> {
            None
        }

        fn drawing_rect(&self, _container: ContainerId) -> Rect {
            Rect::ZERO
        }
    }

    #[test]
    fn item_of_walks_to_direct_child_of_root() {
        assert_eq!(
            Chain.item_of(ContainerId(1), ContainerId(3)),
            Some(ContainerId(2))
        );
        assert_eq!(
            Chain.item_of(ContainerId(2), ContainerId(4)),
            Some(ContainerId(4))
        );
        assert_eq!(
            Chain.item_of(ContainerId(3), ContainerId(4)),
            None,
            "not a descendant"
        );
    }

    #[test]
    fn memory_store_take_consumes() {
        let mut store = MemoryResumeStore::new();
        let key = ResumeKey {
            scope: String::from("feed"),
            media: MediaId(7),
        };
        store.save(key.clone(), Duration::from_secs(12));
        assert_eq!(store.len(), 1);
        assert_eq!(store.take(&key), Some(Duration::from_secs(12)));
        assert!(store.is_empty());
    }

    #[derive(Debug)]
    struct Rank(i32);

    impl Prioritized for Rank {
        fn priority(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn default_priority_compare_is_antisymmetric() {
        let (a, b) = (Rank(3), Rank(9));
        assert_eq!(a.compare(&b) as i8 + b.compare(&a) as i8, 0);
    }
}
