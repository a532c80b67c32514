// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slots: one media unit bound to one container, and their state machine.
//!
//! ## States
//!
//! ```text
//! Created ─added─▶ Added ─attached─▶ Attached ─active─▶ Active
//!                  │  ▲                │  ▲                │
//!                  │  └────detached────┘  └────inactive────┘
//!                  └─removed─▶ Removed (terminal)
//! ```
//!
//! Every transition checks its source state and fails with
//! [`Error::InvalidState`] otherwise. On success it invokes the matching
//! [`SlotCallback`] method on every registered callback, in registration order.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::time::Duration;

use tracing::debug;

use crate::bridge::{SlotCallback, SlotListener};
use crate::error::{Error, Result};
use crate::token::{DEFAULT_THRESHOLD, Token};
use crate::types::{BucketId, ContainerId, ManagerId, MediaId, RendererHandle, RepeatMode, SlotId};

/// Distance of a slot that does not compete for playback.
pub const INACTIVE_DISTANCE: u32 = u32::MAX;

/// Lifecycle state of a [`Slot`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SlotState {
    /// Constructed, not yet registered.
    Created,
    /// Registered into a manager.
    Added,
    /// Container is part of the live tree.
    Attached,
    /// Prepareable: visible and the host is started.
    Active,
    /// Unregistered. Terminal.
    Removed,
}

/// Capability marking a slot as user-controlled.
///
/// Slots with a controller form the "manual" partition during bucket selection
/// and win over automatic slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Controller {
    /// The arbiter may start this unit without a user request.
    pub can_auto_start: bool,
    /// The arbiter may pause this unit without a user request.
    pub can_auto_pause: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            can_auto_start: false,
            can_auto_pause: true,
        }
    }
}

/// Per-slot configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotConfig {
    /// Fraction of the container that must be visible to play.
    pub threshold: f64,
    /// Delay between selection and the actual start.
    pub delay: Duration,
    /// Ask the engine to buffer ahead when preparing.
    pub preload: bool,
    /// Repeat mode forwarded to the engine.
    pub repeat_mode: RepeatMode,
    /// Marks the slot as user-controlled.
    pub controller: Option<Controller>,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            delay: Duration::ZERO,
            preload: false,
            repeat_mode: RepeatMode::Off,
            controller: None,
        }
    }
}

/// One binding of a media unit to a container.
pub struct Slot {
    pub(crate) id: SlotId,
    pub(crate) media: MediaId,
    pub(crate) container: ContainerId,
    pub(crate) bucket: BucketId,
    pub(crate) manager: ManagerId,
    pub(crate) config: SlotConfig,
    pub(crate) token: Token,
    pub(crate) distance: u32,
    pub(crate) state: SlotState,
    pub(crate) renderer: Option<RendererHandle>,
    pub(crate) locked: bool,
    callbacks: Vec<Box<dyn SlotCallback>>,
    pub(crate) listeners: Vec<Box<dyn SlotListener>>,
}

impl core::fmt::Debug for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slot")
            .field("id", &self.id)
            .field("media", &self.media)
            .field("container", &self.container)
            .field("state", &self.state)
            .field("token", &self.token)
            .field("distance", &self.distance)
            .field("callbacks", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl Slot {
    pub(crate) fn new(
        id: SlotId,
        media: MediaId,
        container: ContainerId,
        bucket: BucketId,
        manager: ManagerId,
        config: SlotConfig,
    ) -> Self {
        let token = Token::inactive(config.threshold);
        Self {
            id,
            media,
            container,
            bucket,
            manager,
            config,
            token,
            distance: INACTIVE_DISTANCE,
            state: SlotState::Created,
            renderer: None,
            locked: false,
            callbacks: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Handle of this slot.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The bound media unit.
    pub fn media(&self) -> MediaId {
        self.media
    }

    /// The container the media unit is bound to.
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// The bucket that owns the container.
    pub fn bucket(&self) -> BucketId {
        self.bucket
    }

    /// The manager the slot is registered in.
    pub fn manager(&self) -> ManagerId {
        self.manager
    }

    /// Slot configuration.
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// Token from the most recent refresh.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Rank of proximity to the selection: `0` when selected,
    /// [`INACTIVE_DISTANCE`] when not competing.
    pub fn distance_to_play(&self) -> u32 {
        self.distance
    }

    /// Current state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Renderer held while active.
    pub fn renderer(&self) -> Option<RendererHandle> {
        self.renderer
    }

    /// True if the container is in the live tree.
    pub fn is_attached(&self) -> bool {
        matches!(self.state, SlotState::Attached | SlotState::Active)
    }

    /// True if the slot is prepareable.
    pub fn is_active(&self) -> bool {
        self.state == SlotState::Active
    }

    /// True if the slot has a user [`Controller`].
    pub fn is_manual(&self) -> bool {
        self.config.controller.is_some()
    }

    /// Register another callback; it fires after those already registered.
    pub(crate) fn add_callback(&mut self, callback: Box<dyn SlotCallback>) {
        self.callbacks.push(callback);
    }

    pub(crate) fn add_listener(&mut self, listener: Box<dyn SlotListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn on_added(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Created, SlotState::Added, |cb| cb.on_added(id))
    }

    pub(crate) fn on_attached(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Added, SlotState::Attached, |cb| {
            cb.on_attached(id);
        })
    }

    pub(crate) fn on_active(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Attached, SlotState::Active, |cb| cb.on_active(id))
    }

    pub(crate) fn on_inactive(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Active, SlotState::Attached, |cb| {
            cb.on_inactive(id);
        })
    }

    pub(crate) fn on_detached(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Attached, SlotState::Added, |cb| {
            cb.on_detached(id);
        })
    }

    pub(crate) fn on_removed(&mut self) -> Result<()> {
        let id = self.id;
        self.transition(SlotState::Added, SlotState::Removed, |cb| cb.on_removed(id))?;
        self.callbacks.clear();
        self.listeners.clear();
        Ok(())
    }

    fn transition(
        &mut self,
        expected: SlotState,
        next: SlotState,
        notify: impl Fn(&mut dyn SlotCallback),
    ) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                slot: self.id,
                expected,
                actual: self.state,
            });
        }
        debug!(slot = ?self.id, media = ?self.media, from = ?expected, to = ?next, "slot transition");
        self.state = next;
        for callback in &mut self.callbacks {
            notify(callback.as_mut());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Record(&'static str, Log);

    impl Record {
        fn push(&self, event: &str) {
            self.1.borrow_mut().push(alloc::format!("{}:{event}", self.0));
        }
    }

    impl SlotCallback for Record {
        fn on_added(&mut self, _slot: SlotId) {
            self.push("added");
        }
        fn on_removed(&mut self, _slot: SlotId) {
            self.push("removed");
        }
        fn on_attached(&mut self, _slot: SlotId) {
            self.push("attached");
        }
        fn on_detached(&mut self, _slot: SlotId) {
            self.push("detached");
        }
        fn on_active(&mut self, _slot: SlotId) {
            self.push("active");
        }
        fn on_inactive(&mut self, _slot: SlotId) {
            self.push("inactive");
        }
    }

    fn slot() -> Slot {
        Slot::new(
            SlotId(0, 1),
            MediaId(1),
            ContainerId(1),
            BucketId(0, 1),
            ManagerId(0, 1),
            SlotConfig::default(),
        )
    }

    fn slot_in(state: SlotState) -> Slot {
        let mut s = slot();
        s.state = state;
        s
    }

    type Transition = fn(&mut Slot) -> Result<()>;

    const TRANSITIONS: [(&str, Transition, SlotState); 6] = [
        ("added", Slot::on_added, SlotState::Created),
        ("attached", Slot::on_attached, SlotState::Added),
        ("active", Slot::on_active, SlotState::Attached),
        ("inactive", Slot::on_inactive, SlotState::Active),
        ("detached", Slot::on_detached, SlotState::Attached),
        ("removed", Slot::on_removed, SlotState::Added),
    ];

    const STATES: [SlotState; 5] = [
        SlotState::Created,
        SlotState::Added,
        SlotState::Attached,
        SlotState::Active,
        SlotState::Removed,
    ];

    #[test]
    fn every_illegal_source_state_is_rejected() {
        let mut checked = 0;
        for (name, transition, expected) in TRANSITIONS {
            for actual in STATES.into_iter().filter(|s| *s != expected) {
                let mut s = slot_in(actual);
                let err = transition(&mut s).unwrap_err();
                assert_eq!(
                    err,
                    Error::InvalidState {
                        slot: s.id,
                        expected,
                        actual,
                    },
                    "{name} from {actual:?}"
                );
                assert_eq!(s.state, actual, "{name} must not change state on failure");
                checked += 1;
            }
        }
        assert_eq!(checked, 24, "six transitions times four illegal sources");
    }

    #[test]
    fn on_active_requires_attached() {
        let mut s = slot_in(SlotState::Added);
        assert!(matches!(
            s.on_active(),
            Err(Error::InvalidState {
                expected: SlotState::Attached,
                actual: SlotState::Added,
                ..
            })
        ));
    }

    #[test]
    fn full_lifecycle_fires_callbacks_in_registration_order() {
        let log: Log = Rc::default();
        let mut s = slot();
        s.add_callback(Box::new(Record("a", log.clone())));
        s.add_callback(Box::new(Record("b", log.clone())));

        s.on_added().unwrap();
        s.on_attached().unwrap();
        s.on_active().unwrap();
        assert!(s.is_active() && s.is_attached());
        s.on_inactive().unwrap();
        s.on_detached().unwrap();
        assert!(!s.is_attached());
        s.on_removed().unwrap();
        assert_eq!(s.state(), SlotState::Removed);

        let expected: Vec<String> = [
            "added", "attached", "active", "inactive", "detached", "removed",
        ]
        .iter()
        .flat_map(|e| vec![alloc::format!("a:{e}"), alloc::format!("b:{e}")])
        .collect();
        assert_eq!(*log.borrow(), expected);
    }

    #[test]
    fn removed_is_terminal() {
        let mut s = slot();
        s.on_added().unwrap();
        s.on_removed().unwrap();
        for (name, transition, _) in TRANSITIONS {
            assert!(transition(&mut s).is_err(), "{name} after removal");
        }
    }

    #[test]
    fn new_slot_does_not_compete() {
        let s = slot();
        assert_eq!(s.distance_to_play(), INACTIVE_DISTANCE);
        assert!(!s.token().should_prepare());
        assert!(!s.is_manual());
    }
}
