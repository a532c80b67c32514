// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_playback --heading-base-level=0

//! Understory Playback: visibility-driven playback arbitration.
//!
//! Given many media surfaces embedded in scrollable containers, decide which
//! one plays, pause the rest, and tier the resources of the others by how far
//! they are from the one that plays.
//!
//! - Binds media units to containers through [`Arbiter::bind`].
//! - Picks at most one unit per [`GroupScope`] on every debounced refresh.
//! - Prepares, resets and releases units by distance under a [`MemoryMode`].
//! - Honors user intent: manual [`Controller`]s, user play and pause, locks.
//!
//! ## Scopes
//!
//! - [`GroupScope`]: one top-level screen; owns the single selection.
//! - [`ManagerScope`]: one region of a screen with its own lifecycle and buckets.
//! - [`Bucket`]: slots sharing one scrollable root; a [`BucketPolicy`] says which
//!   containers belong to it and along which axes it scrolls.
//! - [`Slot`]: one media unit bound to one container.
//!
//! Every scope is addressed by a generational handle ([`GroupId`], [`ManagerId`],
//! [`BucketId`], [`SlotId`]). Stale handles never alias a newer scope.
//!
//! ## Host collaborators
//!
//! The arbiter never touches a view tree or a media engine itself:
//! - [`ContainerTree`] answers geometry and attachment queries;
//! - [`MediaBridge`] receives prepare, play, pause, reset and release;
//! - [`RendererProvider`] hands out renderers as slots become active;
//! - [`ResumeStore`] persists resume positions across releases.
//!
//! [`adapters::scene::Scene`] is an in-memory [`ContainerTree`] and
//! [`adapters::containers::ScrollContainer`] covers the common bucket kinds.
//!
//! ## Time
//!
//! There is no clock inside. Host events schedule work; the host calls
//! [`Arbiter::advance`] with its monotonic time and polls
//! [`Arbiter::next_deadline`] to know when to call again.
//!
//! ## Minimal usage
//!
//! ```
//! use core::time::Duration;
//! use kurbo::Rect;
//! use understory_playback::adapters::containers::ScrollContainer;
//! use understory_playback::adapters::scene::Scene;
//! use understory_playback::{
//!     Arbiter, Axes, Binding, ContainerId, GroupConfig, ManagerOptions, MediaBridge, MediaId,
//! };
//!
//! struct Silent;
//!
//! impl MediaBridge for Silent {
//!     fn prepare(&mut self, _resume: Option<Duration>, _preload: bool) {}
//!     fn play(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn reset(&mut self, _keep_state: bool) {}
//!     fn release(&mut self) {}
//! }
//!
//! let list = ContainerId(1);
//! let mut scene = Scene::new(Rect::new(0.0, 0.0, 400.0, 600.0));
//! scene.add_root(list, Rect::new(0.0, 0.0, 400.0, 600.0));
//!
//! let mut arbiter = Arbiter::default();
//! let group = arbiter.add_group(GroupConfig::default());
//! let manager = arbiter.add_manager(group, ManagerOptions::default())?;
//! arbiter.add_bucket(manager, Box::new(ScrollContainer::list(list, Axes::VERTICAL)))?;
//!
//! // Three cells; the third is mostly below the fold.
//! for (n, y) in [(0_u64, 0.0), (1, 250.0), (2, 500.0)] {
//!     let cell = ContainerId(10 + n);
//!     scene.add_child(list, cell, Rect::new(0.0, y, 400.0, y + 240.0));
//!     arbiter.add_media(MediaId(n), Box::new(Silent))?;
//!     arbiter.bind(&scene, manager, Binding::new(MediaId(n), cell))?;
//! }
//!
//! // Refreshes are debounced; run the one that was scheduled.
//! let due = arbiter.next_deadline().unwrap();
//! arbiter.advance(due, &scene)?;
//!
//! let selected = arbiter.selection(group).unwrap();
//! assert_eq!(arbiter.slot(selected).unwrap().media(), MediaId(0));
//! assert!(arbiter.media_status(MediaId(0)).unwrap().playing);
//! assert!(!arbiter.media_status(MediaId(1)).unwrap().playing);
//! # Ok::<(), understory_playback::Error>(())
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod arbiter;
mod arena;
mod bridge;
mod bucket;
mod dispatcher;
mod error;
mod group;
mod manager;
mod memory;
mod playable;
mod slot;
mod timer;
mod token;
mod types;

pub mod adapters;

#[cfg(test)]
mod testing;

pub use arbiter::{Arbiter, ArbiterConfig, Binding, LockTarget};
pub use bridge::{
    ContainerTree, MediaBridge, MediaState, MemoryResumeStore, Prioritized, RendererProvider,
    ResumeKey, ResumeStore, SlotCallback, SlotListener,
};
pub use bucket::{Bucket, BucketPolicy, compare_by_orientation, select_to_play};
pub use dispatcher::UserAction;
pub use error::{Error, MediaError, Result};
pub use group::{GroupConfig, GroupScope, compare_and_check, rank_distances};
pub use manager::{ManagerOptions, ManagerScope};
pub use memory::{MemoryAction, MemoryMode, memory_action};
pub use playable::{MediaStatus, Residency};
pub use slot::{Controller, INACTIVE_DISTANCE, Slot, SlotConfig, SlotState};
pub use timer::Timers;
pub use token::{DEFAULT_THRESHOLD, Token};
pub use types::{
    Axes, BucketId, ContainerId, GroupId, LifecycleState, ManagerId, MediaId, RendererHandle,
    RepeatMode, SlotId,
};
