// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording collaborators shared by the unit tests.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::time::Duration;

use crate::bridge::{MediaBridge, RendererProvider, SlotCallback, SlotListener};
use crate::error::MediaError;
use crate::types::{MediaId, RendererHandle, RepeatMode, SlotId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Prepare(MediaId, Option<Duration>, bool),
    Play(MediaId),
    Pause(MediaId),
    Reset(MediaId),
    Release(MediaId),
    Repeat(MediaId, RepeatMode),
    Acquire(SlotId),
    Relinquish(SlotId),
    Slot(SlotId, &'static str),
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    positions: BTreeMap<MediaId, Duration>,
}

/// Shared log of every collaborator call, in order.
#[derive(Clone, Default)]
pub(crate) struct Recorder(Rc<RefCell<Inner>>);

impl Recorder {
    fn push(&self, call: Call) {
        self.0.borrow_mut().calls.push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub(crate) fn set_position(&self, media: MediaId, position: Duration) {
        self.0.borrow_mut().positions.insert(media, position);
    }

    /// Bridge calls of one media unit, without prepare/repeat noise.
    pub(crate) fn transport(&self, media: MediaId) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(c, Call::Play(m) | Call::Pause(m) | Call::Release(m) | Call::Reset(m) if *m == media)
            })
            .collect()
    }

    pub(crate) fn last_transport(&self, media: MediaId) -> Option<Call> {
        self.transport(media).pop()
    }

    pub(crate) fn bridge(&self, media: MediaId) -> Box<dyn MediaBridge> {
        Box::new(Bridge {
            media,
            rec: self.clone(),
        })
    }

    pub(crate) fn renderer(&self) -> Box<dyn RendererProvider> {
        Box::new(self.clone())
    }

    pub(crate) fn callback(&self) -> Box<dyn SlotCallback> {
        Box::new(self.clone())
    }

    pub(crate) fn listener(&self) -> Box<dyn SlotListener> {
        Box::new(self.clone())
    }
}

struct Bridge {
    media: MediaId,
    rec: Recorder,
}

impl MediaBridge for Bridge {
    fn prepare(&mut self, resume: Option<Duration>, preload: bool) {
        self.rec.push(Call::Prepare(self.media, resume, preload));
    }

    fn play(&mut self) {
        self.rec.push(Call::Play(self.media));
    }

    fn pause(&mut self) {
        self.rec.push(Call::Pause(self.media));
    }

    fn reset(&mut self, _keep_state: bool) {
        self.rec.push(Call::Reset(self.media));
    }

    fn release(&mut self) {
        self.rec.push(Call::Release(self.media));
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.rec.push(Call::Repeat(self.media, mode));
    }

    fn resume_position(&self) -> Option<Duration> {
        self.rec.0.borrow().positions.get(&self.media).copied()
    }
}

impl RendererProvider for Recorder {
    fn acquire_renderer(&mut self, slot: SlotId, media: MediaId) -> Option<RendererHandle> {
        self.push(Call::Acquire(slot));
        Some(RendererHandle(media.0))
    }

    fn release_renderer(&mut self, slot: SlotId, _media: MediaId, _renderer: RendererHandle) {
        self.push(Call::Relinquish(slot));
    }
}

impl SlotCallback for Recorder {
    fn on_added(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "added"));
    }

    fn on_removed(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "removed"));
    }

    fn on_attached(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "attached"));
    }

    fn on_detached(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "detached"));
    }

    fn on_active(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "active"));
    }

    fn on_inactive(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "inactive"));
    }
}

impl SlotListener for Recorder {
    fn on_buffering(&mut self, slot: SlotId, _play_when_ready: bool) {
        self.push(Call::Slot(slot, "buffering"));
    }

    fn on_playing(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "playing"));
    }

    fn on_paused(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "paused"));
    }

    fn on_ended(&mut self, slot: SlotId) {
        self.push(Call::Slot(slot, "ended"));
    }

    fn on_error(&mut self, slot: SlotId, _error: &MediaError) {
        self.push(Call::Slot(slot, "error"));
    }
}
