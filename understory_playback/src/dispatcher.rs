// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Issues play and pause to media units.
//!
//! The dispatcher sits between arbitration and the media engines. It owns the
//! per-media [`Playable`] records and the state of user intent:
//!
//! - the pending action of each unit (the last explicit user play or pause);
//! - the units started by the user, most recent last;
//! - the unit that was manually started and must not be preempted.
//!
//! Each unit has at most one delayed start queued; a new start or any pause
//! for the unit cancels it.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::time::Duration;

use tracing::debug;

use crate::playable::{MediaStatus, Playable};
use crate::slot::{Controller, Slot};
use crate::timer::Timers;
use crate::types::{MediaId, RepeatMode};

/// An explicit user request that overrides automatic arbitration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UserAction {
    /// The user asked the unit to play.
    Play,
    /// The user asked the unit to pause.
    Pause,
}

#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    pub(crate) playables: BTreeMap<MediaId, Playable>,
    pending: BTreeMap<MediaId, UserAction>,
    started_by_user: Vec<MediaId>,
    manually_started: Option<MediaId>,
    starts: Timers<MediaId>,
}

impl Dispatcher {
    pub(crate) fn started_by_user(&self) -> &[MediaId] {
        &self.started_by_user
    }

    pub(crate) fn pending_action(&self, media: MediaId) -> Option<UserAction> {
        self.pending.get(&media).copied()
    }

    pub(crate) fn status(&self, media: MediaId) -> Option<MediaStatus> {
        self.playables.get(&media).map(|p| MediaStatus {
            slot: p.slot,
            residency: p.residency,
            playing: p.playing,
            state: p.state,
            start_pending: self.starts.is_scheduled(media),
        })
    }

    /// Records a user play. Returns `false` if the unit has no controller.
    pub(crate) fn request_play(&mut self, media: MediaId, controller: Option<Controller>) -> bool {
        let Some(controller) = controller else {
            debug!(?media, "user play ignored: no controller");
            return false;
        };
        self.pending.insert(media, UserAction::Play);
        self.started_by_user.retain(|m| *m != media);
        self.started_by_user.push(media);
        if !controller.can_auto_pause {
            self.manually_started = Some(media);
        }
        debug!(?media, "user play");
        true
    }

    /// Records a user pause. Returns `false` if the unit has no controller.
    pub(crate) fn request_pause(&mut self, media: MediaId, controller: Option<Controller>) -> bool {
        if controller.is_none() {
            debug!(?media, "user pause ignored: no controller");
            return false;
        }
        self.pending.insert(media, UserAction::Pause);
        self.started_by_user.retain(|m| *m != media);
        if self.manually_started == Some(media) {
            self.manually_started = None;
        }
        debug!(?media, "user pause");
        true
    }

    /// Asks the unit bound to `slot` to play.
    pub(crate) fn play(&mut self, slot: &Slot, now: Duration) {
        let media = slot.media;
        if let Some(other) = self.manually_started
            && other != media
            && self.playables.get(&other).is_some_and(|p| p.playing)
        {
            debug!(?media, ?other, "deferring to manually started unit");
            self.just_pause(media);
            return;
        }
        match slot.config.controller {
            None => self.just_play(slot, now),
            Some(controller) => match self.pending.get(&media) {
                Some(UserAction::Play) => self.just_play(slot, now),
                Some(UserAction::Pause) => self.just_pause(media),
                None if controller.can_auto_start => self.just_play(slot, now),
                None => debug!(?media, "waiting for user start"),
            },
        }
    }

    /// Asks the unit bound to `slot` to pause.
    ///
    /// `any_selection` tells whether some group currently has a selection, in
    /// which case the pause is unconditional.
    pub(crate) fn pause(&mut self, slot: &Slot, any_selection: bool) {
        let media = slot.media;
        let Some(controller) = slot.config.controller else {
            self.just_pause(media);
            return;
        };
        let preempted = self.manually_started.is_some_and(|m| m != media);
        if any_selection
            || preempted
            || self.pending.get(&media) == Some(&UserAction::Pause)
            || controller.can_auto_pause
        {
            self.just_pause(media);
        } else {
            debug!(?media, "keeps playing: cannot be paused automatically");
        }
    }

    /// Fires a delayed start that came due.
    pub(crate) fn fire(&mut self, media: MediaId, preload: bool, repeat: RepeatMode) {
        if let Some(p) = self.playables.get_mut(&media) {
            p.play(preload, repeat);
        }
    }

    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<MediaId> {
        self.starts.pop_due(now)
    }

    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.starts.next_deadline()
    }

    pub(crate) fn cancel_start(&mut self, media: MediaId) -> bool {
        self.starts.cancel(media)
    }

    /// Drops all user intent and queued work for a unit.
    pub(crate) fn forget(&mut self, media: MediaId) {
        self.starts.cancel(media);
        self.pending.remove(&media);
        self.started_by_user.retain(|m| *m != media);
        if self.manually_started == Some(media) {
            self.manually_started = None;
        }
    }

    fn just_play(&mut self, slot: &Slot, now: Duration) {
        let media = slot.media;
        self.starts.cancel(media);
        if slot.config.delay > Duration::ZERO {
            debug!(?media, delay = ?slot.config.delay, "start scheduled");
            self.starts.schedule(media, now + slot.config.delay);
        } else if let Some(p) = self.playables.get_mut(&media) {
            p.play(slot.config.preload, slot.config.repeat_mode);
        }
    }

    fn just_pause(&mut self, media: MediaId) {
        self.starts.cancel(media);
        if let Some(p) = self.playables.get_mut(&media) {
            p.pause();
        }
    }
}
