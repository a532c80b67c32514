// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-media records.
//!
//! A [`Playable`] wraps the [`MediaBridge`] of one media unit and survives
//! rebinding: moving a unit to another container replaces its slot, not its
//! record. Every bridge call goes through here so redundant ones are skipped.

use alloc::boxed::Box;
use core::time::Duration;

use tracing::debug;

use crate::bridge::{MediaBridge, MediaState};
use crate::types::{MediaId, RepeatMode, SlotId};

/// Resource tier of a media unit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Residency {
    /// Never prepared.
    #[default]
    Idle,
    /// Loaded and ready to play.
    Prepared,
    /// Allocated, media-specific state dropped.
    Reset,
    /// Every resource released.
    Released,
}

impl Residency {
    /// True while the unit holds engine resources.
    pub fn is_resident(self) -> bool {
        matches!(self, Self::Prepared | Self::Reset)
    }
}

/// Snapshot of a media unit returned by [`Arbiter::media_status`](crate::Arbiter::media_status).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MediaStatus {
    /// Slot the unit is bound to.
    pub slot: Option<SlotId>,
    /// Current resource tier.
    pub residency: Residency,
    /// True if the arbiter last asked the unit to play, or the engine reports it playing.
    pub playing: bool,
    /// Last state reported by the engine.
    pub state: MediaState,
    /// A delayed start is queued.
    pub start_pending: bool,
}

pub(crate) struct Playable {
    pub(crate) media: MediaId,
    pub(crate) bridge: Box<dyn MediaBridge>,
    pub(crate) slot: Option<SlotId>,
    pub(crate) residency: Residency,
    pub(crate) playing: bool,
    pub(crate) state: MediaState,
}

impl core::fmt::Debug for Playable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Playable")
            .field("media", &self.media)
            .field("slot", &self.slot)
            .field("residency", &self.residency)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

impl Playable {
    pub(crate) fn new(media: MediaId, bridge: Box<dyn MediaBridge>) -> Self {
        Self {
            media,
            bridge,
            slot: None,
            residency: Residency::Idle,
            playing: false,
            state: MediaState::Idle,
        }
    }

    pub(crate) fn prepare(&mut self, resume: Option<Duration>, preload: bool, repeat: RepeatMode) {
        if self.residency == Residency::Prepared {
            return;
        }
        debug!(media = ?self.media, ?resume, preload, "prepare");
        self.bridge.set_repeat_mode(repeat);
        self.bridge.prepare(resume, preload);
        self.residency = Residency::Prepared;
    }

    /// Starts playback, preparing first if needed.
    pub(crate) fn play(&mut self, preload: bool, repeat: RepeatMode) {
        self.prepare(None, preload, repeat);
        debug!(media = ?self.media, "play");
        self.bridge.play();
        self.playing = true;
    }

    pub(crate) fn pause(&mut self) {
        debug!(media = ?self.media, was_playing = self.playing, "pause");
        self.bridge.pause();
        self.playing = false;
    }

    pub(crate) fn reset(&mut self) {
        if self.residency != Residency::Prepared {
            return;
        }
        debug!(media = ?self.media, "reset");
        self.bridge.reset(false);
        self.residency = Residency::Reset;
        self.playing = false;
    }

    /// Releases resources. Returns the position to resume from, if the unit was resident.
    pub(crate) fn release(&mut self) -> Option<Duration> {
        if !self.residency.is_resident() {
            return None;
        }
        let position = self.bridge.resume_position();
        debug!(media = ?self.media, ?position, "release");
        self.bridge.release();
        self.residency = Residency::Released;
        self.playing = false;
        position
    }

    pub(crate) fn on_state_changed(&mut self, state: MediaState) {
        self.state = state;
        self.playing = matches!(
            state,
            MediaState::Buffering {
                play_when_ready: true
            } | MediaState::Ready {
                play_when_ready: true
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, Recorder};

    #[test]
    fn prepare_is_idempotent_and_forwards_repeat_mode() {
        let rec = Recorder::default();
        let mut p = Playable::new(MediaId(1), rec.bridge(MediaId(1)));
        p.prepare(Some(Duration::from_secs(3)), true, RepeatMode::One);
        p.prepare(None, false, RepeatMode::Off);
        assert_eq!(p.residency, Residency::Prepared);
        assert_eq!(
            rec.calls(),
            [
                Call::Repeat(MediaId(1), RepeatMode::One),
                Call::Prepare(MediaId(1), Some(Duration::from_secs(3)), true),
            ]
        );
    }

    #[test]
    fn release_reports_position_once() {
        let rec = Recorder::default();
        rec.set_position(MediaId(1), Duration::from_secs(8));
        let mut p = Playable::new(MediaId(1), rec.bridge(MediaId(1)));
        assert_eq!(p.release(), None, "idle units hold nothing");
        p.play(false, RepeatMode::Off);
        assert!(p.playing);
        assert_eq!(p.release(), Some(Duration::from_secs(8)));
        assert_eq!(p.release(), None);
        assert_eq!(p.residency, Residency::Released);
        assert!(!p.playing);
    }

    #[test]
    fn reset_only_applies_to_prepared_units() {
        let rec = Recorder::default();
        let mut p = Playable::new(MediaId(2), rec.bridge(MediaId(2)));
        p.reset();
        assert_eq!(p.residency, Residency::Idle);
        p.prepare(None, false, RepeatMode::Off);
        p.reset();
        assert_eq!(p.residency, Residency::Reset);
        assert!(rec.calls().contains(&Call::Reset(MediaId(2))));
    }

    #[test]
    fn engine_state_drives_playing_flag() {
        let rec = Recorder::default();
        let mut p = Playable::new(MediaId(3), rec.bridge(MediaId(3)));
        p.on_state_changed(MediaState::Buffering {
            play_when_ready: true,
        });
        assert!(p.playing);
        p.on_state_changed(MediaState::Ended);
        assert!(!p.playing);
    }
}
