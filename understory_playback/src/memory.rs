// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distance-based resource tiering.

/// How aggressively a group trades memory for fast resumption.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryMode {
    /// Let the arbiter choose. Behaves like [`Balanced`](Self::Balanced), as
    /// there is no memory-pressure signal to downgrade on.
    Auto,
    /// Release everything except the selection.
    #[default]
    Low,
    /// Keep the nearest neighbour allocated, reset it.
    Normal,
    /// Like [`Normal`](Self::Normal) but keep neighbours prepared.
    Balanced,
    /// Keep up to seven neighbours allocated.
    High,
    /// Never release an active slot.
    Infinite,
}

impl MemoryMode {
    /// Distance from which a unit is released.
    pub const fn release_threshold(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Auto | Self::Normal | Self::Balanced => 2,
            Self::High => 8,
            Self::Infinite => u32::MAX - 1,
        }
    }
}

/// What to do with a unit whose distance to the selection changed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MemoryAction {
    /// Ensure the unit is prepared, restoring a saved resume position.
    Prepare,
    /// Keep resources allocated but drop media-specific state.
    Reset,
    /// Leave the unit as it is.
    Keep,
    /// Save the resume position and release every resource.
    Release,
}

/// Maps a mode and a new distance to the action to take.
///
/// Runs once per distance change, never on a timer.
pub const fn memory_action(mode: MemoryMode, distance: u32) -> MemoryAction {
    if distance == 0 {
        MemoryAction::Prepare
    } else if distance >= mode.release_threshold() {
        MemoryAction::Release
    } else if matches!(mode, MemoryMode::Auto | MemoryMode::Balanced) {
        MemoryAction::Keep
    } else {
        MemoryAction::Reset
    }
}
