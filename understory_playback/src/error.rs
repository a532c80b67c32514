// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! [`Error`] covers contract violations by a collaborator: double binding, an
//! out-of-order state transition, an inconsistent priority comparator, a container
//! that no bucket accepts, or a stale handle. These are returned to the caller and
//! never retried.
//!
//! [`MediaError`] is what a [`MediaBridge`](crate::bridge::MediaBridge) reports when
//! decoding or fetching fails. It is recoverable: the arbiter forwards it to the
//! slot's listeners and keeps scheduling.

use alloc::string::String;

use crate::slot::SlotState;
use crate::types::{BucketId, ContainerId, GroupId, ManagerId, MediaId, SlotId};

/// Result alias for arbiter operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Contract violations raised by the arbiter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A slot transition was requested from the wrong source state.
    #[error("slot {slot:?}: expected state {expected:?}, found {actual:?}")]
    InvalidState {
        /// The slot whose transition was rejected.
        slot: SlotId,
        /// The state the transition requires.
        expected: SlotState,
        /// The state the slot was actually in.
        actual: SlotState,
    },
    /// The container is bound to a slot of another manager.
    #[error("container {container:?} is already bound to slot {slot:?}")]
    ContainerAlreadyBound {
        /// The contested container.
        container: ContainerId,
        /// The slot that owns it.
        slot: SlotId,
    },
    /// A priority comparator returned results whose two directions do not cancel out.
    #[error("sum of comparison results in both directions must be 0, got {sum}")]
    AsymmetricPriority {
        /// `compare(a, b) + compare(b, a)`.
        sum: i8,
    },
    /// No bucket of the manager accepts the container.
    #[error("no bucket of manager {manager:?} accepts container {container:?}")]
    MissingBucket {
        /// The manager that was searched.
        manager: ManagerId,
        /// The container that found no owner.
        container: ContainerId,
    },
    /// The media unit was registered twice.
    #[error("media {0:?} is already registered")]
    DuplicateMedia(MediaId),
    /// The media unit was never registered, or has been removed.
    #[error("unknown media {0:?}")]
    UnknownMedia(MediaId),
    /// Stale or foreign group handle.
    #[error("unknown group {0:?}")]
    UnknownGroup(GroupId),
    /// Stale or foreign manager handle.
    #[error("unknown manager {0:?}")]
    UnknownManager(ManagerId),
    /// Stale or foreign bucket handle.
    #[error("unknown bucket {0:?}")]
    UnknownBucket(BucketId),
    /// Stale or foreign slot handle.
    #[error("unknown slot {0:?}")]
    UnknownSlot(SlotId),
}

/// Recoverable failure reported by the media engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The source could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),
    /// The source could not be fetched.
    #[error("network failure: {0}")]
    Network(String),
    /// Anything else the engine wants to surface.
    #[error("media engine failure: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn invalid_state_names_both_states() {
        let err = Error::InvalidState {
            slot: SlotId(3, 1),
            expected: SlotState::Attached,
            actual: SlotState::Added,
        };
        let msg = err.to_string();
        assert!(msg.contains("Attached") && msg.contains("Added"), "{msg}");
    }
}
