// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: scope handles, host keys, scroll axes, and lifecycle states.

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub(crate) u32, pub(crate) u32);

        impl crate::arena::Handle for $name {
            fn new(idx: u32, generation: u32) -> Self {
                Self(idx, generation)
            }

            fn idx(self) -> usize {
                self.0 as usize
            }

            fn generation(self) -> u32 {
                self.1
            }
        }
    };
}

handle!(
    /// Identifier of a [`Slot`](crate::slot::Slot): one media unit bound to one container.
    ///
    /// Like every scope handle in this crate it is generational: once the slot is
    /// removed, the handle goes stale and never aliases a slot created later.
    SlotId
);

handle!(
    /// Identifier of a [`Bucket`](crate::bucket::Bucket).
    BucketId
);

handle!(
    /// Identifier of a [`ManagerScope`](crate::manager::ManagerScope).
    ManagerId
);

handle!(
    /// Identifier of a [`GroupScope`](crate::group::GroupScope).
    GroupId
);

/// Host-side key of a container (a view, a cell, a page).
///
/// The arbiter never interprets the value; it only hands it back to the
/// [`ContainerTree`](crate::bridge::ContainerTree) for geometry queries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerId(pub u64);

/// Host-side key of a media unit.
///
/// A media unit survives moves between containers: rebinding the same `MediaId`
/// replaces the slot but keeps the unit's [`MediaBridge`](crate::bridge::MediaBridge).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaId(pub u64);

/// Opaque renderer handle returned by a [`RendererProvider`](crate::bridge::RendererProvider).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RendererHandle(pub u64);

bitflags::bitflags! {
    /// Scroll axes of a bucket's root container.
    ///
    /// The empty set is the "none" orientation used by plain container groups;
    /// both bits together select the both-axis comparator.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Axes: u8 {
        /// Content scrolls along y.
        const VERTICAL   = 0b0000_0001;
        /// Content scrolls along x.
        const HORIZONTAL = 0b0000_0010;
    }
}

/// Host lifecycle state, ordered from torn down to fully interactive.
///
/// Slots only become active once their manager is at least [`Started`](Self::Started).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifecycleState {
    /// The host is gone; its scope is torn down.
    Destroyed,
    /// Constructed but not yet created.
    #[default]
    Initialized,
    /// Created but not visible.
    Created,
    /// Visible.
    Started,
    /// Visible and focused.
    Resumed,
}

/// How a media unit repeats once it ends. Forwarded to the bridge on prepare.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatMode {
    /// Play once.
    #[default]
    Off,
    /// Loop the current item.
    One,
    /// Loop the whole queue.
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_order_gates_on_started() {
        assert!(LifecycleState::Created < LifecycleState::Started);
        assert!(LifecycleState::Resumed >= LifecycleState::Started);
        assert!(
            LifecycleState::Destroyed < LifecycleState::Initialized,
            "destroyed sits below every live state"
        );
    }

    #[test]
    fn axes_both_is_union() {
        let both = Axes::VERTICAL | Axes::HORIZONTAL;
        assert!(both.contains(Axes::VERTICAL) && both.contains(Axes::HORIZONTAL));
        assert!(Axes::empty().is_empty());
    }
}
