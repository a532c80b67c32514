// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility snapshots of slots.

use kurbo::Rect;

use crate::bridge::ContainerTree;
use crate::types::{ContainerId, LifecycleState};

/// Default fraction of a container that must be visible before it may play.
pub const DEFAULT_THRESHOLD: f64 = 0.65;

/// Immutable visibility snapshot of one slot, valid for the refresh that produced it.
///
/// `area_offset` lies in `[-1, 1]`:
/// - `< 0`: not prepareable (detached, off screen, or host below started);
/// - `[0, threshold)`: prepareable but not playable;
/// - `>= threshold`: playable.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    /// Visible area over drawable area, or `-1` when not prepareable.
    pub area_offset: f64,
    /// Visible rect of the container in tree coordinates; empty when not visible.
    pub container_rect: Rect,
    threshold: f64,
}

impl Token {
    /// A token for a slot that is not prepareable.
    pub const fn inactive(threshold: f64) -> Self {
        Self {
            area_offset: -1.0,
            container_rect: Rect::ZERO,
            threshold,
        }
    }

    /// Build a token from raw parts. `area_offset` is clamped to `[-1, 1]`.
    pub fn new(area_offset: f64, container_rect: Rect, threshold: f64) -> Self {
        Self {
            area_offset: area_offset.clamp(-1.0, 1.0),
            container_rect,
            threshold,
        }
    }

    /// Recompute the token of `container` from the live tree.
    ///
    /// Lifecycle below [`Started`](LifecycleState::Started), a detached container, or an
    /// empty visible rect all yield `-1`. Otherwise the offset is the visible area over
    /// the drawable area, or `0` when the drawable area is empty (mid-layout).
    pub fn compute(
        tree: &dyn ContainerTree,
        container: ContainerId,
        lifecycle: LifecycleState,
        threshold: f64,
    ) -> Self {
        if lifecycle < LifecycleState::Started || !tree.is_attached(container) {
            return Self::inactive(threshold);
        }
        let Some(visible) = tree.visible_rect(container).filter(|r| !r.is_zero_area()) else {
            return Self::inactive(threshold);
        };
        let drawable = tree.drawing_rect(container).area();
        let offset = if drawable > 0.0 {
            visible.area() / drawable
        } else {
            0.0
        };
        Self::new(offset, visible, threshold)
    }

    /// True if the slot may hold prepared resources.
    pub fn should_prepare(&self) -> bool {
        self.area_offset >= 0.0
    }

    /// True if the slot is visible enough to play.
    pub fn should_play(&self) -> bool {
        self.area_offset >= self.threshold
    }

    /// The visibility threshold this token was computed against.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct One {
        attached: bool,
        visible: Option<Rect>,
        drawing: Rect,
    }

    impl ContainerTree for One {
        fn parent_of(&self, _container: ContainerId) -> Option<ContainerId> {
            None
        }

        fn is_attached(&self, _container: ContainerId) -> bool {
            self.attached
        }

        fn visible_rect(&self, _container: ContainerId) -> Option<Rect> {
            self.visible
        }

        fn drawing_rect(&self, _container: ContainerId) -> Rect {
            self.drawing
        }
    }

    const C: ContainerId = ContainerId(1);

    fn half_visible() -> One {
        One {
            attached: true,
            visible: Some(Rect::new(0.0, 0.0, 100.0, 50.0)),
            drawing: Rect::new(0.0, 0.0, 100.0, 100.0),
        }
    }

    #[test]
    fn offset_is_visible_over_drawable() {
        let t = Token::compute(&half_visible(), C, LifecycleState::Resumed, 0.65);
        assert!((t.area_offset - 0.5).abs() < 1e-9);
        assert!(t.should_prepare());
        assert!(!t.should_play(), "0.5 is below the 0.65 threshold");
        let t = Token::compute(&half_visible(), C, LifecycleState::Started, 0.5);
        assert!(t.should_play(), "threshold is inclusive");
    }

    #[test]
    fn lifecycle_below_started_is_not_prepareable() {
        let t = Token::compute(&half_visible(), C, LifecycleState::Created, 0.65);
        assert_eq!(t.area_offset, -1.0);
        assert!(!t.should_prepare());
    }

    #[test]
    fn detached_or_hidden_is_not_prepareable() {
        let mut tree = half_visible();
        tree.attached = false;
        assert!(!Token::compute(&tree, C, LifecycleState::Resumed, 0.65).should_prepare());

        let mut tree = half_visible();
        tree.visible = None;
        assert!(!Token::compute(&tree, C, LifecycleState::Resumed, 0.65).should_prepare());

        let mut tree = half_visible();
        tree.visible = Some(Rect::new(10.0, 10.0, 10.0, 40.0));
        assert!(
            !Token::compute(&tree, C, LifecycleState::Resumed, 0.65).should_prepare(),
            "zero-area visible rect counts as hidden"
        );
    }

    #[test]
    fn zero_drawable_area_is_prepareable_but_not_playable() {
        let mut tree = half_visible();
        tree.drawing = Rect::ZERO;
        let t = Token::compute(&tree, C, LifecycleState::Resumed, 0.0);
        assert_eq!(t.area_offset, 0.0);
        assert!(t.should_prepare());
    }

    #[test]
    fn predicates_follow_offset_boundaries() {
        for (offset, prepare, play) in [
            (-1.0, false, false),
            (-0.01, false, false),
            (0.0, true, false),
            (0.649, true, false),
            (0.65, true, true),
            (1.0, true, true),
        ] {
            let t = Token::new(offset, Rect::ZERO, 0.65);
            assert_eq!(t.should_prepare(), prepare, "prepare at {offset}");
            assert_eq!(t.should_play(), play, "play at {offset}");
        }
    }
}
