// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bucket policies for common container kinds.
//!
//! | Constructor | Orientation | Extra play condition |
//! |---|---|---|
//! | [`ScrollContainer::group`] | none | none |
//! | [`ScrollContainer::list`] | as given | the holding cell is attached |
//! | [`ScrollContainer::pager`] | horizontal | the holding page is attached |
//! | [`ScrollContainer::nested_scroll`] | vertical | none |

use crate::bridge::ContainerTree;
use crate::bucket::BucketPolicy;
use crate::slot::Slot;
use crate::types::{Axes, ContainerId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    Group,
    List(Axes),
    Pager,
    NestedScroll,
}

/// A [`BucketPolicy`] for one of the built-in container kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScrollContainer {
    root: ContainerId,
    kind: Kind,
}

impl ScrollContainer {
    /// A plain container without a scroll axis.
    pub fn group(root: ContainerId) -> Self {
        Self {
            root,
            kind: Kind::Group,
        }
    }

    /// A recycling list scrolling along `axes`.
    pub fn list(root: ContainerId, axes: Axes) -> Self {
        Self {
            root,
            kind: Kind::List(axes),
        }
    }

    /// A horizontal pager.
    pub fn pager(root: ContainerId) -> Self {
        Self {
            root,
            kind: Kind::Pager,
        }
    }

    /// A vertically scrolling region with arbitrary nested content.
    pub fn nested_scroll(root: ContainerId) -> Self {
        Self {
            root,
            kind: Kind::NestedScroll,
        }
    }
}

impl BucketPolicy for ScrollContainer {
    fn root(&self) -> ContainerId {
        self.root
    }

    fn orientation(&self, _tree: &dyn ContainerTree) -> Axes {
        match self.kind {
            Kind::Group => Axes::empty(),
            Kind::List(axes) => axes,
            Kind::Pager => Axes::HORIZONTAL,
            Kind::NestedScroll => Axes::VERTICAL,
        }
    }

    fn allow_to_play(&self, tree: &dyn ContainerTree, slot: &Slot) -> bool {
        // A recycled cell may be detached while the host still reports its
        // content as attached.
        let held = match self.kind {
            Kind::List(_) | Kind::Pager => tree
                .item_of(self.root, slot.container())
                .is_some_and(|item| tree.is_attached(item)),
            Kind::Group | Kind::NestedScroll => true,
        };
        held && slot.token().should_play()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scene::Scene;
    use crate::slot::SlotConfig;
    use crate::token::Token;
    use crate::types::{BucketId, ManagerId, MediaId, SlotId};
    use kurbo::Rect;

    /// Root 1 holds cell 2 which holds video 3. Attachment is per node, as
    /// with hosts that do not propagate detach to descendants.
    struct Recycler {
        cell_attached: bool,
    }

    impl ContainerTree for Recycler {
        fn parent_of(&self, container: ContainerId) -> Option<ContainerId> {
            match container.0 {
                2 => Some(ContainerId(1)),
                3 => Some(ContainerId(2)),
                _ => None,
            }
        }

        fn is_attached(&self, container: ContainerId) -> bool {
            container != ContainerId(2) || self.cell_attached
        }

        fn visible_rect(&self, _container: ContainerId) -> Option<Rect> {
            None
        }

        fn drawing_rect(&self, _container: ContainerId) -> Rect {
            Rect::ZERO
        }
    }

    fn visible_video() -> Slot {
        let mut slot = Slot::new(
            SlotId(0, 1),
            MediaId(3),
            ContainerId(3),
            BucketId(0, 1),
            ManagerId(0, 1),
            SlotConfig::default(),
        );
        slot.token = Token::new(1.0, Rect::new(0.0, 0.0, 10.0, 10.0), 0.65);
        slot
    }

    #[test]
    fn lists_and_pagers_require_an_attached_cell() {
        let slot = visible_video();
        let held = Recycler { cell_attached: true };
        let recycled = Recycler {
            cell_attached: false,
        };
        for bucket in [
            ScrollContainer::list(ContainerId(1), Axes::VERTICAL),
            ScrollContainer::pager(ContainerId(1)),
        ] {
            assert!(bucket.allow_to_play(&held, &slot), "{bucket:?}");
            assert!(!bucket.allow_to_play(&recycled, &slot), "{bucket:?}");
        }
        let nested = ScrollContainer::nested_scroll(ContainerId(1));
        assert!(nested.allow_to_play(&recycled, &slot));
    }

    #[test]
    fn accepts_descendants_only() {
        let mut scene = Scene::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.add_root(ContainerId(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.add_child(ContainerId(1), ContainerId(2), Rect::new(0.0, 0.0, 100.0, 50.0));
        scene.add_child(ContainerId(2), ContainerId(3), Rect::new(0.0, 0.0, 50.0, 50.0));
        scene.add_root(ContainerId(9), Rect::new(0.0, 0.0, 10.0, 10.0));

        let list = ScrollContainer::list(ContainerId(1), Axes::VERTICAL);
        assert!(list.accepts(&scene, ContainerId(3)));
        assert!(list.accepts(&scene, ContainerId(2)));
        assert!(!list.accepts(&scene, ContainerId(1)), "the root itself is not a slot");
        assert!(!list.accepts(&scene, ContainerId(9)));
    }

    #[test]
    fn orientations() {
        let scene = Scene::new(Rect::ZERO);
        let root = ContainerId(1);
        assert_eq!(ScrollContainer::group(root).orientation(&scene), Axes::empty());
        assert_eq!(ScrollContainer::pager(root).orientation(&scene), Axes::HORIZONTAL);
        assert_eq!(
            ScrollContainer::nested_scroll(root).orientation(&scene),
            Axes::VERTICAL
        );
        assert_eq!(
            ScrollContainer::list(root, Axes::all()).orientation(&scene),
            Axes::all()
        );
    }
}
