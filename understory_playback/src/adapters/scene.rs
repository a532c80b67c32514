// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`ContainerTree`].
//!
//! Containers are axis-aligned rects. A root is placed in window coordinates;
//! a child is placed in the content coordinates of its parent, which are
//! shifted by the parent's scroll offset. Every container clips its
//! descendants, and the window clips everything.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Vec2};

use crate::bridge::ContainerTree;
use crate::types::ContainerId;

#[derive(Clone, Debug)]
struct Node {
    parent: Option<ContainerId>,
    rect: Rect,
    scroll: Vec2,
    attached: bool,
}

/// Nested, scrollable, clipping rects.
#[derive(Clone, Debug)]
pub struct Scene {
    window: Rect,
    nodes: BTreeMap<ContainerId, Node>,
}

impl Scene {
    /// Create an empty scene clipped to `window`.
    pub fn new(window: Rect) -> Self {
        Self {
            window,
            nodes: BTreeMap::new(),
        }
    }

    /// The window rect.
    pub fn window(&self) -> Rect {
        self.window
    }

    /// Add an attached root container at `rect` in window coordinates.
    pub fn add_root(&mut self, id: ContainerId, rect: Rect) {
        self.insert(id, None, rect);
    }

    /// Add an attached container at `rect` in the content coordinates of `parent`.
    pub fn add_child(&mut self, parent: ContainerId, id: ContainerId, rect: Rect) {
        self.insert(id, Some(parent), rect);
    }

    fn insert(&mut self, id: ContainerId, parent: Option<ContainerId>, rect: Rect) {
        self.nodes.insert(
            id,
            Node {
                parent,
                rect,
                scroll: Vec2::ZERO,
                attached: true,
            },
        );
    }

    /// Remove a container and all of its descendants.
    pub fn remove(&mut self, id: ContainerId) {
        let mut doomed = Vec::from([id]);
        while let Some(cur) = doomed.pop() {
            if self.nodes.remove(&cur).is_some() {
                doomed.extend(
                    self.nodes
                        .iter()
                        .filter(|(_, n)| n.parent == Some(cur))
                        .map(|(c, _)| *c),
                );
            }
        }
    }

    /// True if the scene knows `id`.
    pub fn contains(&self, id: ContainerId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Move or resize a container.
    pub fn set_rect(&mut self, id: ContainerId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.rect = rect;
        }
    }

    /// Set the content offset of a container.
    pub fn scroll_to(&mut self, id: ContainerId, offset: Vec2) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.scroll = offset;
        }
    }

    /// Shift the content offset of a container.
    pub fn scroll_by(&mut self, id: ContainerId, delta: Vec2) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.scroll += delta;
        }
    }

    /// Attach or detach a container (and with it, its subtree).
    pub fn set_attached(&mut self, id: ContainerId, attached: bool) {
        if let Some(n) = self.nodes.get_mut(&id) {
            n.attached = attached;
        }
    }

    /// Rect of `id` in window coordinates, before clipping.
    pub fn window_rect(&self, id: ContainerId) -> Option<Rect> {
        let node = self.nodes.get(&id)?;
        let mut rect = node.rect;
        let mut parent = node.parent;
        while let Some(p) = parent {
            let pn = self.nodes.get(&p)?;
            rect = rect + (pn.rect.origin().to_vec2() - pn.scroll);
            parent = pn.parent;
        }
        Some(rect)
    }
}

impl ContainerTree for Scene {
    fn parent_of(&self, container: ContainerId) -> Option<ContainerId> {
        self.nodes.get(&container)?.parent
    }

    fn is_attached(&self, container: ContainerId) -> bool {
        let mut cur = Some(container);
        while let Some(c) = cur {
            match self.nodes.get(&c) {
                Some(n) if n.attached => cur = n.parent,
                _ => return false,
            }
        }
        true
    }

    fn visible_rect(&self, container: ContainerId) -> Option<Rect> {
        if !self.is_attached(container) {
            return None;
        }
        let mut visible = self.window_rect(container)?.intersect(self.window);
        let mut parent = self.parent_of(container);
        while let Some(p) = parent {
            visible = visible.intersect(self.window_rect(p)?);
            parent = self.parent_of(p);
        }
        (visible.area() > 0.0).then_some(visible)
    }

    fn drawing_rect(&self, container: ContainerId) -> Rect {
        self.nodes
            .get(&container)
            .map(|n| Rect::from_origin_size(Point::ZERO, n.rect.size()))
            .unwrap_or(Rect::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: ContainerId = ContainerId(1);
    const ROW: ContainerId = ContainerId(2);
    const VIDEO: ContainerId = ContainerId(3);

    fn scene() -> Scene {
        let mut s = Scene::new(Rect::new(0.0, 0.0, 400.0, 800.0));
        s.add_root(LIST, Rect::new(0.0, 100.0, 400.0, 700.0));
        s.add_child(LIST, ROW, Rect::new(0.0, 0.0, 400.0, 300.0));
        s.add_child(ROW, VIDEO, Rect::new(0.0, 50.0, 400.0, 250.0));
        s
    }

    #[test]
    fn children_are_offset_by_ancestors() {
        let s = scene();
        assert_eq!(s.window_rect(VIDEO), Some(Rect::new(0.0, 150.0, 400.0, 350.0)));
        assert_eq!(s.visible_rect(VIDEO), Some(Rect::new(0.0, 150.0, 400.0, 350.0)));
        assert_eq!(s.drawing_rect(VIDEO), Rect::new(0.0, 0.0, 400.0, 200.0));
    }

    #[test]
    fn scrolling_clips_against_the_list() {
        let mut s = scene();
        s.scroll_to(LIST, Vec2::new(0.0, 150.0));
        assert_eq!(s.visible_rect(VIDEO), Some(Rect::new(0.0, 100.0, 400.0, 200.0)));
        s.scroll_by(LIST, Vec2::new(0.0, 200.0));
        assert_eq!(s.visible_rect(VIDEO), None);
    }

    #[test]
    fn detaching_an_ancestor_detaches_the_subtree() {
        let mut s = scene();
        s.set_attached(ROW, false);
        assert!(!s.is_attached(VIDEO));
        assert_eq!(s.visible_rect(VIDEO), None);
        s.set_attached(ROW, true);
        assert!(s.is_attached(VIDEO));
        s.remove(ROW);
        assert!(!s.contains(VIDEO));
        assert!(!s.is_attached(VIDEO));
    }
}
