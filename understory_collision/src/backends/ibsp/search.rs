// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only traversals backing the queries.
//!
//! Queries take `&self`, so they cannot flush pending area changes. Instead
//! every traversal starts at the root, whose area is always current, and
//! derives each child's area from its parent's split on the way down.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashSet;
use smallvec::SmallVec;

use super::IbspChecker;
use super::node::{NodeId, sub_area};
use crate::backend::DebugSurface;
use crate::query::{CollisionQuery, class_matches};
use crate::types::{Rect, Side};

type Stack = SmallVec<[(NodeId, Rect); 32]>;

impl<K, C> IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    fn root_entry(&self) -> Option<(NodeId, Rect)> {
        let root = self.root?;
        Some((root, self.nodes.get(root)?.area()))
    }

    /// Push the children of `id` (area `area`) with their derived areas.
    fn push_children(&self, stack: &mut Stack, id: NodeId, area: &Rect) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for side in [Side::Right, Side::Left] {
            if let Some(child) = node.child(side) {
                let child_area = sub_area(area, node.split_axis(), node.split_pos(), side);
                stack.push((child, child_area));
            }
        }
    }

    /// Root-to-`id` path with the effective area of every node on it.
    pub(super) fn path_to(&self, id: NodeId) -> SmallVec<[(NodeId, Rect); 32]> {
        let mut ids: SmallVec<[NodeId; 32]> = SmallVec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(node) = self.nodes.get(c) else {
                return SmallVec::new();
            };
            ids.push(c);
            cur = node.parent();
        }
        let mut path = SmallVec::new();
        let mut area = Rect::UNBOUNDED;
        let mut parent: Option<NodeId> = None;
        for &c in ids.iter().rev() {
            area = match parent.and_then(|p| self.nodes.get(p)) {
                Some(p) => {
                    let Some(side) = p.child_side(c) else {
                        return SmallVec::new();
                    };
                    sub_area(&area, p.split_axis(), p.split_pos(), side)
                }
                None => match self.nodes.get(c) {
                    Some(root) => root.area(),
                    None => return SmallVec::new(),
                },
            };
            path.push((c, area));
            parent = Some(c);
        }
        path
    }

    /// Visit each distinct actor in nodes overlapping `rect` that matches
    /// `query`. `found` returns `true` to stop the walk.
    pub(super) fn visit_intersecting(
        &self,
        rect: Rect,
        query: &impl CollisionQuery<K, C>,
        mut found: impl FnMut(K) -> bool,
    ) {
        let mut seen = HashSet::new();
        let mut stack: Stack = self.root_entry().into_iter().collect();
        while let Some((id, area)) = stack.pop() {
            if !area.intersects(&rect) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for key in node.actors() {
                if !seen.insert(*key) {
                    continue;
                }
                let Some(tracked) = self.actors.get(key) else {
                    continue;
                };
                if query.check_collision(&tracked.record) && found(*key) {
                    return;
                }
            }
            self.push_children(&mut stack, id, &area);
        }
    }

    /// Every tracked actor of `class`, each once.
    pub(crate) fn all_objects(&self, class: Option<&C>) -> Vec<K> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack: SmallVec<[NodeId; 32]> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for key in node.actors() {
                if !seen.insert(*key) {
                    continue;
                }
                if self
                    .actors
                    .get(key)
                    .is_some_and(|t| class_matches(class, &t.record.class))
                {
                    out.push(*key);
                }
            }
            stack.extend(node.right());
            stack.extend(node.left());
        }
        out
    }

    /// First match among the actors registered at `id` itself.
    fn first_in_node(&self, id: NodeId, query: &impl CollisionQuery<K, C>) -> Option<K> {
        let node = self.nodes.get(id)?;
        node.actors().copied().find(|key| {
            self.actors
                .get(key)
                .is_some_and(|t| query.check_collision(&t.record))
        })
    }

    /// First match in the subtree under `start`, skipping nodes that miss
    /// `rect`.
    fn first_down(
        &self,
        start: (NodeId, Rect),
        rect: &Rect,
        query: &impl CollisionQuery<K, C>,
    ) -> Option<K> {
        let mut stack: Stack = SmallVec::new();
        stack.push(start);
        while let Some((id, area)) = stack.pop() {
            if !area.intersects(rect) {
                continue;
            }
            if let Some(hit) = self.first_in_node(id, query) {
                return Some(hit);
            }
            self.push_children(&mut stack, id, &area);
        }
        None
    }

    /// Any one actor near `key` matching `query`.
    ///
    /// The search starts in the subtree of a node `key` occupies and widens
    /// one level at a time: the parent's own actors, then the sibling
    /// subtree, until the root has been covered.
    pub(super) fn one_intersecting(
        &self,
        key: &K,
        rect: Rect,
        query: &impl CollisionQuery<K, C>,
    ) -> Option<K> {
        let start = self
            .actors
            .get(key)
            .and_then(|t| t.head)
            .and_then(|l| self.links.get(l))
            .map(|l| l.node);
        let path = start.map(|s| self.path_to(s)).unwrap_or_default();
        let Some(&last) = path.last() else {
            return self.first_down(self.root_entry()?, &rect, query);
        };
        if let Some(hit) = self.first_down(last, &rect, query) {
            return Some(hit);
        }
        for pair in path.windows(2).rev() {
            let [(parent, parent_area), (child, _)] = [pair[0], pair[1]];
            if !parent_area.intersects(&rect) {
                continue;
            }
            if let Some(hit) = self.first_in_node(parent, query) {
                return Some(hit);
            }
            let Some(node) = self.nodes.get(parent) else {
                continue;
            };
            let Some(side) = node.child_side(child) else {
                continue;
            };
            if let Some(sibling) = node.child(side.opposite()) {
                let area = sub_area(
                    &parent_area,
                    node.split_axis(),
                    node.split_pos(),
                    side.opposite(),
                );
                if let Some(hit) = self.first_down((sibling, area), &rect, query) {
                    return Some(hit);
                }
            }
        }
        None
    }

    /// Any one actor matching `query` on the single root-to-leaf path of
    /// nodes holding the pixel `(px, py)`.
    pub(super) fn one_at_point(
        &self,
        px: i32,
        py: i32,
        query: &impl CollisionQuery<K, C>,
    ) -> Option<K> {
        let (mut id, mut area) = self.root_entry()?;
        loop {
            if !area.contains_point(px, py) {
                return None;
            }
            if let Some(hit) = self.first_in_node(id, query) {
                return Some(hit);
            }
            let node = self.nodes.get(id)?;
            let (axis, pos) = (node.split_axis(), node.split_pos());
            let side = [Side::Left, Side::Right]
                .into_iter()
                .find(|&s| sub_area(&area, axis, pos, s).contains_point(px, py))?;
            id = node.child(side)?;
            area = sub_area(&area, axis, pos, side);
        }
    }

    /// Draw every node's effective area.
    pub(super) fn paint_nodes(&self, surface: &mut dyn DebugSurface) {
        let mut stack: Stack = self.root_entry().into_iter().collect();
        while let Some((id, area)) = stack.pop() {
            surface.draw_rect(area);
            self.push_children(&mut stack, id, &area);
        }
    }
}
