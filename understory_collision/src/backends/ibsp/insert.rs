// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recursive insertion.

use core::fmt::Debug;
use core::hash::Hash;

use super::IbspChecker;
use super::node::{NodeId, sub_area};
use crate::types::{Axis, Rect, Side};

impl<K, C> IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    /// Insert a tracked actor starting at the root.
    pub(super) fn insert_from_root(&mut self, key: K) {
        let Some(bounds) = self.actors.get(&key).map(|t| t.record.bounds) else {
            return;
        };
        let root_area = self
            .root
            .and_then(|r| self.nodes.get(r))
            .map_or(Rect::UNBOUNDED, |n| n.area());
        let remaining = Rect::intersection(&bounds, &root_area).unwrap_or(bounds);
        self.insert_object(key, bounds, remaining, root_area, None, self.root);
    }

    /// Register `key` below `node`, whose area is `area`.
    ///
    /// `full` is the actor's whole bounding box and `remaining` the part of
    /// it inside `area` that still needs covering. A `None` node is an empty
    /// slot of `parent` (or an empty tree) and becomes a new leaf.
    pub(super) fn insert_object(
        &mut self,
        key: K,
        full: Rect,
        remaining: Rect,
        area: Rect,
        parent: Option<(NodeId, Side)>,
        node: Option<NodeId>,
    ) {
        let Some(node) = node else {
            self.create_leaf(key, &remaining, area, parent);
            return;
        };
        if self.mark_if_present(node, &key) {
            return;
        }
        let Some((empty, axis, pos)) = self
            .nodes
            .get(node)
            .map(|n| (n.is_empty(), n.split_axis(), n.split_pos()))
        else {
            return;
        };
        if empty || (area.width() <= full.width() && area.height() <= full.height()) {
            self.add_link(key, node);
            return;
        }
        self.note_imbalance(node);

        for side in [Side::Left, Side::Right] {
            let side_area = sub_area(&area, axis, pos, side);
            if let Some(part) = Rect::intersection(&side_area, &remaining) {
                let child = self.nodes.child(node, side);
                self.insert_object(key, full, part, side_area, Some((node, side)), child);
            }
        }
    }

    /// New leaf for `area`, split across its longer axis at the middle,
    /// moved into the actor's bounds.
    fn create_leaf(
        &mut self,
        key: K,
        remaining: &Rect,
        area: Rect,
        parent: Option<(NodeId, Side)>,
    ) {
        let axis = Axis::longer_of(&area);
        let pos = match axis {
            Axis::X => area.middle_x().clamp(remaining.x(), remaining.right()),
            Axis::Y => area.middle_y().clamp(remaining.y(), remaining.top()),
        };
        let id = self.nodes.alloc(area, axis, pos);
        self.add_link(key, id);
        match parent {
            Some((parent, side)) => self.nodes.set_child(parent, side, Some(id)),
            None => {
                self.nodes.make_root(id, area);
                self.root = Some(id);
            }
        }
        log::trace!("new node {id:?} for {key:?}: {area}, split {axis:?} at {pos}");
    }

    /// If `key` already occupies `node`, mark that link and return `true`.
    fn mark_if_present(&mut self, node: NodeId, key: &K) -> bool {
        match self.nodes.get(node).and_then(|n| n.link(key)) {
            Some(link) => {
                self.links.mark(link);
                true
            }
            None => false,
        }
    }

    /// Register `key` at `node` through a new (marked) link.
    pub(super) fn add_link(&mut self, key: K, node: NodeId) {
        if self.mark_if_present(node, &key) {
            return;
        }
        let Some(tracked) = self.actors.get_mut(&key) else {
            return;
        };
        let link = self.links.construct(key, node, &mut tracked.head);
        if let Some(n) = self.nodes.get_mut(node) {
            n.add_actor(key, link);
        }
    }

    fn note_imbalance(&mut self, node: NodeId) {
        if self.pending_rebalance.is_some() {
            return;
        }
        if let Some(n) = self.nodes.get(node)
            && n.imbalance() > self.config.rebalance_threshold
        {
            log::trace!("{node:?} is imbalanced ({}), scheduling rebuild", n.imbalance());
            self.pending_rebalance = Some(node);
        }
    }
}
