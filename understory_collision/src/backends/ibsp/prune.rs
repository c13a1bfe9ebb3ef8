// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pruning of emptied nodes, with subtree grafting.

use core::fmt::Debug;
use core::hash::Hash;

use smallvec::SmallVec;

use super::IbspChecker;
use super::actor_node::LinkId;
use super::node::{NodeId, sub_area};
use crate::types::{Rect, Side};

impl<K, C> IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    /// Prune `node` if it no longer holds any actor.
    pub(super) fn check_remove_node(&mut self, node: NodeId, removed: Option<K>) {
        if self.nodes.get(node).is_some_and(|n| n.is_empty()) {
            self.remove_node(node, removed);
        }
    }

    /// Remove an empty node from the tree.
    ///
    /// With at most one child, the child takes the node's place and area.
    /// With two, the deeper child does, and the shallower subtree is dropped
    /// into it. `removed` is an actor being removed; it is never re-inserted.
    pub(super) fn remove_node(&mut self, node: NodeId, removed: Option<K>) {
        debug_assert!(
            self.nodes.get(node).is_some_and(|n| n.is_empty()),
            "only empty nodes can be pruned"
        );
        let Some(area) = self.nodes.area_of(node) else {
            return;
        };
        let left = self.nodes.child(node, Side::Left);
        let right = self.nodes.child(node, Side::Right);
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let parent = n.parent();
        let slot = parent.and_then(|p| Some((p, self.nodes.get(p)?.child_side(node)?)));
        let (axis, pos) = (n.split_axis(), n.split_pos());
        let (keep, dropped) = match (left, right) {
            (Some(l), Some(r)) => {
                if n.child_depth(Side::Left) >= n.child_depth(Side::Right) {
                    (Some(l), Some((r, Side::Right)))
                } else {
                    (Some(r), Some((l, Side::Left)))
                }
            }
            (one, None) | (None, one) => (one, None),
        };

        self.nodes.take_children(node);
        match slot {
            Some((p, side)) => self.nodes.set_child(p, side, keep),
            None => {
                self.root = keep;
                if let Some(keep) = keep {
                    self.nodes.make_root(keep, area);
                }
            }
        }
        self.free_node(node);
        log::trace!("pruned {node:?}, {keep:?} takes its place");

        if let (Some(dest), Some((dropped, side))) = (keep, dropped) {
            let dropped_area = sub_area(&area, axis, pos, side);
            self.drop_node(dropped, dropped_area, dest, area, removed);
        }
    }

    /// Move the detached subtree `dropped` into the subtree rooted at `dest`.
    fn drop_node(
        &mut self,
        dropped: NodeId,
        dropped_area: Rect,
        dest: NodeId,
        dest_area: Rect,
        removed: Option<K>,
    ) {
        if self.try_graft(dropped, dropped_area, dest, dest_area, removed) {
            return;
        }
        let Some((axis, pos)) = self
            .nodes
            .get(dropped)
            .map(|n| (n.split_axis(), n.split_pos()))
        else {
            return;
        };
        let [left, right] = self.nodes.take_children(dropped);
        for (child, side) in [(left, Side::Left), (right, Side::Right)] {
            if let Some(child) = child {
                let child_area = sub_area(&dropped_area, axis, pos, side);
                self.drop_node(child, child_area, dest, dest_area, removed);
            }
        }

        let links: SmallVec<[LinkId; 16]> = self
            .nodes
            .get(dropped)
            .map(|n| n.links().map(|(_, &l)| l).collect())
            .unwrap_or_default();
        for link in links {
            let Some(key) = self.links.get(link).map(|l| l.key) else {
                continue;
            };
            self.detach_link(link);
            if Some(key) != removed {
                self.reinsert_below(key, dest, dest_area);
            }
        }
        self.free_node(dropped);
        log::trace!("dismantled {dropped:?} into {dest:?}");
    }

    /// Attach `dropped` intact to an empty child slot below `dest`.
    ///
    /// The slot must be reached through nodes whose areas hold the dropped
    /// area, no actor of the dropped subtree may be registered on that path,
    /// and the subtree must not hold `removed`.
    fn try_graft(
        &mut self,
        dropped: NodeId,
        dropped_area: Rect,
        dest: NodeId,
        dest_area: Rect,
        removed: Option<K>,
    ) -> bool {
        let mut path: SmallVec<[NodeId; 32]> = SmallVec::new();
        let mut cur = dest;
        let mut cur_area = dest_area;
        let slot = loop {
            path.push(cur);
            let Some((axis, pos)) = self.nodes.get(cur).map(|n| (n.split_axis(), n.split_pos()))
            else {
                return false;
            };
            let Some(side) = [Side::Left, Side::Right]
                .into_iter()
                .find(|&s| sub_area(&cur_area, axis, pos, s).contains(&dropped_area))
            else {
                return false;
            };
            match self.nodes.child(cur, side) {
                None => break (cur, side),
                Some(child) => {
                    cur_area = sub_area(&cur_area, axis, pos, side);
                    cur = child;
                }
            }
        };
        if !self.subtree_is_disjoint(dropped, &path, removed) {
            return false;
        }
        self.nodes.set_child(slot.0, slot.1, Some(dropped));
        log::trace!("grafted {dropped:?} under {:?} ({:?})", slot.0, slot.1);
        true
    }

    /// Whether no actor under `root` is `removed` or registered on `path`.
    fn subtree_is_disjoint(&self, root: NodeId, path: &[NodeId], removed: Option<K>) -> bool {
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for key in node.actors() {
                if Some(*key) == removed {
                    return false;
                }
                if path
                    .iter()
                    .any(|&p| self.nodes.get(p).is_some_and(|n| n.contains_actor(key)))
                {
                    return false;
                }
            }
            stack.extend(node.left());
            stack.extend(node.right());
        }
        true
    }

    /// Re-insert the part of `key` inside `area` below `node`.
    fn reinsert_below(&mut self, key: K, node: NodeId, area: Rect) {
        let Some(bounds) = self.actors.get(&key).map(|t| t.record.bounds) else {
            return;
        };
        if let Some(part) = Rect::intersection(&bounds, &area) {
            self.insert_object(key, bounds, part, area, None, Some(node));
        }
    }

    fn free_node(&mut self, node: NodeId) {
        if self.pending_rebalance == Some(node) {
            self.pending_rebalance = None;
        }
        self.nodes.free(node);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn checker() -> IbspChecker<u32, ()> {
        IbspChecker::new()
    }

    #[test]
    fn removing_the_only_actor_empties_the_tree() {
        let mut c = checker();
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        c.remove(&1);
        assert_eq!(c.root(), None);
        assert_eq!(c.node_count(), 0);
        assert!(c.is_empty());
    }

    #[test]
    fn single_child_is_spliced_into_place() {
        let mut c = checker();
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        c.track_raw(2, Rect::new(100, 100, 10, 10));
        let root = c.root().unwrap();
        let child = c.occupied_nodes(&2)[0];
        c.remove(&1);
        assert!(c.node(root).is_none(), "emptied root is pruned");
        assert_eq!(c.root(), Some(child));
        assert_eq!(c.node_area(child), Some(Rect::UNBOUNDED));
        assert_eq!(c.check_consistency(), Ok(()));
    }

    #[test]
    fn two_children_keep_the_deeper_side() {
        let mut c = checker();
        // Root splits on y = 0; 2 lands below, 3 and 4 above.
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        c.track_raw(2, Rect::new(0, -50, 10, 10));
        c.track_raw(3, Rect::new(50, 50, 10, 10));
        c.track_raw(4, Rect::new(500, 500, 10, 10));
        let root = c.root().unwrap();
        let node = c.node(root).unwrap();
        assert!(node.left().is_some() && node.right().is_some());
        let deeper = node.right().unwrap();

        c.remove(&1);
        assert_eq!(c.root(), Some(deeper));
        assert_eq!(c.check_consistency(), Ok(()));
        let mut all: Vec<_> = c.all_objects(None);
        all.sort_unstable();
        assert_eq!(all, [2, 3, 4]);
    }

    #[test]
    fn shared_node_survives_until_its_last_occupant_leaves() {
        let mut c = checker();
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        // As large as the root, so it stops there next to 1.
        c.track_raw(2, Rect::UNBOUNDED);
        c.track_raw(3, Rect::new(500, 500, 10, 10));
        let root = c.root().unwrap();
        assert!(c.node(root).unwrap().contains_actor(&1));
        assert!(c.node(root).unwrap().contains_actor(&2));

        c.remove(&1);
        assert_eq!(c.root(), Some(root));
        assert!(c.node(root).unwrap().contains_actor(&2));
        assert_eq!(c.check_consistency(), Ok(()));

        c.remove(&2);
        assert!(c.node(root).is_none());
        assert!(!c.reachable_nodes().contains(&root));
        assert_eq!(c.occupied_nodes(&3), [c.root().unwrap()]);
        assert_eq!(c.check_consistency(), Ok(()));
    }
}
