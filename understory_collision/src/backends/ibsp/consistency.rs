// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural self-check of the tree.

use alloc::format;
use alloc::string::String;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashSet;
use smallvec::SmallVec;

use super::IbspChecker;
use super::node::{NodeId, sub_area};
use crate::error::Error;
use crate::types::{Rect, Side};

fn fail(msg: String) -> Result<(), Error> {
    Err(Error::Inconsistent(msg))
}

impl<K, C> IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    /// Walk the whole tree and report the first broken invariant.
    ///
    /// Checks parent and child links, stored areas against the areas derived
    /// from the root, depth bookkeeping, and that no reachable node is empty.
    /// Every occupancy link must agree with both its node and its actor's
    /// list, and no actor may occupy a node and one of its ancestors. Costs a
    /// full traversal.
    pub fn check_consistency(&self) -> Result<(), Error> {
        let mut reachable = HashSet::new();
        let mut node_links = 0_usize;
        // (node, derived area, no pending area change above it)
        let mut stack: SmallVec<[(NodeId, Rect, bool); 32]> = SmallVec::new();
        if let Some(root) = self.root {
            let Some(node) = self.nodes.get(root) else {
                return fail(format!("root {root:?} is not alive"));
            };
            if node.parent().is_some() {
                return fail(format!("root {root:?} has a parent"));
            }
            stack.push((root, node.area(), true));
        }

        while let Some((id, area, clean)) = stack.pop() {
            if !reachable.insert(id) {
                return fail(format!("{id:?} is reachable twice"));
            }
            let Some(node) = self.nodes.get(id) else {
                return fail(format!("{id:?} is linked but not alive"));
            };
            if clean && node.area() != area {
                return fail(format!(
                    "{id:?} stores area {} but its parent gives {area}",
                    node.area()
                ));
            }
            if node.is_empty() {
                return fail(format!("{id:?} holds no actor"));
            }
            for (key, &link) in node.links() {
                let Some(l) = self.links.get(link) else {
                    return fail(format!("{id:?} refers to a dead link for {key:?}"));
                };
                if l.key != *key || l.node != id {
                    return fail(format!("link {link:?} of {id:?} belongs elsewhere"));
                }
                let Some(tracked) = self.actors.get(key) else {
                    return fail(format!("{id:?} holds untracked actor {key:?}"));
                };
                if !tracked.record.bounds.intersects(&area) {
                    return fail(format!(
                        "{key:?} at {} is registered at {id:?} covering {area}",
                        tracked.record.bounds
                    ));
                }
                node_links += 1;
            }
            let child_clean = clean && !node.needs_ripple();
            for side in [Side::Left, Side::Right] {
                let expected = match node.child(side) {
                    Some(child) => {
                        let Some(c) = self.nodes.get(child) else {
                            return fail(format!("{id:?} has a dead {side:?} child"));
                        };
                        if c.parent() != Some(id) {
                            return fail(format!("{child:?} does not point back to {id:?}"));
                        }
                        let child_area = sub_area(&area, node.split_axis(), node.split_pos(), side);
                        stack.push((child, child_area, child_clean));
                        c.depth()
                    }
                    None => 0,
                };
                if node.child_depth(side) != expected {
                    return fail(format!(
                        "{id:?} records {side:?} depth {} but it is {expected}",
                        node.child_depth(side)
                    ));
                }
            }
        }

        if reachable.len() != self.nodes.len() {
            return fail(format!(
                "{} nodes alive but {} reachable",
                self.nodes.len(),
                reachable.len()
            ));
        }

        let mut listed = 0_usize;
        for (key, tracked) in &self.actors {
            let mut seen = HashSet::new();
            let mut prev = None;
            for link in self.links.list(tracked.head) {
                let Some(l) = self.links.get(link) else {
                    return fail(format!("{key:?} lists a dead link"));
                };
                if l.key != *key {
                    return fail(format!("{key:?} lists a link of {:?}", l.key));
                }
                if self.links.prev(link) != prev {
                    return fail(format!("{key:?}: broken back link at {link:?}"));
                }
                if !seen.insert(l.node) {
                    return fail(format!("{key:?} occupies {:?} twice", l.node));
                }
                if !reachable.contains(&l.node) {
                    return fail(format!("{key:?} occupies unreachable {:?}", l.node));
                }
                if self.nodes.get(l.node).and_then(|n| n.link(key)) != Some(link) {
                    return fail(format!("{:?} does not know {key:?}", l.node));
                }
                let mut up = self.nodes.get(l.node).and_then(|n| n.parent());
                while let Some(ancestor) = up {
                    let Some(n) = self.nodes.get(ancestor) else {
                        break;
                    };
                    if n.link(key).is_some() {
                        return fail(format!(
                            "{key:?} occupies {:?} and its ancestor {ancestor:?}",
                            l.node
                        ));
                    }
                    up = n.parent();
                }
                prev = Some(link);
                listed += 1;
            }
            if seen.is_empty() {
                return fail(format!("{key:?} occupies no node"));
            }
        }
        if listed != node_links || listed != self.links.len() {
            return fail(format!(
                "{} links alive, {listed} listed by actors, {node_links} held by nodes",
                self.links.len()
            ));
        }
        Ok(())
    }

    /// Run [`check_consistency`](Self::check_consistency) when enabled.
    ///
    /// # Panics
    ///
    /// With [`CheckerConfig::consistency_checks`] on, panics when the tree is
    /// inconsistent after `op`.
    ///
    /// [`CheckerConfig::consistency_checks`]: crate::CheckerConfig::consistency_checks
    pub(super) fn check_after(&self, op: &str) {
        if !self.config.consistency_checks {
            return;
        }
        if let Err(err) = self.check_consistency() {
            log::error!("bsp tree inconsistent after {op}: {err}");
            panic!("bsp tree inconsistent after {op}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_is_consistent() {
        let c = IbspChecker::<u32, ()>::new();
        assert_eq!(c.check_consistency(), Ok(()));
    }

    #[test]
    fn detects_a_missing_back_link() {
        let mut c = IbspChecker::<u32, ()>::new();
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        c.track_raw(2, Rect::new(100, 100, 10, 10));
        assert_eq!(c.check_consistency(), Ok(()));
        let child = c.occupied_nodes(&2)[0];
        let link = c.node(child).unwrap().link(&2).unwrap();
        c.nodes.get_mut(child).unwrap().actor_removed(&2);
        assert!(matches!(c.check_consistency(), Err(Error::Inconsistent(_))));
        c.nodes.get_mut(child).unwrap().add_actor(2, link);
        assert_eq!(c.check_consistency(), Ok(()));
    }

    #[test]
    fn detects_an_actor_registered_above_itself() {
        let mut c = IbspChecker::<u32, ()>::new();
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        c.track_raw(2, Rect::new(100, 100, 10, 10));
        let leaf = c.occupied_nodes(&2)[0];
        let parent = c.node(leaf).unwrap().parent().unwrap();
        let head = &mut c.actors.get_mut(&2).unwrap().head;
        let link = c.links.construct(2, parent, head);
        c.nodes.get_mut(parent).unwrap().add_actor(2, link);
        let Err(Error::Inconsistent(msg)) = c.check_consistency() else {
            panic!("ancestor occupancy went unnoticed");
        };
        assert!(msg.contains("ancestor"), "{msg}");
    }

    #[test]
    #[should_panic(expected = "inconsistent after")]
    fn enabled_checks_panic() {
        let mut c = IbspChecker::<u32, ()>::new();
        c.config.consistency_checks = true;
        c.track_raw(1, Rect::new(0, 0, 10, 10));
        let root = c.root().unwrap();
        c.nodes.get_mut(root).unwrap().actor_removed(&1);
        c.check_after("test");
    }
}
