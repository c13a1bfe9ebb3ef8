// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occupancy links: one per (actor, node) pair, threaded into a doubly
//! linked list per actor.

use alloc::vec::Vec;
use core::iter;

use super::node::NodeId;

/// Handle of an occupancy link (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct LinkId(u32, u32);

impl LinkId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "LinkId uses 32-bit indices by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// "Actor `key` occupies `node`."
#[derive(Clone, Debug)]
pub(crate) struct ActorNode<K> {
    generation: u32,
    pub(crate) key: K,
    pub(crate) node: NodeId,
    prev: Option<LinkId>,
    next: Option<LinkId>,
    mark: bool,
}

/// Arena of occupancy links.
///
/// The head of each actor's list lives with the caller (the checker's side
/// table), so list edits take it by `&mut`.
#[derive(Clone, Debug)]
pub(crate) struct Links<K> {
    slots: Vec<Option<ActorNode<K>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<K> Default for Links<K> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<K: Copy> Links<K> {
    /// Create a marked link and prepend it to the list starting at `head`.
    pub(crate) fn construct(&mut self, key: K, node: NodeId, head: &mut Option<LinkId>) -> LinkId {
        let entry = |generation| ActorNode {
            generation,
            key,
            node,
            prev: None,
            next: *head,
            mark: true,
        };
        let id = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(entry(generation));
            LinkId::new(idx, generation)
        } else {
            self.slots.push(Some(entry(1)));
            self.generations.push(1);
            LinkId::new(self.slots.len() - 1, 1)
        };
        if let Some(old) = head.and_then(|h| self.get_mut(h)) {
            old.prev = Some(id);
        }
        *head = Some(id);
        id
    }

    /// Unlink `id` from its actor's list and release it.
    ///
    /// `head` is advanced when `id` was the first link, and becomes `None`
    /// when it was the last one.
    pub(crate) fn remove(&mut self, id: LinkId, head: &mut Option<LinkId>) -> Option<ActorNode<K>> {
        if !self.is_alive(id) {
            return None;
        }
        let link = self.slots[id.idx()].take()?;
        self.free_list.push(id.idx());
        match link.prev.and_then(|p| self.get_mut(p)) {
            Some(prev) => prev.next = link.next,
            None => {
                if *head == Some(id) {
                    *head = link.next;
                }
            }
        }
        if let Some(next) = link.next.and_then(|n| self.get_mut(n)) {
            next.prev = link.prev;
        }
        Some(link)
    }

    pub(crate) fn is_alive(&self, id: LinkId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: LinkId) -> Option<&ActorNode<K>> {
        self.slots
            .get(id.idx())
            .and_then(Option::as_ref)
            .filter(|l| l.generation == id.1)
    }

    fn get_mut(&mut self, id: LinkId) -> Option<&mut ActorNode<K>> {
        self.slots
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .filter(|l| l.generation == id.1)
    }

    /// The link after `id` in its actor's list.
    pub(crate) fn next(&self, id: LinkId) -> Option<LinkId> {
        self.get(id)?.next
    }

    pub(crate) fn prev(&self, id: LinkId) -> Option<LinkId> {
        self.get(id)?.prev
    }

    /// All links of the list starting at `head`.
    pub(crate) fn list(&self, head: Option<LinkId>) -> impl Iterator<Item = LinkId> + '_ {
        iter::successors(head.filter(|&h| self.is_alive(h)), |&l| self.next(l))
    }

    pub(crate) fn mark(&mut self, id: LinkId) {
        if let Some(link) = self.get_mut(id) {
            link.mark = true;
        }
    }

    pub(crate) fn clear_mark(&mut self, id: LinkId) {
        if let Some(link) = self.get_mut(id) {
            link.mark = false;
        }
    }

    /// Read and reset the mark.
    pub(crate) fn check_mark(&mut self, id: LinkId) -> bool {
        self.get_mut(id)
            .is_some_and(|link| core::mem::replace(&mut link.mark, false))
    }

    /// Number of live links.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ibsp::node::NodePool;
    use crate::types::{Axis, Rect};

    fn nodes(n: usize) -> Vec<NodeId> {
        let mut pool = NodePool::<u32>::default();
        (0..n)
            .map(|_| pool.alloc(Rect::new(0, 0, 1, 1), Axis::X, 0))
            .collect()
    }

    #[test]
    fn construct_prepends() {
        let ns = nodes(3);
        let mut links = Links::default();
        let mut head = None;
        let a = links.construct(7_u32, ns[0], &mut head);
        let b = links.construct(7, ns[1], &mut head);
        let c = links.construct(7, ns[2], &mut head);
        assert_eq!(head, Some(c));
        assert_eq!(links.list(head).collect::<Vec<_>>(), [c, b, a]);
        assert_eq!(links.prev(a), Some(b));
        assert_eq!(links.get(b).unwrap().node, ns[1]);
    }

    #[test]
    fn remove_fixes_neighbours_and_head() {
        let ns = nodes(3);
        let mut links = Links::default();
        let mut head = None;
        let a = links.construct(1_u32, ns[0], &mut head);
        let b = links.construct(1, ns[1], &mut head);
        let c = links.construct(1, ns[2], &mut head);

        assert!(links.remove(b, &mut head).is_some());
        assert_eq!(links.list(head).collect::<Vec<_>>(), [c, a]);
        assert_eq!(links.prev(a), Some(c));

        assert!(links.remove(c, &mut head).is_some());
        assert_eq!(head, Some(a));
        assert_eq!(links.prev(a), None);

        assert!(links.remove(a, &mut head).is_some());
        assert_eq!(head, None, "last removal clears the head");
        assert!(links.remove(a, &mut head).is_none(), "stale ids are ignored");
        assert_eq!(links.len(), 0);
    }

    #[test]
    fn marks_are_one_shot() {
        let ns = nodes(1);
        let mut links = Links::default();
        let mut head = None;
        let a = links.construct(1_u32, ns[0], &mut head);
        assert!(links.check_mark(a), "new links start marked");
        assert!(!links.check_mark(a));
        links.mark(a);
        links.clear_mark(a);
        assert!(!links.check_mark(a));
        links.mark(a);
        assert!(links.check_mark(a));
    }

    #[test]
    fn reused_slots_get_new_generation() {
        let ns = nodes(1);
        let mut links = Links::default();
        let mut head = None;
        let a = links.construct(1_u32, ns[0], &mut head);
        links.remove(a, &mut head);
        let b = links.construct(2, ns[0], &mut head);
        assert_ne!(a, b);
        assert!(!links.is_alive(a));
        assert_eq!(links.get(b).unwrap().key, 2);
    }
}
