// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree nodes and the generational arena that pools them.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;

use super::actor_node::LinkId;
use crate::types::{Axis, Rect, Side};

/// Identifier for a node of the BSP tree (generational).
///
/// Ids of pruned nodes go stale and never alias a node allocated later in
/// the same slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "NodeId uses 32-bit indices by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// One half of `area` split at `pos` along `axis`.
///
/// `pos` is clamped into `area`, so a split on an edge yields an empty half.
pub(crate) fn sub_area(area: &Rect, axis: Axis, pos: i32, side: Side) -> Rect {
    match axis {
        Axis::X => {
            let split = pos.clamp(area.x(), area.right());
            match side {
                Side::Left => Rect::from_edges(area.x(), area.y(), split, area.top()),
                Side::Right => Rect::from_edges(split, area.y(), area.right(), area.top()),
            }
        }
        Axis::Y => {
            let split = pos.clamp(area.y(), area.top());
            match side {
                Side::Left => Rect::from_edges(area.x(), area.y(), area.right(), split),
                Side::Right => Rect::from_edges(area.x(), split, area.right(), area.top()),
            }
        }
    }
}

/// A node of the BSP tree: a region of the plane, its split, and the actors
/// registered because their bounds overlap the region.
///
/// The stored area of a node is only guaranteed current once every ancestor
/// has propagated its pending area changes; use
/// [`IbspChecker::node_area`][super::IbspChecker::node_area] for the
/// effective area.
#[derive(Clone, Debug)]
pub struct BspNode<K> {
    generation: u32,
    area: Rect,
    split_axis: Axis,
    split_pos: i32,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    actors: HashMap<K, LinkId>,
    // Children still carry areas derived from an older `area`.
    area_ripple: bool,
    left_depth: u32,
    right_depth: u32,
}

impl<K: Copy + Eq + Hash> BspNode<K> {
    fn new(generation: u32, area: Rect, split_axis: Axis, split_pos: i32) -> Self {
        Self {
            generation,
            area,
            split_axis,
            split_pos,
            parent: None,
            left: None,
            right: None,
            actors: HashMap::new(),
            area_ripple: false,
            left_depth: 0,
            right_depth: 0,
        }
    }

    /// Stored area.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Axis the area is split along.
    pub fn split_axis(&self) -> Axis {
        self.split_axis
    }

    /// Absolute coordinate of the split.
    pub fn split_pos(&self) -> i32 {
        self.split_pos
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child below the split.
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// Child above the split.
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Child on `side`.
    pub fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Which side `child` hangs on, if it is a child of this node.
    pub fn child_side(&self, child: NodeId) -> Option<Side> {
        if self.left == Some(child) {
            Some(Side::Left)
        } else if self.right == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// The part of the stored area on `side` of the split.
    pub fn side_area(&self, side: Side) -> Rect {
        sub_area(&self.area, self.split_axis, self.split_pos, side)
    }

    /// The part of the stored area below the split.
    pub fn left_area(&self) -> Rect {
        self.side_area(Side::Left)
    }

    /// The part of the stored area above the split.
    pub fn right_area(&self) -> Rect {
        self.side_area(Side::Right)
    }

    /// Whether `key` is registered here.
    pub fn contains_actor(&self, key: &K) -> bool {
        self.actors.contains_key(key)
    }

    /// Number of actors registered here.
    pub fn number_actors(&self) -> usize {
        self.actors.len()
    }

    /// Whether no actor is registered here.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Keys of the actors registered here, in no particular order.
    pub fn actors(&self) -> impl Iterator<Item = &K> + '_ {
        self.actors.keys()
    }

    /// Height of the subtree rooted here; a leaf has depth 1.
    pub fn depth(&self) -> u32 {
        1 + self.left_depth.max(self.right_depth)
    }

    /// Difference between the depths of the two child subtrees.
    pub fn imbalance(&self) -> u32 {
        self.left_depth.abs_diff(self.right_depth)
    }

    pub(crate) fn child_depth(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_depth,
            Side::Right => self.right_depth,
        }
    }

    pub(crate) fn link(&self, key: &K) -> Option<LinkId> {
        self.actors.get(key).copied()
    }

    pub(crate) fn links(&self) -> impl Iterator<Item = (&K, &LinkId)> + '_ {
        self.actors.iter()
    }

    /// Register `key` through `link`. No-op if it is already registered.
    pub(crate) fn add_actor(&mut self, key: K, link: LinkId) {
        self.actors.entry(key).or_insert(link);
    }

    pub(crate) fn actor_removed(&mut self, key: &K) {
        self.actors.remove(key);
    }

    pub(crate) fn needs_ripple(&self) -> bool {
        self.area_ripple
    }
}

/// Generational arena of tree nodes. Freed slots are reused.
#[derive(Clone, Debug)]
pub(crate) struct NodePool<K> {
    nodes: Vec<Option<BspNode<K>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<K> Default for NodePool<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Debug> NodePool<K> {
    /// Allocate a detached node.
    pub(crate) fn alloc(&mut self, area: Rect, split_axis: Axis, split_pos: i32) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(BspNode::new(generation, area, split_axis, split_pos));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes
                .push(Some(BspNode::new(generation, area, split_axis, split_pos)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Release a node. Its children and parent are left untouched.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<BspNode<K>> {
        if !self.is_alive(id) {
            return None;
        }
        self.free_list.push(id.idx());
        self.nodes[id.idx()].take()
    }

    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&BspNode<K>> {
        self.nodes
            .get(id.idx())
            .and_then(Option::as_ref)
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut BspNode<K>> {
        self.nodes
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .filter(|n| n.generation == id.1)
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Replace the area of `id`; its children are resized on next access.
    pub(crate) fn set_area(&mut self, id: NodeId, area: Rect) {
        if let Some(node) = self.get_mut(id)
            && node.area != area
        {
            node.area = area;
            node.area_ripple = true;
        }
    }

    /// Push a pending area change of `id` down to its children.
    fn flush_ripple(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if !node.area_ripple {
            return;
        }
        node.area_ripple = false;
        let pending = [
            (node.left, node.left_area()),
            (node.right, node.right_area()),
        ];
        for (child, area) in pending {
            if let Some(child) = child {
                self.set_area(child, area);
            }
        }
    }

    /// Child of `id` on `side`, with its area brought up to date.
    pub(crate) fn child(&mut self, id: NodeId, side: Side) -> Option<NodeId> {
        self.flush_ripple(id);
        self.get(id)?.child(side)
    }

    /// The current area of `id`, flushing pending changes along its
    /// ancestor path.
    pub(crate) fn area_of(&mut self, id: NodeId) -> Option<Rect> {
        let mut path: smallvec::SmallVec<[NodeId; 32]> = smallvec::SmallVec::new();
        let mut cur = self.get(id)?.parent;
        while let Some(p) = cur {
            path.push(p);
            cur = self.get(p).and_then(|n| n.parent);
        }
        for &ancestor in path.iter().rev() {
            self.flush_ripple(ancestor);
        }
        self.get(id).map(|n| n.area)
    }

    /// Attach (or, with `None`, detach) the child on `side` of `parent`.
    ///
    /// An attached child takes its area from the parent's split and its
    /// parent link from `parent`. The previous child is not touched. Depths
    /// are updated up the ancestor chain.
    pub(crate) fn set_child(&mut self, parent: NodeId, side: Side, child: Option<NodeId>) {
        let child_depth = child
            .and_then(|c| self.get(c))
            .map_or(0, BspNode::depth);
        let Some(node) = self.get_mut(parent) else {
            return;
        };
        let area = node.side_area(side);
        match side {
            Side::Left => {
                node.left = child;
                node.left_depth = child_depth;
            }
            Side::Right => {
                node.right = child;
                node.right_depth = child_depth;
            }
        }
        if let Some(child) = child {
            if let Some(c) = self.get_mut(child) {
                c.parent = Some(parent);
            }
            self.set_area(child, area);
        }
        self.propagate_depth(parent);
    }

    /// Make `id` a root: no parent, the given area.
    pub(crate) fn make_root(&mut self, id: NodeId, area: Rect) {
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        self.set_area(id, area);
    }

    /// Detach both children of `id` and clear their parent links.
    pub(crate) fn take_children(&mut self, id: NodeId) -> [Option<NodeId>; 2] {
        let Some(node) = self.get_mut(id) else {
            return [None, None];
        };
        let children = [node.left.take(), node.right.take()];
        node.left_depth = 0;
        node.right_depth = 0;
        for child in children.into_iter().flatten() {
            if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
        }
        self.propagate_depth(id);
        children
    }

    /// Recompute child depths from `id` upwards until nothing changes.
    fn propagate_depth(&mut self, mut id: NodeId) {
        loop {
            let Some(node) = self.get(id) else {
                return;
            };
            let depth = node.depth();
            let Some(parent) = node.parent else {
                return;
            };
            let Some(p) = self.get_mut(parent) else {
                return;
            };
            let slot = match p.child_side(id) {
                Some(Side::Left) => &mut p.left_depth,
                Some(Side::Right) => &mut p.right_depth,
                None => return,
            };
            if *slot == depth {
                return;
            }
            *slot = depth;
            id = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> NodePool<u32> {
        NodePool::default()
    }

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut pool = pool();
        let a = pool.alloc(Rect::new(0, 0, 10, 10), Axis::X, 5);
        assert!(pool.free(a).is_some());
        let b = pool.alloc(Rect::new(0, 0, 4, 4), Axis::Y, 2);
        assert_eq!(a.idx(), b.idx(), "slot should be reused");
        assert!(pool.get(a).is_none());
        assert!(pool.get(b).is_some());
        assert!(pool.free(a).is_none(), "freeing a stale id is a no-op");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn sub_areas_split_at_position() {
        let area = Rect::new(0, 0, 10, 6);
        assert_eq!(sub_area(&area, Axis::X, 4, Side::Left), Rect::new(0, 0, 4, 6));
        assert_eq!(sub_area(&area, Axis::X, 4, Side::Right), Rect::new(4, 0, 6, 6));
        assert_eq!(sub_area(&area, Axis::Y, 2, Side::Left), Rect::new(0, 0, 10, 2));
        assert_eq!(sub_area(&area, Axis::Y, 2, Side::Right), Rect::new(0, 2, 10, 4));
        // A split outside the area leaves one half empty.
        assert_eq!(sub_area(&area, Axis::X, 20, Side::Right).width(), 0);
    }

    #[test]
    fn set_child_derives_area_and_depth() {
        let mut pool = pool();
        let root = pool.alloc(Rect::new(0, 0, 100, 100), Axis::X, 50);
        let child = pool.alloc(Rect::new(0, 0, 1, 1), Axis::Y, 0);
        pool.set_child(root, Side::Right, Some(child));
        assert_eq!(pool.get(child).unwrap().area(), Rect::new(50, 0, 50, 100));
        assert_eq!(pool.get(child).unwrap().parent(), Some(root));
        assert_eq!(pool.get(root).unwrap().depth(), 2);
        assert_eq!(pool.get(root).unwrap().imbalance(), 1);

        let grandchild = pool.alloc(Rect::new(0, 0, 1, 1), Axis::X, 75);
        pool.set_child(child, Side::Left, Some(grandchild));
        assert_eq!(pool.get(root).unwrap().depth(), 3);
        assert_eq!(pool.get(root).unwrap().imbalance(), 2);

        pool.set_child(child, Side::Left, None);
        assert_eq!(pool.get(root).unwrap().depth(), 2);
    }

    #[test]
    fn area_changes_ripple_lazily() {
        let mut pool = pool();
        let root = pool.alloc(Rect::new(0, 0, 100, 100), Axis::X, 50);
        let mid = pool.alloc(Rect::new(0, 0, 1, 1), Axis::Y, 50);
        let leaf = pool.alloc(Rect::new(0, 0, 1, 1), Axis::X, 0);
        pool.set_child(root, Side::Left, Some(mid));
        pool.set_child(mid, Side::Right, Some(leaf));
        assert_eq!(pool.area_of(leaf), Some(Rect::new(0, 50, 50, 50)));

        pool.set_area(root, Rect::new(-100, 0, 200, 200));
        // Nothing has been pushed down yet.
        assert_eq!(pool.get(leaf).unwrap().area(), Rect::new(0, 50, 50, 50));
        assert!(pool.get(root).unwrap().needs_ripple());

        assert_eq!(pool.area_of(leaf), Some(Rect::new(-100, 50, 150, 150)));
        assert!(!pool.get(root).unwrap().needs_ripple());
    }

    #[test]
    fn take_children_detaches() {
        let mut pool = pool();
        let root = pool.alloc(Rect::new(0, 0, 100, 100), Axis::X, 50);
        let l = pool.alloc(Rect::new(0, 0, 1, 1), Axis::Y, 50);
        let r = pool.alloc(Rect::new(0, 0, 1, 1), Axis::Y, 50);
        pool.set_child(root, Side::Left, Some(l));
        pool.set_child(root, Side::Right, Some(r));
        assert_eq!(pool.take_children(root), [Some(l), Some(r)]);
        assert_eq!(pool.get(l).unwrap().parent(), None);
        assert_eq!(pool.get(root).unwrap().depth(), 1);
        assert_eq!(pool.len(), 3);
    }
}
