// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental binary space partition checker.
//!
//! The tree covers [`Rect::UNBOUNDED`]. Every node splits its area in two
//! along one axis, and an actor is registered at each node where it stopped
//! descending: a node that was empty, a node no larger than the actor, or a
//! freshly created leaf. An actor straddling a split is registered on both
//! sides, so it may occupy several nodes at once. Each occupancy is a link
//! record; an actor's links form a list whose head is kept in the checker's
//! side table.
//!
//! Empty nodes are pruned as soon as they lose their last actor. A node with
//! two children is replaced by its deeper child, and the shallower subtree is
//! grafted intact into the kept one when its area nests inside an empty slot,
//! or dismantled and its actors re-inserted otherwise.
//!
//! Insertion remembers the first node it passes whose child depths differ by
//! more than [`CheckerConfig::rebalance_threshold`]; the next
//! [`start_sequence`][CollisionChecker::start_sequence] rebuilds that subtree.

mod actor_node;
mod consistency;
mod insert;
mod node;
mod prune;
mod search;

use alloc::vec::Vec;
use core::fmt::{self, Debug};
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use self::actor_node::{LinkId, Links};
use self::node::NodePool;
pub use self::node::{BspNode, NodeId};
use crate::actor::{Actor, ActorRecord};
use crate::backend::{CollisionChecker, DebugSurface};
use crate::config::CheckerConfig;
use crate::error::Error;
use crate::query::{self, ActorQuery, CollisionQuery, NeighbourQuery, PointQuery};
use crate::types::Rect;

/// Side-table entry: the actor snapshot plus the head of its link list.
#[derive(Clone, Debug)]
struct Tracked<K, C> {
    record: ActorRecord<K, C>,
    head: Option<LinkId>,
}

/// BSP-tree collision checker.
///
/// ```rust
/// use understory_collision::{Actor, CollisionChecker, IbspChecker};
///
/// struct Dot { id: u32, x: i32, y: i32 }
///
/// impl Actor for Dot {
///     type Key = u32;
///     type Class = ();
///     fn key(&self) -> u32 { self.id }
///     fn class(&self) {}
///     fn x(&self) -> i32 { self.x }
///     fn y(&self) -> i32 { self.y }
///     fn width(&self) -> i32 { 1 }
///     fn height(&self) -> i32 { 1 }
/// }
///
/// let mut checker = IbspChecker::new();
/// CollisionChecker::<Dot>::initialize(&mut checker, 60, 40, 10, false).unwrap();
///
/// let mut a = Dot { id: 1, x: 0, y: 0 };
/// checker.add_object(&a);
/// assert_eq!(CollisionChecker::<Dot>::objects_at(&checker, 0, 0, None), [1]);
///
/// let (old_x, old_y) = (a.x, a.y);
/// a.x = 3;
/// checker.update_object_location(&a, old_x, old_y);
/// assert!(CollisionChecker::<Dot>::objects_at(&checker, 0, 0, None).is_empty());
/// assert_eq!(CollisionChecker::<Dot>::objects_at(&checker, 3, 0, None), [1]);
/// ```
pub struct IbspChecker<K, C> {
    config: CheckerConfig,
    nodes: NodePool<K>,
    links: Links<K>,
    actors: HashMap<K, Tracked<K, C>>,
    root: Option<NodeId>,
    pending_rebalance: Option<NodeId>,
}

impl<K, C> Debug for IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbspChecker")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("actors", &self.actors.len())
            .field("root", &self.root)
            .field("pending_rebalance", &self.pending_rebalance)
            .finish()
    }
}

impl<K, C> Default for IbspChecker<K, C> {
    fn default() -> Self {
        Self {
            config: CheckerConfig::default(),
            nodes: NodePool::default(),
            links: Links::default(),
            actors: HashMap::new(),
            root: None,
            pending_rebalance: None,
        }
    }
}

impl<K, C> IbspChecker<K, C>
where
    K: Copy + Eq + Hash + Debug,
    C: Copy + Eq + Debug,
{
    /// Create an empty checker with the default configuration (cell size 1).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty checker with an explicit configuration.
    pub fn with_config(config: CheckerConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether no actor is tracked.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Snapshot of a tracked actor.
    pub fn record(&self, key: &K) -> Option<&ActorRecord<K, C>> {
        self.actors.get(key).map(|t| &t.record)
    }

    /// Root of the tree, `None` while no actor is tracked.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// A live node of the tree.
    pub fn node(&self, id: NodeId) -> Option<&BspNode<K>> {
        self.nodes.get(id)
    }

    /// The effective area of a node, with pending area changes of its
    /// ancestors applied.
    pub fn node_area(&self, id: NodeId) -> Option<Rect> {
        self.path_to(id).last().map(|&(_, area)| area)
    }

    /// Nodes `key` is registered at, most recently registered first.
    pub fn occupied_nodes(&self, key: &K) -> Vec<NodeId> {
        let head = self.actors.get(key).and_then(|t| t.head);
        self.links
            .list(head)
            .filter_map(|l| self.links.get(l).map(|l| l.node))
            .collect()
    }

    /// All nodes reachable from the root, parents before children.
    pub fn reachable_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: SmallVec<[NodeId; 32]> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.right());
            stack.extend(node.left());
        }
        out
    }

    /// Number of live tree nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Height of the tree; 0 when empty.
    pub fn depth(&self) -> u32 {
        self.root
            .and_then(|r| self.nodes.get(r))
            .map_or(0, BspNode::depth)
    }

    /// The node scheduled for rebuild at the next sequence start.
    pub fn pending_rebalance(&self) -> Option<NodeId> {
        self.pending_rebalance
    }

    /// Start tracking an actor.
    pub fn add<A>(&mut self, actor: &A)
    where
        A: Actor<Key = K, Class = C> + ?Sized,
    {
        let key = actor.key();
        if self.actors.contains_key(&key) {
            self.update(actor);
            return;
        }
        let record = ActorRecord::capture(actor, self.config.cell_size);
        self.actors.insert(key, Tracked { record, head: None });
        self.insert_from_root(key);
        self.check_after("add");
    }

    /// Stop tracking an actor. Unknown keys are ignored.
    pub fn remove(&mut self, key: &K) {
        if !self.actors.contains_key(key) {
            return;
        }
        self.remove_all_links(*key);
        self.actors.remove(key);
        self.check_after("remove");
    }

    /// Re-read an actor's location and footprint and move its occupancies.
    ///
    /// Actors the checker has never seen are ignored.
    pub fn update<A>(&mut self, actor: &A)
    where
        A: Actor<Key = K, Class = C> + ?Sized,
    {
        let key = actor.key();
        let cell_size = self.config.cell_size;
        let Some(tracked) = self.actors.get_mut(&key) else {
            return;
        };
        tracked.record.refresh(actor, cell_size);
        let bounds = tracked.record.bounds;
        let links: SmallVec<[LinkId; 8]> = self.links.list(tracked.head).collect();

        // Cull occupancies the actor has left. One that still holds the
        // whole actor makes every other occupancy redundant.
        for &link in &links {
            let Some(node) = self.links.get(link).map(|l| l.node) else {
                continue;
            };
            let Some(area) = self.nodes.area_of(node) else {
                continue;
            };
            if area.contains(&bounds) {
                for &other in &links {
                    if other != link && self.links.is_alive(other) {
                        self.remove_link_and_prune(other, None);
                    }
                }
                self.check_after("update");
                return;
            }
            if !area.intersects(&bounds) {
                self.remove_link_and_prune(link, None);
                continue;
            }
            self.links.clear_mark(link);
        }

        // Re-insert from the nearest ancestor holding the whole actor.
        let first = self.head(&key).and_then(|l| self.links.get(l)).map(|l| l.node);
        match first.and_then(|node| self.containing_ancestor(node, &bounds)) {
            Some((start, area)) => {
                let remaining = Rect::intersection(&bounds, &area).unwrap_or(bounds);
                self.insert_object(key, bounds, remaining, area, None, Some(start));
            }
            None => self.insert_from_root(key),
        }

        // Anything the insertion did not touch is stale.
        let current: SmallVec<[LinkId; 8]> = self.links.list(self.head(&key)).collect();
        let stale: SmallVec<[LinkId; 8]> = current
            .into_iter()
            .filter(|&l| !self.links.check_mark(l))
            .collect();
        for link in stale {
            if self.links.is_alive(link) {
                self.remove_link_and_prune(link, None);
            }
        }
        self.check_after("update");
    }

    /// Rebuild the subtree under `node`: every actor registered there is
    /// removed from the whole tree and re-inserted from the root.
    ///
    /// Query results are unaffected; only the tree shape changes. Stale ids
    /// are ignored.
    pub fn rebalance(&mut self, node: NodeId) {
        if !self.nodes.is_alive(node) {
            return;
        }
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(node);
        while let Some(id) = stack.pop() {
            let Some(n) = self.nodes.get(id) else {
                continue;
            };
            keys.extend(n.actors().copied().filter(|k| seen.insert(*k)));
            stack.extend(n.left());
            stack.extend(n.right());
        }
        log::debug!(
            "rebalancing {node:?} (imbalance {}): {} actors",
            self.nodes.get(node).map_or(0, BspNode::imbalance),
            keys.len()
        );
        for &key in &keys {
            self.remove_all_links(key);
        }
        for key in keys {
            self.insert_from_root(key);
        }
        self.check_after("rebalance");
    }

    fn head(&self, key: &K) -> Option<LinkId> {
        self.actors.get(key).and_then(|t| t.head)
    }

    /// Walk up from `node` to the first ancestor whose area holds `bounds`,
    /// falling back to the root.
    fn containing_ancestor(&mut self, node: NodeId, bounds: &Rect) -> Option<(NodeId, Rect)> {
        let mut cur = node;
        loop {
            let area = self.nodes.area_of(cur)?;
            if area.contains(bounds) {
                return Some((cur, area));
            }
            match self.nodes.get(cur)?.parent() {
                Some(parent) => cur = parent,
                None => return Some((cur, area)),
            }
        }
    }

    /// Remove every occupancy of `key`, keeping its record.
    fn remove_all_links(&mut self, key: K) {
        while let Some(link) = self.head(&key) {
            self.remove_link_and_prune(link, Some(key));
        }
    }

    /// Detach `link` from its node and its actor's list.
    fn detach_link(&mut self, link: LinkId) -> Option<NodeId> {
        let key = self.links.get(link)?.key;
        let mut orphan = None;
        let head = match self.actors.get_mut(&key) {
            Some(tracked) => &mut tracked.head,
            None => &mut orphan,
        };
        let removed = self.links.remove(link, head)?;
        if let Some(node) = self.nodes.get_mut(removed.node) {
            node.actor_removed(&key);
        }
        Some(removed.node)
    }

    /// Detach `link` and prune its node if that emptied it.
    fn remove_link_and_prune(&mut self, link: LinkId, removed: Option<K>) {
        if let Some(node) = self.detach_link(link) {
            self.check_remove_node(node, removed);
        }
    }

    /// Multi-result traversal shared by the rectangle queries.
    fn collect(&self, rect: Rect, query: &impl CollisionQuery<K, C>) -> Vec<K> {
        let mut out = Vec::new();
        self.visit_intersecting(rect, query, |key| {
            out.push(key);
            false
        });
        out
    }
}

impl<A> CollisionChecker<A> for IbspChecker<A::Key, A::Class>
where
    A: Actor,
{
    fn initialize(
        &mut self,
        world_width: i32,
        world_height: i32,
        cell_size: i32,
        wrap: bool,
    ) -> Result<(), Error> {
        let config = self
            .config
            .with_cell_size(cell_size)
            .with_world_size(world_width, world_height)
            .with_wrap(wrap);
        config.validate()?;
        log::debug!("bsp checker initialized: {config:?}");
        self.config = config;
        Ok(())
    }

    fn add_object(&mut self, actor: &A) {
        self.add(actor);
    }

    fn remove_object(&mut self, actor: &A) {
        self.remove(&actor.key());
    }

    fn update_object_location(&mut self, actor: &A, _old_x: i32, _old_y: i32) {
        self.update(actor);
    }

    fn update_object_size(&mut self, actor: &A) {
        self.update(actor);
    }

    fn start_sequence(&mut self) {
        if let Some(node) = self.pending_rebalance.take() {
            self.rebalance(node);
        }
    }

    fn objects_at(&self, x: i32, y: i32, class: Option<A::Class>) -> Vec<A::Key> {
        let (px, py) = query::cell_probe(x, y, self.config.cell_size);
        self.collect(Rect::new(px, py, 1, 1), &PointQuery::new(px, py, class))
    }

    fn objects_in_rect(&self, rect: Rect, class: Option<A::Class>) -> Vec<A::Key> {
        self.collect(rect, &ActorQuery::new(rect, class))
    }

    fn intersecting_objects(&self, actor: &A, class: Option<A::Class>) -> Vec<A::Key> {
        let record = ActorRecord::capture(actor, self.config.cell_size);
        let query = ActorQuery::new(record.bounds, class).ignoring(record.key);
        self.collect(record.bounds, &query)
    }

    fn objects_in_range(
        &self,
        x: i32,
        y: i32,
        radius: i32,
        class: Option<A::Class>,
    ) -> Vec<A::Key> {
        let Some((window, in_range)) = query::range_window(x, y, radius, self.config.cell_size)
        else {
            return Vec::new();
        };
        self.collect(window, &|r: &ActorRecord<A::Key, A::Class>| {
            query::class_matches(class.as_ref(), &r.class) && in_range.check_collision(r)
        })
    }

    fn neighbours(
        &self,
        actor: &A,
        distance: i32,
        diagonal: bool,
        class: Option<A::Class>,
    ) -> Vec<A::Key> {
        let (x, y) = (actor.x(), actor.y());
        let Some(window) = query::neighbour_window(x, y, distance, self.config.cell_size) else {
            return Vec::new();
        };
        self.collect(window, &NeighbourQuery::new(x, y, distance, diagonal, class))
    }

    fn one_intersecting_object(&self, actor: &A, class: Option<A::Class>) -> Option<A::Key> {
        let record = ActorRecord::capture(actor, self.config.cell_size);
        let query = ActorQuery::new(record.bounds, class).ignoring(record.key);
        self.one_intersecting(&record.key, record.bounds, &query)
    }

    fn one_object_at(
        &self,
        actor: Option<&A>,
        x: i32,
        y: i32,
        class: Option<A::Class>,
    ) -> Option<A::Key> {
        let (px, py) = query::cell_probe(x, y, self.config.cell_size);
        let ignore = actor.map(A::key);
        let point = PointQuery::new(px, py, class);
        self.one_at_point(px, py, &|r: &ActorRecord<A::Key, A::Class>| {
            Some(r.key) != ignore && point.check_collision(r)
        })
    }

    fn objects(&self, class: Option<A::Class>) -> Vec<A::Key> {
        self.all_objects(class.as_ref())
    }

    fn paint_debug(&self, surface: &mut dyn DebugSurface) {
        self.paint_nodes(surface);
    }
}
