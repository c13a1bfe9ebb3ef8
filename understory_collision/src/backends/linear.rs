// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear-scan backend.
//!
//! Keeps one [`ActorRecord`] per actor and answers every query by testing
//! each of them. Simple and obviously correct, which makes it the reference
//! the BSP backend is tested against; also a fine choice for a handful of
//! actors.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::actor::{Actor, ActorRecord};
use crate::backend::CollisionChecker;
use crate::config::CheckerConfig;
use crate::error::Error;
use crate::query::{self, ActorQuery, CollisionQuery, NeighbourQuery, PointQuery, class_matches};
use crate::types::Rect;

/// Brute-force collision checker.
#[derive(Clone, Debug)]
pub struct LinearChecker<K, C> {
    config: CheckerConfig,
    records: HashMap<K, ActorRecord<K, C>>,
}

impl<K, C> Default for LinearChecker<K, C> {
    fn default() -> Self {
        Self {
            config: CheckerConfig::default(),
            records: HashMap::new(),
        }
    }
}

impl<K, C> LinearChecker<K, C>
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
            records: HashMap::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no actor is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of a tracked actor.
    pub fn record(&self, key: &K) -> Option<&ActorRecord<K, C>> {
        self.records.get(key)
    }

    fn refresh<A>(&mut self, actor: &A)
    where
        A: Actor<Key = K, Class = C> + ?Sized,
    {
        if let Some(record) = self.records.get_mut(&actor.key()) {
            record.refresh(actor, self.config.cell_size);
        }
    }

    fn filter(&self, query: &impl CollisionQuery<K, C>) -> Vec<K> {
        self.records
            .values()
            .filter(|r| query.check_collision(r))
            .map(|r| r.key)
            .collect()
    }

    fn find(&self, query: &impl CollisionQuery<K, C>) -> Option<K> {
        self.records
            .values()
            .find(|r| query.check_collision(r))
            .map(|r| r.key)
    }
}

impl<A> CollisionChecker<A> for LinearChecker<A::Key, A::Class>
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
        log::debug!("linear checker initialized: {config:?}");
        self.config = config;
        Ok(())
    }

    fn add_object(&mut self, actor: &A) {
        let record = ActorRecord::capture(actor, self.config.cell_size);
        self.records.insert(record.key, record);
    }

    fn remove_object(&mut self, actor: &A) {
        self.records.remove(&actor.key());
    }

    fn update_object_location(&mut self, actor: &A, _old_x: i32, _old_y: i32) {
        self.refresh(actor);
    }

    fn update_object_size(&mut self, actor: &A) {
        self.refresh(actor);
    }

    fn objects_at(&self, x: i32, y: i32, class: Option<A::Class>) -> Vec<A::Key> {
        let (px, py) = query::cell_probe(x, y, self.config.cell_size);
        self.filter(&PointQuery::new(px, py, class))
    }

    fn objects_in_rect(&self, rect: Rect, class: Option<A::Class>) -> Vec<A::Key> {
        self.filter(&ActorQuery::new(rect, class))
    }

    fn intersecting_objects(&self, actor: &A, class: Option<A::Class>) -> Vec<A::Key> {
        let record = ActorRecord::capture(actor, self.config.cell_size);
        self.filter(&ActorQuery::new(record.bounds, class).ignoring(record.key))
    }

    fn objects_in_range(
        &self,
        x: i32,
        y: i32,
        radius: i32,
        class: Option<A::Class>,
    ) -> Vec<A::Key> {
        let Some((_, in_range)) = query::range_window(x, y, radius, self.config.cell_size) else {
            return Vec::new();
        };
        self.filter(&|r: &ActorRecord<A::Key, A::Class>| {
            class_matches(class.as_ref(), &r.class) && in_range.check_collision(r)
        })
    }

    fn neighbours(
        &self,
        actor: &A,
        distance: i32,
        diagonal: bool,
        class: Option<A::Class>,
    ) -> Vec<A::Key> {
        if distance < 0 {
            return Vec::new();
        }
        self.filter(&NeighbourQuery::new(
            actor.x(),
            actor.y(),
            distance,
            diagonal,
            class,
        ))
    }

    fn one_intersecting_object(&self, actor: &A, class: Option<A::Class>) -> Option<A::Key> {
        let record = ActorRecord::capture(actor, self.config.cell_size);
        self.find(&ActorQuery::new(record.bounds, class).ignoring(record.key))
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
        self.find(&|r: &ActorRecord<A::Key, A::Class>| {
            Some(r.key) != ignore && point.check_collision(r)
        })
    }

    fn objects(&self, class: Option<A::Class>) -> Vec<A::Key> {
        self.filter(&|r: &ActorRecord<A::Key, A::Class>| class_matches(class.as_ref(), &r.class))
    }
}
