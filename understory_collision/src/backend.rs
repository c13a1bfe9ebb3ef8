// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Checker trait implemented by every collision backend.

use alloc::vec::Vec;

use crate::actor::Actor;
use crate::error::Error;
use crate::types::Rect;

/// Target for the optional diagnostic overlay.
pub trait DebugSurface {
    /// Draw the outline of `rect` (pixel space).
    fn draw_rect(&mut self, rect: Rect);
}

impl DebugSurface for Vec<Rect> {
    fn draw_rect(&mut self, rect: Rect) {
        self.push(rect);
    }
}

/// A collision checker for grid-placed actors.
///
/// The host drives a checker synchronously once per simulation tick: it
/// calls [`start_sequence`][Self::start_sequence], reports every added,
/// removed, moved, or resized actor, and then issues queries. Mutations take
/// `&mut self` and queries `&self`, so the two phases cannot interleave.
///
/// Every `class` argument is an optional filter: `None` matches all actors,
/// `Some(c)` only actors whose [`Actor::class`] equals `c`. Multi-result
/// queries report each actor once, in no particular order.
pub trait CollisionChecker<A: Actor> {
    /// One-time setup. `cell_size` is the pixel size of a grid cell and
    /// scales all footprints; it must be positive.
    fn initialize(
        &mut self,
        world_width: i32,
        world_height: i32,
        cell_size: i32,
        wrap: bool,
    ) -> Result<(), Error>;

    /// Start tracking `actor`. Adding an actor twice re-reads its geometry.
    fn add_object(&mut self, actor: &A);

    /// Stop tracking `actor`. Unknown actors are ignored.
    fn remove_object(&mut self, actor: &A);

    /// `actor` moved from cell `(old_x, old_y)` to its current location.
    fn update_object_location(&mut self, actor: &A, old_x: i32, old_y: i32);

    /// `actor` changed its footprint.
    fn update_object_size(&mut self, actor: &A);

    /// Called once per tick, before the tick's mutations.
    fn start_sequence(&mut self) {}

    /// Actors covering the centre of cell `(x, y)`.
    fn objects_at(&self, x: i32, y: i32, class: Option<A::Class>) -> Vec<A::Key>;

    /// Actors whose bounds overlap `rect` (pixel space).
    fn objects_in_rect(&self, rect: Rect, class: Option<A::Class>) -> Vec<A::Key>;

    /// Actors overlapping `actor`, excluding `actor` itself.
    fn intersecting_objects(&self, actor: &A, class: Option<A::Class>) -> Vec<A::Key>;

    /// Actors whose cell centre is within `radius` cells (Euclidean) of the
    /// centre of cell `(x, y)`.
    fn objects_in_range(&self, x: i32, y: i32, radius: i32, class: Option<A::Class>)
    -> Vec<A::Key>;

    /// Actors located within `distance` cells of `actor`'s cell, excluding
    /// that cell. With `diagonal` the neighbourhood is a square, otherwise a
    /// diamond.
    fn neighbours(
        &self,
        actor: &A,
        distance: i32,
        diagonal: bool,
        class: Option<A::Class>,
    ) -> Vec<A::Key>;

    /// Any one actor overlapping `actor`, other than `actor` itself.
    fn one_intersecting_object(&self, actor: &A, class: Option<A::Class>) -> Option<A::Key>;

    /// Any one actor covering the centre of cell `(x, y)`, other than
    /// `actor`.
    fn one_object_at(
        &self,
        actor: Option<&A>,
        x: i32,
        y: i32,
        class: Option<A::Class>,
    ) -> Option<A::Key>;

    /// Every tracked actor matching `class`.
    fn objects(&self, class: Option<A::Class>) -> Vec<A::Key>;

    /// Every tracked actor.
    fn objects_list(&self) -> Vec<A::Key> {
        self.objects(None)
    }

    /// Draw backend-specific diagnostics.
    fn paint_debug(&self, _surface: &mut dyn DebugSurface) {}
}
