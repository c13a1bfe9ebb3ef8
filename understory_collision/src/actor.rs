// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-side actor contract and the per-actor bookkeeping kept by the
//! checkers.

use core::fmt::Debug;
use core::hash::Hash;

use crate::types::Rect;

/// A simulated entity placed on the host's cell grid.
///
/// The checker never owns actors. It reads their location and footprint when
/// they are added or updated and keeps its own copy of the derived bounds, so
/// the host must call the update methods after every move or resize.
pub trait Actor {
    /// Identity of the actor. Query results are reported as keys.
    type Key: Copy + Eq + Hash + Debug;
    /// Type tag matched by the optional class filter of every query.
    type Class: Copy + Eq + Debug;

    /// Stable identity of this actor.
    fn key(&self) -> Self::Key;

    /// Type tag of this actor.
    fn class(&self) -> Self::Class;

    /// Grid column of the actor's location.
    fn x(&self) -> i32;

    /// Grid row of the actor's location.
    fn y(&self) -> i32;

    /// Footprint width in cells.
    fn width(&self) -> i32;

    /// Footprint height in cells.
    fn height(&self) -> i32;
}

/// Pixel coordinate of the centre of grid cell `cell`.
#[inline]
pub(crate) fn cell_center(cell: i32, cell_size: i32) -> i32 {
    cell.saturating_mul(cell_size).saturating_add(cell_size / 2)
}

/// Pixel-space bounding box of an actor at cell `(x, y)` with a footprint of
/// `width x height` cells.
///
/// The box is centred on the cell's centre pixel (the pixel point queries
/// probe), with its corner rounded down, and is never smaller than one pixel
/// in either direction, so every actor covers its own centre pixel. Actors
/// placed absurdly far away are pulled back inside [`Rect::UNBOUNDED`].
pub fn actor_bounds(x: i32, y: i32, width: i32, height: i32, cell_size: i32) -> Rect {
    let w = width.max(0).saturating_mul(cell_size).max(1);
    let h = height.max(0).saturating_mul(cell_size).max(1);
    Rect::new(corner(x, cell_size, w), corner(y, cell_size, h), w, h)
}

/// `centre - extent / 2` in `i64`, clamped so the whole extent stays inside
/// [`Rect::UNBOUNDED`].
fn corner(cell: i32, cell_size: i32, extent: i32) -> i32 {
    let centre = i64::from(cell) * i64::from(cell_size) + i64::from(cell_size / 2);
    let lo = i64::from(Rect::UNBOUNDED.x());
    let hi = i64::from(Rect::UNBOUNDED.right()) - i64::from(extent);
    i32::try_from((centre - i64::from(extent / 2)).clamp(lo, hi)).unwrap_or(i32::MAX)
}

/// Snapshot of an actor as last seen by a checker.
///
/// Checkers keep one per actor in a side table keyed by [`Actor::Key`], so
/// the host type needs nothing beyond the [`Actor`] accessors.
#[derive(Clone, Debug)]
pub struct ActorRecord<K, C> {
    /// Identity of the actor.
    pub key: K,
    /// Type tag.
    pub class: C,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
    /// Pixel-space bounds at the time of the last add or update.
    pub bounds: Rect,
}

impl<K: Copy, C: Copy> ActorRecord<K, C> {
    /// Capture the current state of `actor`.
    pub(crate) fn capture<A>(actor: &A, cell_size: i32) -> Self
    where
        A: Actor<Key = K, Class = C> + ?Sized,
    {
        Self {
            key: actor.key(),
            class: actor.class(),
            x: actor.x(),
            y: actor.y(),
            bounds: actor_bounds(
                actor.x(),
                actor.y(),
                actor.width(),
                actor.height(),
                cell_size,
            ),
        }
    }

    /// Refresh location and bounds from `actor`.
    pub(crate) fn refresh<A>(&mut self, actor: &A, cell_size: i32)
    where
        A: Actor<Key = K, Class = C> + ?Sized,
    {
        self.class = actor.class();
        self.x = actor.x();
        self.y = actor.y();
        self.bounds = actor_bounds(
            actor.x(),
            actor.y(),
            actor.width(),
            actor.height(),
            cell_size,
        );
    }
}

impl<K, C> ActorRecord<K, C> {
    /// Pixel coordinates of the centre of the actor's cell.
    #[inline]
    pub fn center(&self, cell_size: i32) -> (i32, i32) {
        (cell_center(self.x, cell_size), cell_center(self.y, cell_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_covers_its_cell() {
        assert_eq!(actor_bounds(0, 0, 1, 1, 10), Rect::new(0, 0, 10, 10));
        assert_eq!(actor_bounds(3, -2, 1, 1, 10), Rect::new(30, -20, 10, 10));
    }

    #[test]
    fn wide_footprint_is_centred() {
        // Centre of cell (2, 2) is (25, 25); a 3x1 footprint spans 30 px.
        assert_eq!(actor_bounds(2, 2, 3, 1, 10), Rect::new(10, 20, 30, 10));
        // Even footprints round the corner down.
        assert_eq!(actor_bounds(0, 0, 2, 2, 5), Rect::new(-3, -3, 10, 10));
    }

    #[test]
    fn empty_footprint_keeps_one_pixel() {
        let r = actor_bounds(4, 4, 0, 0, 10);
        assert_eq!(r, Rect::new(45, 45, 1, 1));
        assert!(r.contains_point(cell_center(4, 10), cell_center(4, 10)));
    }

    #[test]
    fn far_away_actor_stays_inside_the_plane() {
        let r = actor_bounds(i32::MAX, i32::MIN, 3, 3, 64);
        assert!(Rect::UNBOUNDED.contains(&r));
        assert_eq!(r.width(), 192);
        let huge = actor_bounds(0, 0, i32::MAX, 1, 64);
        assert!(Rect::UNBOUNDED.contains(&huge));
    }

    #[test]
    fn unit_cell_size() {
        assert_eq!(actor_bounds(7, 8, 1, 1, 1), Rect::new(7, 8, 1, 1));
    }
}
