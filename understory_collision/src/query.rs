// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision predicates evaluated against candidate actors.
//!
//! A spatial traversal only narrows the candidates down to actors registered
//! near the search area. The final yes/no decision for each candidate is made
//! by a [`CollisionQuery`]. Queries are plain values built per call.

use crate::actor::{ActorRecord, cell_center};
use crate::types::Rect;

/// A predicate over actor snapshots.
///
/// Closures implement this trait, so ad-hoc filters need no new type:
///
/// ```rust
/// use understory_collision::{ActorRecord, CollisionQuery, Rect};
///
/// let wide = |a: &ActorRecord<u32, ()>| a.bounds.width() > 10;
/// let record = ActorRecord { key: 1, class: (), x: 0, y: 0, bounds: Rect::new(0, 0, 20, 5) };
/// assert!(wide.check_collision(&record));
/// ```
pub trait CollisionQuery<K, C> {
    /// Whether `actor` matches.
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool;
}

impl<K, C, F> CollisionQuery<K, C> for F
where
    F: Fn(&ActorRecord<K, C>) -> bool,
{
    #[inline]
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        self(actor)
    }
}

/// `None` matches every class.
#[inline]
pub(crate) fn class_matches<C: PartialEq>(filter: Option<&C>, class: &C) -> bool {
    filter.is_none_or(|f| f == class)
}

/// The pixel a cell-coordinate point query probes: the cell's centre.
pub(crate) fn cell_probe(x: i32, y: i32, cell_size: i32) -> (i32, i32) {
    (cell_center(x, cell_size), cell_center(y, cell_size))
}

/// Pixel square of half-side `half` around `(cx, cy)`, both centre pixel
/// rows included, clipped to [`Rect::UNBOUNDED`] where no actor lives.
fn square_around(cx: i32, cy: i32, half: i64) -> Rect {
    let plane = Rect::UNBOUNDED;
    let edges = |c: i32, lo: i32, hi: i32| {
        let c = i64::from(c);
        let a = (c - half).clamp(i64::from(lo), i64::from(hi));
        let b = (c + half + 1).clamp(i64::from(lo), i64::from(hi));
        (a, b)
    };
    let (left, right) = edges(cx, plane.x(), plane.right());
    let (bottom, top) = edges(cy, plane.y(), plane.top());
    // Clamped into the plane, so every edge fits in `i32`.
    let to_i32 = |v: i64| i32::try_from(v).unwrap_or_default();
    Rect::from_edges(to_i32(left), to_i32(bottom), to_i32(right), to_i32(top))
}

/// Search window and exact predicate of a range query around cell `(x, y)`
/// with a radius of `radius` cells. `None` for a negative radius.
pub(crate) fn range_window(
    x: i32,
    y: i32,
    radius: i32,
    cell_size: i32,
) -> Option<(Rect, InRangeQuery)> {
    if radius < 0 {
        return None;
    }
    let (cx, cy) = cell_probe(x, y, cell_size);
    let radius_px = radius.saturating_mul(cell_size);
    let window = square_around(cx, cy, i64::from(radius_px));
    Some((window, InRangeQuery::new(cx, cy, radius_px, cell_size)))
}

/// Search window of a neighbour query: the centre pixels of every cell
/// within `distance` cells of `(x, y)`. `None` for a negative distance.
pub(crate) fn neighbour_window(x: i32, y: i32, distance: i32, cell_size: i32) -> Option<Rect> {
    if distance < 0 {
        return None;
    }
    let (cx, cy) = cell_probe(x, y, cell_size);
    Some(square_around(
        cx,
        cy,
        i64::from(distance) * i64::from(cell_size),
    ))
}

/// Actors whose bounds overlap a rectangle, optionally skipping one actor.
#[derive(Clone, Debug)]
pub struct ActorQuery<K, C> {
    bounds: Rect,
    ignore: Option<K>,
    class: Option<C>,
}

impl<K, C> ActorQuery<K, C> {
    /// Match actors overlapping `bounds` with positive area.
    pub fn new(bounds: Rect, class: Option<C>) -> Self {
        Self {
            bounds,
            ignore: None,
            class,
        }
    }

    /// Never match the actor with key `key`.
    pub fn ignoring(mut self, key: K) -> Self {
        self.ignore = Some(key);
        self
    }
}

impl<K: PartialEq, C: PartialEq> CollisionQuery<K, C> for ActorQuery<K, C> {
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        if self.ignore.as_ref() == Some(&actor.key) {
            return false;
        }
        class_matches(self.class.as_ref(), &actor.class) && actor.bounds.intersects(&self.bounds)
    }
}

/// Actors covering a single pixel.
#[derive(Clone, Debug)]
pub struct PointQuery<C> {
    px: i32,
    py: i32,
    class: Option<C>,
}

impl<C> PointQuery<C> {
    /// Match actors whose bounds contain the pixel `(px, py)`.
    pub fn new(px: i32, py: i32, class: Option<C>) -> Self {
        Self { px, py, class }
    }
}

impl<K, C: PartialEq> CollisionQuery<K, C> for PointQuery<C> {
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        class_matches(self.class.as_ref(), &actor.class)
            && actor.bounds.contains_point(self.px, self.py)
    }
}

/// Actors whose logical cell is a neighbour of a given cell.
///
/// Only locations are compared; footprints are ignored. The origin cell
/// itself never matches.
#[derive(Clone, Debug)]
pub struct NeighbourQuery<C> {
    x: i32,
    y: i32,
    distance: i32,
    diagonal: bool,
    class: Option<C>,
}

impl<C> NeighbourQuery<C> {
    /// Neighbours of cell `(x, y)` within `distance` steps.
    ///
    /// With `diagonal`, diagonal steps count as one step (a square
    /// neighbourhood); without, only the four main directions (a diamond).
    pub fn new(x: i32, y: i32, distance: i32, diagonal: bool, class: Option<C>) -> Self {
        Self {
            x,
            y,
            distance,
            diagonal,
            class,
        }
    }
}

impl<K, C: PartialEq> CollisionQuery<K, C> for NeighbourQuery<C> {
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        if !class_matches(self.class.as_ref(), &actor.class) {
            return false;
        }
        if actor.x == self.x && actor.y == self.y {
            return false;
        }
        let dx = i64::from(actor.x).abs_diff(i64::from(self.x));
        let dy = i64::from(actor.y).abs_diff(i64::from(self.y));
        let distance = u64::try_from(self.distance).unwrap_or(0);
        if self.diagonal {
            dx <= distance && dy <= distance
        } else {
            dx + dy <= distance
        }
    }
}

/// Actors whose cell centre lies within a Euclidean pixel radius.
#[derive(Clone, Debug)]
pub struct InRangeQuery {
    cx: i32,
    cy: i32,
    radius: i32,
    cell_size: i32,
}

impl InRangeQuery {
    /// Match actors whose cell centre is at most `radius` pixels from the
    /// pixel `(cx, cy)`.
    pub fn new(cx: i32, cy: i32, radius: i32, cell_size: i32) -> Self {
        Self {
            cx,
            cy,
            radius,
            cell_size,
        }
    }
}

impl<K, C> CollisionQuery<K, C> for InRangeQuery {
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        let (ax, ay) = actor.center(self.cell_size);
        let dx = i64::from(ax) - i64::from(self.cx);
        let dy = i64::from(ay) - i64::from(self.cy);
        let r = i64::from(self.radius);
        dx * dx + dy * dy <= r * r
    }
}

/// Restrict another query to one class.
#[derive(Clone, Debug)]
pub struct ClassQuery<C, Q> {
    class: C,
    inner: Q,
}

impl<C, Q> ClassQuery<C, Q> {
    /// Match actors of `class` that also match `inner`.
    pub fn new(class: C, inner: Q) -> Self {
        Self { class, inner }
    }
}

impl<K, C: PartialEq, Q: CollisionQuery<K, C>> CollisionQuery<K, C> for ClassQuery<C, Q> {
    fn check_collision(&self, actor: &ActorRecord<K, C>) -> bool {
        actor.class == self.class && self.inner.check_collision(actor)
    }
}
