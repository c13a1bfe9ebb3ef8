// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangles and the axis/side tags used by the tree.

use core::fmt;

use crate::error::Error;

/// Axis-aligned integer rectangle in pixel space.
///
/// The covered region is half-open: `[x, right) x [y, top)`. Width and
/// height are never negative.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Rect {
    /// The area of a root node: half of the `i32` range in each direction.
    ///
    /// Every reasonable actor fits inside it, so the tree never has to grow
    /// a new root.
    pub const UNBOUNDED: Self = Self {
        x: i32::MIN / 2,
        y: i32::MIN / 2,
        width: i32::MAX,
        height: i32::MAX,
    };

    /// Create a new rectangle.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is negative, or if the right or top edge
    /// overflows `i32`. A negative extent is a bug in the caller's footprint
    /// computation and is never clamped. Use [`Rect::try_new`] to get an
    /// error instead.
    #[inline]
    #[track_caller]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        match Self::try_new(x, y, width, height) {
            Ok(rect) => rect,
            Err(err) => panic!("{err}"),
        }
    }

    /// Create a new rectangle, failing if either extent is negative or an
    /// edge falls outside the `i32` range.
    #[inline]
    pub fn try_new(x: i32, y: i32, width: i32, height: i32) -> Result<Self, Error> {
        if width < 0 || height < 0 {
            return Err(Error::NegativeExtent { width, height });
        }
        if x.checked_add(width).is_none() || y.checked_add(height).is_none() {
            return Err(Error::EdgeOverflow {
                x,
                y,
                width,
                height,
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Build a rectangle from its edges. Callers guarantee `left <= right`
    /// and `bottom <= top`.
    #[inline]
    pub(crate) fn from_edges(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        debug_assert!(left <= right && bottom <= top, "inverted rectangle edges");
        Self {
            x: left,
            y: bottom,
            width: right - left,
            height: top - bottom,
        }
    }

    /// Left edge.
    #[inline]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Bottom edge (smallest y).
    #[inline]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Horizontal extent.
    #[inline]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Vertical extent.
    #[inline]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Right edge, exclusive.
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Top edge (largest y), exclusive.
    #[inline]
    pub const fn top(&self) -> i32 {
        self.y + self.height
    }

    /// Horizontal middle, rounded towards the left edge.
    #[inline]
    pub const fn middle_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// Vertical middle, rounded towards the bottom edge.
    #[inline]
    pub const fn middle_y(&self) -> i32 {
        self.y + self.height / 2
    }

    /// Whether `other` lies entirely inside this rectangle.
    ///
    /// Non-strict: a rectangle contains itself, and rectangles touching the
    /// inside of an edge are contained.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.top() >= other.top()
    }

    /// Whether the pixel at `(px, py)` lies inside this rectangle.
    #[inline]
    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        self.x <= px && px < self.right() && self.y <= py && py < self.top()
    }

    /// The overlap of two rectangles, or `None` if they do not overlap with
    /// positive area.
    ///
    /// Touching edges produce `None` rather than a zero-area rectangle, so
    /// "no overlap" stays distinguishable from "degenerate overlap".
    ///
    /// # Examples
    ///
    /// ```
    /// use understory_collision::Rect;
    ///
    /// let a = Rect::new(0, 0, 10, 10);
    /// let b = Rect::new(5, 5, 10, 10);
    /// assert_eq!(Rect::intersection(&a, &b), Some(Rect::new(5, 5, 5, 5)));
    ///
    /// let c = Rect::new(10, 0, 10, 10);
    /// assert_eq!(Rect::intersection(&a, &c), None);
    /// ```
    #[inline]
    pub fn intersection(a: &Self, b: &Self) -> Option<Self> {
        let left = a.x.max(b.x);
        let right = a.right().min(b.right());
        let bottom = a.y.max(b.y);
        let top = a.top().min(b.top());
        if right <= left || top <= bottom {
            return None;
        }
        Some(Self::from_edges(left, bottom, right, top))
    }

    /// Whether the two rectangles overlap with positive area.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.width > 0
            && self.height > 0
            && other.width > 0
            && other.height > 0
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.x,
            self.right(),
            self.y,
            self.top()
        )
    }
}

/// The axis a tree node splits its area along.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Split on a vertical line: left child is `[x, split)`.
    X,
    /// Split on a horizontal line: left child is `[y, split)`.
    Y,
}

impl Axis {
    /// The axis along which `area` is longer; ties go to `Y`.
    #[inline]
    pub(crate) fn longer_of(area: &Rect) -> Self {
        if area.width() > area.height() {
            Self::X
        } else {
            Self::Y
        }
    }
}

/// Which child slot of a tree node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The child below the split position.
    Left,
    /// The child at or above the split position.
    Right,
}

impl Side {
    /// The other side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}
