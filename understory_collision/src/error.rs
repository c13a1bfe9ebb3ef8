// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by geometry construction, configuration, and the
//! consistency checker.

use alloc::string::String;

/// Errors reported by this crate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A rectangle was built with a negative width or height.
    #[error("rectangle has negative extent: {width}x{height}")]
    NegativeExtent {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },
    /// A rectangle's right or top edge does not fit in an `i32`.
    #[error("rectangle edge overflows: {width}x{height} at ({x}, {y})")]
    EdgeOverflow {
        /// Requested left edge.
        x: i32,
        /// Requested bottom edge.
        y: i32,
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },
    /// The pixel size of a grid cell must be strictly positive.
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(i32),
    /// The tree failed a structural consistency check.
    #[error("tree consistency violated: {0}")]
    Inconsistent(String),
}
