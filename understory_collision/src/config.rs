// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Checker configuration.

use crate::error::Error;

/// Default rebalance threshold: the child depth difference a node may reach
/// before it is rebuilt.
pub const DEFAULT_REBALANCE_THRESHOLD: u32 = 20;

/// Configuration shared by all checker backends.
///
/// Most hosts only set the cell size, via
/// [`CollisionChecker::initialize`][crate::CollisionChecker::initialize].
/// The remaining knobs tune the BSP backend.
///
/// ```rust
/// use understory_collision::CheckerConfig;
///
/// let config = CheckerConfig::default()
///     .with_cell_size(32)
///     .with_rebalance_threshold(8);
/// assert!(config.validate().is_ok());
/// assert!(CheckerConfig::default().with_cell_size(0).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CheckerConfig {
    /// Pixel size of one grid cell. Scales every actor footprint.
    pub cell_size: i32,
    /// World width in cells. Recorded for the host; queries are not clipped.
    pub world_width: i32,
    /// World height in cells. Recorded for the host; queries are not clipped.
    pub world_height: i32,
    /// Whether the host world wraps around. Recorded only; neighbour and
    /// range queries do not wrap.
    pub wrap: bool,
    /// Child depth difference above which a node is scheduled for rebuild.
    pub rebalance_threshold: u32,
    /// Walk the whole tree after every mutation and panic on the first
    /// structural violation. Development aid; off by default.
    pub consistency_checks: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            cell_size: 1,
            world_width: 0,
            world_height: 0,
            wrap: false,
            rebalance_threshold: DEFAULT_REBALANCE_THRESHOLD,
            consistency_checks: false,
        }
    }
}

impl CheckerConfig {
    /// Set the pixel size of a grid cell.
    pub fn with_cell_size(mut self, cell_size: i32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Set the world extent in cells.
    pub fn with_world_size(mut self, width: i32, height: i32) -> Self {
        self.world_width = width;
        self.world_height = height;
        self
    }

    /// Record whether the world wraps.
    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Set the rebalance threshold.
    pub fn with_rebalance_threshold(mut self, threshold: u32) -> Self {
        self.rebalance_threshold = threshold;
        self
    }

    /// Enable or disable the per-mutation consistency walk.
    pub fn with_consistency_checks(mut self, enabled: bool) -> Self {
        self.consistency_checks = enabled;
        self
    }

    /// Check the configuration for values no backend can work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cell_size <= 0 {
            return Err(Error::InvalidCellSize(self.cell_size));
        }
        Ok(())
    }
}
