// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collision backends.
//!
//! - `ibsp`: incremental binary space partition. Actors are registered at
//!   the tree nodes covering their bounds; queries visit only nodes
//!   overlapping the search area.
//! - `linear`: one record per actor, every query a full scan. The reference
//!   the tree is tested against.
//!
//! Both implement [`CollisionChecker`](crate::CollisionChecker) and share
//! the same query predicates, so they return the same
//! sets for the same input.

pub(crate) mod ibsp;
pub(crate) mod linear;

pub use ibsp::{BspNode, IbspChecker, NodeId};
pub use linear::LinearChecker;
