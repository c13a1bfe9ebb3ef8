// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_collision --heading-base-level=0

//! Understory Collision: a collision index for grid-placed 2D actors.
//!
//! Actors live on an integer cell grid and own a footprint of whole cells.
//! A checker turns each actor into a pixel-space bounding box (centred on
//! its cell, scaled by the cell size) and answers the questions a game loop
//! asks every tick:
//!
//! - which actors cover a cell, or overlap a rectangle or another actor,
//! - which actors are within a Euclidean range or a grid neighbourhood,
//! - any single actor overlapping another actor or covering a cell.
//!
//! Every query takes an optional class filter. Actors are identified by a
//! host-chosen key; the checker stores a snapshot of each actor and never
//! holds on to the host's objects.
//!
//! Two backends implement [`CollisionChecker`]:
//!
//! - [`IbspChecker`]: an incremental binary space partition over an
//!   effectively unbounded plane. Moves only touch the part of the tree
//!   around the actor, emptied nodes are pruned immediately, and lopsided
//!   subtrees are rebuilt at the start of the next tick.
//! - [`LinearChecker`]: a linear scan. The reference implementation, and
//!   adequate for a handful of actors.
//!
//! # Example
//!
//! ```rust
//! use understory_collision::{Actor, CollisionChecker, IbspChecker};
//!
//! #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
//! enum Kind { Wall, Bug }
//!
//! struct Thing { id: u32, kind: Kind, x: i32, y: i32, w: i32 }
//!
//! impl Actor for Thing {
//!     type Key = u32;
//!     type Class = Kind;
//!     fn key(&self) -> u32 { self.id }
//!     fn class(&self) -> Kind { self.kind }
//!     fn x(&self) -> i32 { self.x }
//!     fn y(&self) -> i32 { self.y }
//!     fn width(&self) -> i32 { self.w }
//!     fn height(&self) -> i32 { 1 }
//! }
//!
//! let mut checker = IbspChecker::new();
//! CollisionChecker::<Thing>::initialize(&mut checker, 40, 30, 16, false).unwrap();
//!
//! let wall = Thing { id: 1, kind: Kind::Wall, x: 10, y: 4, w: 3 };
//! let mut bug = Thing { id: 2, kind: Kind::Bug, x: 5, y: 4, w: 1 };
//! checker.add_object(&wall);
//! checker.add_object(&bug);
//!
//! CollisionChecker::<Thing>::start_sequence(&mut checker);
//! let (old_x, old_y) = (bug.x, bug.y);
//! bug.x = 9;
//! checker.update_object_location(&bug, old_x, old_y);
//!
//! // The wall spans cells 9 to 11.
//! assert_eq!(checker.one_intersecting_object(&bug, Some(Kind::Wall)), Some(1));
//! let mut here = CollisionChecker::<Thing>::objects_at(&checker, 9, 4, None);
//! here.sort_unstable();
//! assert_eq!(here, [1, 2]);
//! ```
//!
//! ## Features
//!
//! - `serde`: derive `Serialize` and `Deserialize` for [`CheckerConfig`].
//!
//! ## Logging
//!
//! Backends log through the [`log`] facade: configuration at `debug`,
//! subtree rebuilds at `debug`, and individual node splits, prunes, and
//! grafts at `trace`. Consistency failures are logged at `error` before
//! panicking when [`CheckerConfig::consistency_checks`] is on.

#![no_std]

extern crate alloc;

mod actor;
mod backend;
pub mod backends;
mod config;
mod error;
mod query;
mod types;

pub use actor::{Actor, ActorRecord, actor_bounds};
pub use backend::{CollisionChecker, DebugSurface};
pub use backends::{BspNode, IbspChecker, LinearChecker, NodeId};
pub use config::{CheckerConfig, DEFAULT_REBALANCE_THRESHOLD};
pub use error::Error;
pub use query::{
    ActorQuery, ClassQuery, CollisionQuery, InRangeQuery, NeighbourQuery, PointQuery,
};
pub use types::{Axis, Rect, Side};
