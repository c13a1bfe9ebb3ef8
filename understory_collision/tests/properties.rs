// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomized comparison of the BSP checker against the linear scan.
//!
//! Both checkers see the same stream of adds, removals, moves, resizes, and
//! sequence starts. After every step each query must return the same set
//! from both, and the tree must pass its own consistency walk (enabled in
//! the config, so a violation panics inside the mutation that caused it).

mod common;

use std::collections::HashMap;

use common::{Kind, Thing, init_logger, sorted};
use proptest::prelude::*;
use understory_collision::{
    CheckerConfig, CollisionChecker, IbspChecker, LinearChecker, Rect,
};

#[derive(Clone, Debug)]
enum Op {
    Add {
        id: u32,
        wall: bool,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    },
    Remove(u32),
    Move {
        id: u32,
        dx: i32,
        dy: i32,
    },
    Resize {
        id: u32,
        w: i32,
        h: i32,
    },
    Tick,
}

fn op(span: i32) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..12_u32, any::<bool>(), -span..=span, -span..=span, 0..6_i32, 0..6_i32)
            .prop_map(|(id, wall, x, y, w, h)| Op::Add { id, wall, x, y, w, h }),
        2 => (0..12_u32).prop_map(Op::Remove),
        4 => (0..12_u32, -3..=3_i32, -3..=3_i32).prop_map(|(id, dx, dy)| Op::Move { id, dx, dy }),
        1 => (0..12_u32, 0..6_i32, 0..6_i32).prop_map(|(id, w, h)| Op::Resize { id, w, h }),
        1 => Just(Op::Tick),
    ]
}

fn scenario() -> impl Strategy<Value = (i32, u32, Vec<Op>)> {
    (
        prop::sample::select(vec![1, 3, 10, 16]),
        prop::sample::select(vec![0_u32, 1, 2, 20]),
        prop::sample::select(vec![5, 20, 200]),
    )
        .prop_flat_map(|(cell_size, threshold, span)| {
            (
                Just(cell_size),
                Just(threshold),
                prop::collection::vec(op(span), 1..80),
            )
        })
}

struct Pair {
    bsp: IbspChecker<u32, Kind>,
    linear: LinearChecker<u32, Kind>,
    host: HashMap<u32, Thing>,
}

impl Pair {
    fn new(cell_size: i32, threshold: u32) -> Self {
        init_logger();
        let config = CheckerConfig::default()
            .with_rebalance_threshold(threshold)
            .with_consistency_checks(true);
        let mut bsp = IbspChecker::with_config(config).unwrap();
        let mut linear = LinearChecker::new();
        CollisionChecker::<Thing>::initialize(&mut bsp, 100, 100, cell_size, false).unwrap();
        CollisionChecker::<Thing>::initialize(&mut linear, 100, 100, cell_size, false).unwrap();
        Self {
            bsp,
            linear,
            host: HashMap::new(),
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Add {
                id,
                wall,
                x,
                y,
                w,
                h,
            } => {
                let kind = if wall { Kind::Wall } else { Kind::Bug };
                let thing = Thing::new(id, kind, x, y, w, h);
                self.host.insert(id, thing);
                self.bsp.add_object(&thing);
                self.linear.add_object(&thing);
            }
            Op::Remove(id) => {
                if let Some(thing) = self.host.remove(&id) {
                    self.bsp.remove_object(&thing);
                    self.linear.remove_object(&thing);
                }
            }
            Op::Move { id, dx, dy } => {
                if let Some(thing) = self.host.get_mut(&id) {
                    let (old_x, old_y) = (thing.x, thing.y);
                    thing.x += dx;
                    thing.y += dy;
                    self.bsp.update_object_location(&*thing, old_x, old_y);
                    self.linear.update_object_location(&*thing, old_x, old_y);
                }
            }
            Op::Resize { id, w, h } => {
                if let Some(thing) = self.host.get_mut(&id) {
                    thing.w = w;
                    thing.h = h;
                    self.bsp.update_object_size(&*thing);
                    self.linear.update_object_size(&*thing);
                }
            }
            Op::Tick => {
                CollisionChecker::<Thing>::start_sequence(&mut self.bsp);
                CollisionChecker::<Thing>::start_sequence(&mut self.linear);
            }
        }
    }

    fn assert_same(&self, probes: &[(i32, i32)]) -> Result<(), TestCaseError> {
        let (bsp, linear) = (&self.bsp, &self.linear);
        let cell_size = bsp.config().cell_size;
        prop_assert_eq!(
            sorted(CollisionChecker::<Thing>::objects(bsp, None)),
            sorted(CollisionChecker::<Thing>::objects(linear, None))
        );
        for class in [None, Some(Kind::Wall), Some(Kind::Bug)] {
            prop_assert_eq!(
                sorted(CollisionChecker::<Thing>::objects(bsp, class)),
                sorted(CollisionChecker::<Thing>::objects(linear, class))
            );
            for &(x, y) in probes {
                let expected = sorted(CollisionChecker::<Thing>::objects_at(linear, x, y, class));
                prop_assert_eq!(
                    sorted(CollisionChecker::<Thing>::objects_at(bsp, x, y, class)),
                    expected.clone(),
                    "objects_at({}, {})",
                    x,
                    y
                );
                let one = CollisionChecker::<Thing>::one_object_at(bsp, None, x, y, class);
                prop_assert_eq!(one.is_some(), !expected.is_empty());
                prop_assert!(one.is_none_or(|k| expected.contains(&k)));

                let rect = Rect::new(x * cell_size, y * cell_size, 3 * cell_size, 2 * cell_size);
                prop_assert_eq!(
                    sorted(CollisionChecker::<Thing>::objects_in_rect(bsp, rect, class)),
                    sorted(CollisionChecker::<Thing>::objects_in_rect(linear, rect, class))
                );
                for radius in [0, 1, 3] {
                    prop_assert_eq!(
                        sorted(CollisionChecker::<Thing>::objects_in_range(
                            bsp, x, y, radius, class
                        )),
                        sorted(CollisionChecker::<Thing>::objects_in_range(
                            linear, x, y, radius, class
                        )),
                        "objects_in_range({}, {}, {})",
                        x,
                        y,
                        radius
                    );
                }
            }
        }
        for thing in self.host.values() {
            for class in [None, Some(Kind::Wall)] {
                let expected = sorted(linear.intersecting_objects(thing, class));
                prop_assert_eq!(sorted(bsp.intersecting_objects(thing, class)), expected.clone());
                let one = bsp.one_intersecting_object(thing, class);
                prop_assert_eq!(one.is_some(), !expected.is_empty(), "actor {}", thing.id);
                prop_assert!(one.is_none_or(|k| expected.contains(&k)));

                let at = CollisionChecker::<Thing>::objects_at(linear, thing.x, thing.y, class);
                let one_at = bsp.one_object_at(Some(thing), thing.x, thing.y, class);
                prop_assert_eq!(one_at.is_some(), at.iter().any(|&k| k != thing.id));
                for (distance, diagonal) in [(1, true), (2, false), (3, true)] {
                    prop_assert_eq!(
                        sorted(bsp.neighbours(thing, distance, diagonal, class)),
                        sorted(linear.neighbours(thing, distance, diagonal, class))
                    );
                }
            }
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn bsp_matches_linear_scan(
        (cell_size, threshold, ops) in scenario(),
        probes in prop::collection::vec((-25..=25_i32, -25..=25_i32), 4),
    ) {
        let mut pair = Pair::new(cell_size, threshold);
        for op in &ops {
            pair.apply(op);
            pair.assert_same(&probes)?;
        }
    }

    #[test]
    fn removing_everything_empties_the_tree((cell_size, threshold, ops) in scenario()) {
        let mut pair = Pair::new(cell_size, threshold);
        for op in &ops {
            pair.apply(op);
        }
        let things: Vec<Thing> = pair.host.values().copied().collect();
        for thing in &things {
            pair.bsp.remove_object(thing);
        }
        prop_assert!(pair.bsp.is_empty());
        prop_assert_eq!(pair.bsp.root(), None);
        prop_assert_eq!(pair.bsp.node_count(), 0);
        prop_assert!(CollisionChecker::<Thing>::objects_list(&pair.bsp).is_empty());
    }

    #[test]
    fn moving_back_restores_answers(
        (cell_size, threshold, ops) in scenario(),
        id in 0..12_u32,
        (dx, dy) in (-40..=40_i32, -40..=40_i32),
        probes in prop::collection::vec((-25..=25_i32, -25..=25_i32), 4),
    ) {
        let mut pair = Pair::new(cell_size, threshold);
        for op in &ops {
            pair.apply(op);
        }
        let Some(&thing) = pair.host.get(&id) else {
            return Ok(());
        };
        let before: Vec<_> = probes
            .iter()
            .map(|&(x, y)| sorted(CollisionChecker::<Thing>::objects_at(&pair.bsp, x, y, None)))
            .collect();
        let mut moved = thing;
        moved.x += dx;
        moved.y += dy;
        pair.bsp.update_object_location(&moved, thing.x, thing.y);
        pair.bsp.update_object_location(&thing, moved.x, moved.y);
        let after: Vec<_> = probes
            .iter()
            .map(|&(x, y)| sorted(CollisionChecker::<Thing>::objects_at(&pair.bsp, x, y, None)))
            .collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(pair.bsp.check_consistency(), Ok(()));
    }

    #[test]
    fn rebalancing_never_changes_answers(
        (cell_size, _threshold, ops) in scenario(),
        probes in prop::collection::vec((-25..=25_i32, -25..=25_i32), 4),
    ) {
        let mut pair = Pair::new(cell_size, 0);
        for op in &ops {
            pair.apply(op);
        }
        let snapshot = |bsp: &IbspChecker<u32, Kind>| -> Vec<Vec<u32>> {
            probes
                .iter()
                .map(|&(x, y)| sorted(CollisionChecker::<Thing>::objects_at(bsp, x, y, None)))
                .collect()
        };
        let before = snapshot(&pair.bsp);
        if let Some(root) = pair.bsp.root() {
            pair.bsp.rebalance(root);
        }
        prop_assert_eq!(snapshot(&pair.bsp), before);
        prop_assert_eq!(pair.bsp.check_consistency(), Ok(()));
        pair.assert_same(&probes)?;
    }
}
