// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-side actor used by the integration tests.

#![allow(dead_code, reason = "Each test binary uses a different subset.")]

use understory_collision::Actor;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Kind {
    Wall,
    Bug,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Thing {
    pub(crate) id: u32,
    pub(crate) kind: Kind,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

impl Thing {
    pub(crate) fn new(id: u32, kind: Kind, x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            w,
            h,
        }
    }
}

impl Actor for Thing {
    type Key = u32;
    type Class = Kind;

    fn key(&self) -> u32 {
        self.id
    }

    fn class(&self) -> Kind {
        self.kind
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }

    fn width(&self) -> i32 {
        self.w
    }

    fn height(&self) -> i32 {
        self.h
    }
}

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn sorted(mut keys: Vec<u32>) -> Vec<u32> {
    keys.sort_unstable();
    keys
}
