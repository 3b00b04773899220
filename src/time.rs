//
// Copyright 2024 TeaFile Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Raw tick values.
//!
//! A `Tick` is the integer the Time section's field holds: a count of the
//! containing `TimeScale`'s ticks since its epoch. This crate does not offer
//! date/time arithmetic on ticks (out of scope, see SPEC_FULL.md); callers
//! who need wall-clock conversions pair a `Tick` with the file's `TimeScale`
//! themselves.

/// A raw time-field value: ticks since a `TimeScale`'s epoch.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Tick(pub i64);

impl From<i64> for Tick {
    fn from(ticks: i64) -> Self {
        Tick(ticks)
    }
}

impl From<Tick> for i64 {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}
