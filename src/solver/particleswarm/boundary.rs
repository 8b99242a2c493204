// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Boundary-handling strategies for the PSO velocity and position updates.
//!
//! Each strategy maps a value, possibly out of the half-open range `[lo, hi)`, back into it (or
//! leaves it alone, for [`Handler::None`]). `Reflecting` is position-only: it additionally signals
//! the caller to negate the particle's stored velocity for that dimension.

use rand::Rng;

use crate::core::Error;
use crate::place_error;

/// A named boundary-handling strategy, fixed for a solver run once chosen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Leave the value untouched, even if out of range.
    None,
    /// Clamp to the nearest bound (absorbing).
    Boundary,
    /// Snap to the bound and negate velocity. Position-only.
    Reflecting,
    /// Wrap modulo the range width.
    Periodic,
    /// Redraw uniformly within the range.
    Random,
}

impl Handler {
    /// Parses a velocity boundary-handler name. `reflecting` is rejected: the velocity update has
    /// no stored velocity of its own to negate.
    pub fn parse_velocity(name: &str) -> Result<Handler, Error> {
        match name {
            "none" => Ok(Handler::None),
            "boundary" => Ok(Handler::Boundary),
            "periodic" => Ok(Handler::Periodic),
            "random" => Ok(Handler::Random),
            other => Err(place_error!(
                ConfigError,
                format!("unknown velocity boundary handler {other:?}")
            )),
        }
    }

    /// Parses a position boundary-handler name.
    pub fn parse_position(name: &str) -> Result<Handler, Error> {
        match name {
            "none" => Ok(Handler::None),
            "boundary" => Ok(Handler::Boundary),
            "periodic" => Ok(Handler::Periodic),
            "random" => Ok(Handler::Random),
            "reflecting" => Ok(Handler::Reflecting),
            other => Err(place_error!(
                ConfigError,
                format!("unknown position boundary handler {other:?}")
            )),
        }
    }

    /// Applies this handler to `value` within `[lo, hi)`, returning the corrected value and
    /// whether the caller's stored velocity for this dimension should be negated (only ever true
    /// for `Reflecting`).
    pub fn apply(self, value: f64, lo: f64, hi: f64, rng: &mut impl Rng) -> (f64, bool) {
        let in_range = value >= lo && value < hi;
        match self {
            Handler::None => (value, false),
            Handler::Boundary => (clamp(value, lo, hi), false),
            Handler::Reflecting => {
                if in_range {
                    (value, false)
                } else {
                    (clamp(value, lo, hi), true)
                }
            }
            Handler::Periodic => (periodic(value, lo, hi), false),
            Handler::Random => {
                if in_range {
                    (value, false)
                } else {
                    let width = (hi - lo).round() as i64;
                    let draw = rng.gen_range(0..width.max(1));
                    (lo + draw as f64, false)
                }
            }
        }
    }
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value < lo {
        lo
    } else if value >= hi {
        hi - 1.0
    } else {
        value
    }
}

fn periodic(value: f64, lo: f64, hi: f64) -> f64 {
    if value >= hi {
        value.rem_euclid(hi)
    } else if value < lo {
        if lo >= 0.0 {
            value.rem_euclid(hi)
        } else {
            value.rem_euclid(hi) - hi
        }
    } else {
        value
    }
}
