// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Errors

pub use anyhow::Error;
use thiserror::Error as ThisError;

/// The crate's error taxonomy.
///
/// `ConfigError` and `InternalInvariant` are fatal and propagate all the way to the CLI boundary.
/// `NoSolution` is the expected failure mode of a solver that completes without a feasible or
/// optimal result; it is surfaced at render time rather than treated as a bug.
#[derive(Debug, ThisError)]
pub enum PlaceError {
    /// Malformed YAML, a missing required field, a dangling name reference in `datarate`, or an
    /// unknown boundary-handler name. Raised at construction time; fatal.
    #[error("configuration error: {text:?}")]
    ConfigError {
        /// Description of what was wrong and where.
        text: String,
    },

    /// A solver completed without finding a feasible (PSO) or optimal (exact) placement.
    #[error("no solution: {text:?}")]
    NoSolution {
        /// Which solver failed, and why, if known.
        text: String,
    },

    /// An invariant that should be unreachable was violated, e.g. a container index produced
    /// during solution extraction did not belong to any microservice.
    #[error("internal invariant violated: {text:?}. This is a bug, please file a report.")]
    InternalInvariant {
        /// Description of the violated invariant.
        text: String,
    },
}
