// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The objective evaluator shared by both placement engines.
//!
//! `evaluate` and `build_placement` both walk the canonical container order against an assignment
//! vector, accumulating per-node resource usage in a scratch buffer that lives only for the
//! duration of the call. Neither function ever touches a field on [`crate::core::Node`] or
//! [`crate::core::Scenario`]: there are none to touch. This is what guarantees the reset-after-
//! every-evaluation invariant structurally rather than by convention.

use crate::core::placement::Placement;
use crate::core::scenario::Scenario;

/// Per-node running totals accumulated during one evaluation. Allocated fresh (or cleared) by the
/// caller; never stored on `Node` or `Scenario`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeUsage {
    pub cpu: u32,
    pub mem: u32,
    pub cont: u32,
}

/// Walks `position` in canonical container order, returning the resulting dense node-major
/// mapping, or `None` the first time a container does not fit the node it was assigned to.
///
/// `position` entries are `i64` rather than `usize` so that a deliberately permissive boundary
/// handler (the `none` policy, see [`crate::solver::particleswarm::boundary`]) can hand back an
/// out-of-range or negative index without the caller needing to pre-validate it: any index
/// outside `[0, nodes.len())` is simply treated as infeasible.
fn walk(scenario: &Scenario, position: &[i64]) -> Option<Vec<Vec<u32>>> {
    let nodes = scenario.nodes();
    let microservices = scenario.microservices();

    let mut usage = vec![NodeUsage::default(); nodes.len()];
    let mut mapping = vec![vec![0u32; microservices.len()]; nodes.len()];

    for container in 0..scenario.total_containers() {
        let i = scenario.microservice_of(container);
        let raw_j = position[container as usize];
        if raw_j < 0 || raw_j as usize >= nodes.len() {
            return None;
        }
        let j = raw_j as usize;
        let microservice = &microservices[i];

        if !nodes[j].fits(&usage[j], microservice) {
            return None;
        }

        usage[j].cpu += microservice.cpu_req;
        usage[j].mem += microservice.mem_req;
        usage[j].cont += 1;
        mapping[j][i] += 1;
    }

    Some(mapping)
}

/// Computes the monetary cost of an already-built dense mapping. Shared with
/// [`crate::solver::exact`], which extracts a mapping directly from MILP variables rather than
/// walking a position vector.
pub(crate) fn cost_of(scenario: &Scenario, mapping: &[Vec<u32>]) -> f64 {
    let nodes = scenario.nodes();
    let microservices = scenario.microservices();
    let used: Vec<bool> = mapping.iter().map(|row| row.iter().any(|&c| c > 0)).collect();

    let infra_cost: f64 = nodes
        .iter()
        .zip(&used)
        .filter(|(_, &u)| u)
        .map(|(n, _)| n.cost)
        .sum();

    let mut data_cost = 0.0;
    for j1 in 0..nodes.len() {
        if !used[j1] {
            continue;
        }
        for j2 in 0..nodes.len() {
            if j1 == j2 || !used[j2] {
                continue;
            }
            let tariff = scenario.data_cost(j1, j2);
            let mut data = 0.0;
            for (i1, m1) in microservices.iter().enumerate() {
                let c1 = mapping[j1][i1];
                if c1 == 0 {
                    continue;
                }
                for (i2, m2) in microservices.iter().enumerate() {
                    let c2 = mapping[j2][i2];
                    if c2 == 0 {
                        continue;
                    }
                    data += scenario.data_rate(i1, i2) * f64::from(c1) * f64::from(c2)
                        / f64::from(m1.containers)
                        / f64::from(m2.containers);
                }
            }
            data_cost += tariff * data;
        }
    }

    infra_cost + data_cost
}

/// The monetary cost of assigning containers per `position`, or `f64::INFINITY` if any container
/// cannot be placed on the node it was assigned to.
///
/// `position[c]` is the node index hosting container `c`, in the canonical order described on
/// [`crate::core::Scenario::microservice_of`].
pub fn evaluate(scenario: &Scenario, position: &[i64]) -> f64 {
    match walk(scenario, position) {
        Some(mapping) => cost_of(scenario, &mapping),
        None => f64::INFINITY,
    }
}

/// Builds the final [`Placement`] for a feasible assignment, or `None` if it is infeasible.
pub fn build_placement(scenario: &Scenario, position: &[i64]) -> Option<Placement> {
    walk(scenario, position).map(Placement::from_dense)
}

/// Evaluates a batch of positions, one cost per entry, in the same order as `positions`.
///
/// Particle evaluation is embarrassingly parallel except for the swarm-best reduction the caller
/// performs afterwards, so with the `rayon-eval` feature enabled this fans the batch out across a
/// thread pool. Without it, the sequential fallback below is used; either way the result order
/// matches input order, but only the sequential path guarantees the cross-thread draw ordering
/// described for the non-parallel evaluation mode, since `evaluate` itself draws no randomness.
#[cfg(feature = "rayon-eval")]
pub fn evaluate_many(scenario: &Scenario, positions: &[Vec<i64>]) -> Vec<f64> {
    use rayon::prelude::*;
    positions.par_iter().map(|p| evaluate(scenario, p)).collect()
}

/// Sequential fallback for [`evaluate_many`] when the `rayon-eval` feature is disabled.
#[cfg(not(feature = "rayon-eval"))]
pub fn evaluate_many(scenario: &Scenario, positions: &[Vec<i64>]) -> Vec<f64> {
    positions.iter().map(|p| evaluate(scenario, p)).collect()
}
