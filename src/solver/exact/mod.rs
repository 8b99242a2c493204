// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Exact engine
//!
//! Formulates the placement problem as a mixed-integer program and hands it to the `highs`
//! backend through `good_lp`. The quadratic data-cost cross term is linearized with a standard
//! AND-gadget (`pair <= a`, `pair <= b`, `pair >= a + b - 1`); `used[k]` is linked to `sched` by a
//! one-sided inequality rather than a native max-equality, since `good_lp`'s modeling API does not
//! expose one — the objective direction (minimizing a positive coefficient on `used[k]`) makes the
//! inequality exact at the optimum.

use std::collections::HashMap;

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use slog::{debug, info};

use crate::core::{cost_of, Error, Placement, Scenario};
use crate::place_error;

/// A single pair-linearization key: `(i1, j1, k1, i2, j2, k2)` addresses the AND of "container j1
/// of microservice i1 is scheduled on node k1" and "container j2 of microservice i2 is scheduled
/// on node k2".
type PairKey = (usize, u32, usize, usize, u32, usize);

/// The exact MILP-based placement engine.
#[derive(Debug, Clone)]
pub struct ExactSolver {
    time_limit_seconds: f64,
    cost_only: bool,
}

impl Default for ExactSolver {
    fn default() -> Self {
        ExactSolver {
            time_limit_seconds: 30.0,
            cost_only: false,
        }
    }
}

impl ExactSolver {
    /// Constructs an instance with a 30 second wall-clock time limit and data-cost modeling
    /// enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wall-clock time limit handed to the MILP backend.
    pub fn with_time_limit_seconds(mut self, seconds: f64) -> Result<Self, Error> {
        if seconds <= 0.0 {
            return Err(place_error!(ConfigError, "time limit must be positive"));
        }
        self.time_limit_seconds = seconds;
        Ok(self)
    }

    /// When `true`, skips the `pair` linearization and data-cost term entirely, modeling only
    /// node-usage cost. The escape hatch for the `O((T*N)^2)` blow-up in the `pair` variable
    /// count.
    pub fn with_cost_only(mut self, cost_only: bool) -> Self {
        self.cost_only = cost_only;
        self
    }

    /// Builds and solves the MILP, returning the optimal placement and its cost, or
    /// [`crate::core::PlaceError::NoSolution`] if the backend does not reach an optimal solution
    /// within the time limit.
    pub fn solve(&self, scenario: &Scenario, logger: &slog::Logger) -> Result<(Placement, f64), Error> {
        let microservices = scenario.microservices();
        let nodes = scenario.nodes();
        let num_nodes = nodes.len();

        let mut vars = variables!();

        let sched: Vec<Vec<Vec<Variable>>> = microservices
            .iter()
            .enumerate()
            .map(|(i, m)| {
                (0..m.containers)
                    .map(|j| {
                        (0..num_nodes)
                            .map(|k| vars.add(variable().binary().name(format!("sched_{i}_{j}_{k}"))))
                            .collect()
                    })
                    .collect()
            })
            .collect();

        let used: Vec<Variable> = (0..num_nodes)
            .map(|k| vars.add(variable().binary().name(format!("used_{k}"))))
            .collect();

        let pair: HashMap<PairKey, Variable> = if self.cost_only {
            HashMap::new()
        } else {
            build_pair_variables(&mut vars, scenario)
        };

        debug!(
            logger,
            "built decision variables";
            "sched" => microservices.iter().map(|m| m.containers as usize).sum::<usize>() * num_nodes,
            "used" => num_nodes,
            "pair" => pair.len(),
        );

        let mut objective = Expression::from(0.0);
        for (k, node) in nodes.iter().enumerate() {
            objective += used[k] * node.cost;
        }
        if !self.cost_only {
            for (&(i1, j1, k1, i2, j2, k2), &var) in &pair {
                let _ = (j1, j2);
                let coef = scenario.data_cost(k1, k2) * scenario.data_rate(i1, i2)
                    / f64::from(microservices[i1].containers)
                    / f64::from(microservices[i2].containers);
                objective += var * coef;
            }
        }

        let mut problem = vars
            .minimise(objective)
            .using(highs)
            .set_time_limit(self.time_limit_seconds);

        for (i, m) in microservices.iter().enumerate() {
            for j in 0..m.containers {
                let total: Expression = (0..num_nodes).map(|k| sched[i][j as usize][k]).sum();
                problem = problem.with(constraint!(total == 1));
            }
        }

        for k in 0..num_nodes {
            let cpu_used: Expression = microservices
                .iter()
                .enumerate()
                .flat_map(|(i, m)| (0..m.containers).map(move |j| (i, j)))
                .map(|(i, j)| sched[i][j as usize][k] * f64::from(microservices[i].cpu_req))
                .sum();
            let mem_used: Expression = microservices
                .iter()
                .enumerate()
                .flat_map(|(i, m)| (0..m.containers).map(move |j| (i, j)))
                .map(|(i, j)| sched[i][j as usize][k] * f64::from(microservices[i].mem_req))
                .sum();
            let cont_used: Expression = microservices
                .iter()
                .enumerate()
                .flat_map(|(i, m)| (0..m.containers).map(move |j| (i, j)))
                .map(|(i, j)| sched[i][j as usize][k])
                .sum();

            problem = problem.with(constraint!(cpu_used <= f64::from(nodes[k].cpu_lim)));
            problem = problem.with(constraint!(mem_used <= f64::from(nodes[k].mem_lim)));
            problem = problem.with(constraint!(cont_used <= f64::from(nodes[k].cont_lim)));
        }

        for (i, m) in microservices.iter().enumerate() {
            for j in 0..m.containers {
                for k in 0..num_nodes {
                    problem = problem.with(constraint!(used[k] >= sched[i][j as usize][k]));
                }
            }
        }

        for (&(i1, j1, k1, i2, j2, k2), &p) in &pair {
            let a = sched[i1][j1 as usize][k1];
            let b = sched[i2][j2 as usize][k2];
            problem = problem.with(constraint!(p <= a));
            problem = problem.with(constraint!(p <= b));
            problem = problem.with(constraint!(p >= a + b - 1.0));
        }

        debug!(logger, "solving MILP"; "time_limit_seconds" => self.time_limit_seconds);
        let solution = problem
            .solve()
            .map_err(|e| place_error!(NoSolution, format!("MILP backend failed: {e}")))?;
        info!(logger, "MILP solve complete");

        let mut mapping = vec![vec![0u32; microservices.len()]; num_nodes];
        for (i, m) in microservices.iter().enumerate() {
            for j in 0..m.containers {
                for k in 0..num_nodes {
                    if solution.value(sched[i][j as usize][k]) > 0.5 {
                        mapping[k][i] += 1;
                    }
                }
            }
        }

        let cost = cost_of(scenario, &mapping);
        let placement = Placement::from_dense(mapping);

        Ok((placement, cost))
    }
}

/// Builds one `pair` variable per `(i1,j1,k1,i2,j2,k2)` combination, skipping microservice pairs
/// with no declared data rate (they would contribute 0 to the objective regardless) and pairs
/// where `k1 == k2` (the intra-node data cost is always 0).
fn build_pair_variables(
    vars: &mut good_lp::ProblemVariables,
    scenario: &Scenario,
) -> HashMap<PairKey, Variable> {
    let microservices = scenario.microservices();
    let num_nodes = scenario.nodes().len();
    let mut pair = HashMap::new();

    for (i1, m1) in microservices.iter().enumerate() {
        for (i2, m2) in microservices.iter().enumerate() {
            if !scenario.has_data_rate(i1, i2) {
                continue;
            }
            for j1 in 0..m1.containers {
                for k1 in 0..num_nodes {
                    for j2 in 0..m2.containers {
                        for k2 in 0..num_nodes {
                            if k1 == k2 {
                                continue;
                            }
                            let key = (i1, j1, k1, i2, j2, k2);
                            pair.entry(key).or_insert_with(|| {
                                vars.add(variable().binary().name(format!(
                                    "pair_{i1}_{j1}_{k1}_{i2}_{j2}_{k2}"
                                )))
                            });
                        }
                    }
                }
            }
        }
    }

    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Scenario {
        Scenario::from_yaml(
            r#"
microservices:
  web: { cpureq: 100, memreq: 256, containers: 2 }
nodes:
  a: { cost: 10.0, cpulim: 200, memlim: 512, contlim: 2, zone: z1 }
  b: { cost: 20.0, cpulim: 400, memlim: 1024, contlim: 4, zone: z2 }
data_cost:
  intrazone: 1.0
  interzone: 2.0
"#,
        )
        .unwrap()
    }

    #[test]
    fn solves_trivial_scenario_optimally() {
        let scenario = scenario();
        let solver = ExactSolver::new();
        let logger = crate::logging::discard();
        let (placement, cost) = solver.solve(&scenario, &logger).unwrap();
        // Both containers fit on the cheaper node; the MILP should never pay for node b.
        assert_eq!(cost, 10.0);
        assert_eq!(placement.count(0, 0), 2);
        assert_eq!(placement.count(1, 0), 0);
    }

    #[test]
    fn rejects_nonpositive_time_limit() {
        assert!(ExactSolver::new().with_time_limit_seconds(0.0).is_err());
        assert!(ExactSolver::new().with_time_limit_seconds(-1.0).is_err());
    }

    #[test]
    fn no_solution_when_scenario_is_infeasible() {
        let impossible = Scenario::from_yaml(
            r#"
microservices:
  web: { cpureq: 1000, memreq: 256, containers: 1 }
nodes:
  a: { cost: 1.0, cpulim: 10, memlim: 512, contlim: 1, zone: z1 }
data_cost: { intrazone: 0.0, interzone: 0.0 }
"#,
        )
        .unwrap();
        let solver = ExactSolver::new();
        let logger = crate::logging::discard();
        assert!(solver.solve(&impossible, &logger).is_err());
    }

    #[test]
    fn cost_only_mode_skips_pair_variables() {
        let scenario = Scenario::from_yaml(
            r#"
microservices:
  web: { cpureq: 100, memreq: 256, containers: 1 }
  db: { cpureq: 100, memreq: 256, containers: 1 }
nodes:
  a: { cost: 10.0, cpulim: 200, memlim: 512, contlim: 2, zone: z1 }
  b: { cost: 20.0, cpulim: 200, memlim: 512, contlim: 2, zone: z2 }
datarate:
  web: { db: 5.0 }
data_cost:
  intrazone: 1.0
  interzone: 2.0
"#,
        )
        .unwrap();
        let solver = ExactSolver::new().with_cost_only(true);
        let logger = crate::logging::discard();
        let (_, cost) = solver.solve(&scenario, &logger).unwrap();
        // cost-only mode ignores data cost: both containers fit on node a alone.
        assert_eq!(cost, 10.0);
    }
}
