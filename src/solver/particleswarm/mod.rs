// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Particle Swarm Optimization (PSO)
//!
//! A discrete particle swarm optimization over container-to-node assignment vectors. Each
//! particle's position is a vector of node indices, one per container; velocity is real-valued
//! and truncated toward zero before being added to position each iteration.
//!
//! For details see [`ParticleSwarm`].
//!
//! ## References
//!
//! \[0\] Zambrano-Bigiarini, M. et.al. (2013): Standard Particle Swarm Optimisation 2011 at
//! CEC-2013: A baseline for future PSO improvements. 2013 IEEE Congress on Evolutionary
//! Computation. <https://doi.org/10.1109/CEC.2013.6557848>
//!
//! \[1\] <https://en.wikipedia.org/wiki/Particle_swarm_optimization>

pub mod boundary;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use slog::debug;

use crate::core::{build_placement, evaluate, evaluate_many, Error, NodeUsage, Placement, Scenario};
use crate::{place_error, place_error_closure};
use boundary::Handler;

/// A single particle: its current and personal-best position in the assignment space.
#[derive(Debug, Clone)]
struct Particle {
    position: Vec<i64>,
    velocity: Vec<f64>,
    best_position: Vec<i64>,
    best_cost: f64,
    cost: f64,
}

/// Discrete particle swarm optimizer over microservice-to-node assignment vectors.
///
/// ## References
///
/// \[0\] Zambrano-Bigiarini, M. et.al. (2013): Standard Particle Swarm Optimisation 2011 at
/// CEC-2013: A baseline for future PSO improvements. 2013 IEEE Congress on Evolutionary
/// Computation. <https://doi.org/10.1109/CEC.2013.6557848>
#[derive(Clone)]
pub struct ParticleSwarm {
    num_particles: usize,
    iterations: usize,
    weight_inertia: f64,
    weight_cognitive: f64,
    weight_social: f64,
    random_init_position: bool,
    zero_init_velocity: bool,
    velocity_handling: Handler,
    position_handling: Handler,
}

impl ParticleSwarm {
    /// Constructs a new instance with canonical SPSO-2011 weights (`w = 1/(2 ln 2)`,
    /// `c1 = c2 = 0.5 + ln 2`), viable (feasibility-seeking) position initialization, non-zero
    /// random initial velocity, and `boundary` handling for both velocity and position.
    ///
    /// `num_particles` must be at least 1: a swarm needs at least one particle to seed a swarm
    /// best from.
    pub fn new(num_particles: usize, iterations: usize) -> Result<Self, Error> {
        if num_particles == 0 {
            return Err(place_error!(ConfigError, "num_particles must be at least 1"));
        }
        Ok(ParticleSwarm {
            num_particles,
            iterations,
            weight_inertia: 1.0 / (2.0 * 2.0f64.ln()),
            weight_cognitive: 0.5 + 2.0f64.ln(),
            weight_social: 0.5 + 2.0f64.ln(),
            random_init_position: false,
            zero_init_velocity: false,
            velocity_handling: Handler::Boundary,
            position_handling: Handler::Boundary,
        })
    }

    /// Sets the inertia weight on particle velocity. Defaults to `1/(2 ln 2)`.
    pub fn with_inertia_factor(mut self, factor: f64) -> Result<Self, Error> {
        if factor < 0.0 {
            return Err(place_error!(ConfigError, "inertia factor must be >= 0"));
        }
        self.weight_inertia = factor;
        Ok(self)
    }

    /// Sets the cognitive acceleration factor. Defaults to `0.5 + ln 2`.
    pub fn with_cognitive_factor(mut self, factor: f64) -> Result<Self, Error> {
        if factor < 0.0 {
            return Err(place_error!(ConfigError, "cognitive factor must be >= 0"));
        }
        self.weight_cognitive = factor;
        Ok(self)
    }

    /// Sets the social acceleration factor. Defaults to `0.5 + ln 2`.
    pub fn with_social_factor(mut self, factor: f64) -> Result<Self, Error> {
        if factor < 0.0 {
            return Err(place_error!(ConfigError, "social factor must be >= 0"));
        }
        self.weight_social = factor;
        Ok(self)
    }

    /// When `true`, initial particle positions are drawn uniformly at random. When `false`
    /// (default), the engine attempts a feasibility-seeking greedy first-fit, falling back to
    /// random placement for any particle the greedy walk cannot complete.
    pub fn with_random_init_position(mut self, random: bool) -> Self {
        self.random_init_position = random;
        self
    }

    /// When `true`, particles start with zero velocity. When `false` (default), initial velocity
    /// is drawn uniformly from `[-(N-1), N)` per dimension.
    pub fn with_zero_init_velocity(mut self, zero: bool) -> Self {
        self.zero_init_velocity = zero;
        self
    }

    /// Sets the velocity boundary-handling strategy by name (`none`, `boundary`, `periodic`, or
    /// `random`). Unknown names are a [`crate::core::PlaceError::ConfigError`].
    pub fn with_velocity_handling(mut self, name: &str) -> Result<Self, Error> {
        self.velocity_handling = Handler::parse_velocity(name)?;
        Ok(self)
    }

    /// Sets the position boundary-handling strategy by name (`none`, `boundary`, `periodic`,
    /// `random`, or `reflecting`). Unknown names are a [`crate::core::PlaceError::ConfigError`].
    pub fn with_position_handling(mut self, name: &str) -> Result<Self, Error> {
        self.position_handling = Handler::parse_position(name)?;
        Ok(self)
    }

    /// Runs the swarm to completion and returns the best placement found with its cost, or
    /// [`crate::core::PlaceError::NoSolution`] if not a single particle, across initialization and
    /// every iteration, ever reached a feasible assignment.
    pub fn solve(
        &self,
        scenario: &Scenario,
        rng: &mut Xoshiro256PlusPlus,
        logger: &slog::Logger,
    ) -> Result<(Placement, f64), Error> {
        let num_nodes = scenario.nodes().len();
        let num_containers = scenario.total_containers() as usize;

        let mut particles: Vec<Particle> = (0..self.num_particles)
            .map(|_| self.init_particle(scenario, num_nodes, num_containers, rng, logger))
            .collect();

        let (mut swarm_best_position, mut swarm_best_cost) = self.seed_swarm_best(&particles, rng);

        for _ in 0..self.iterations {
            for particle in particles.iter_mut() {
                self.update_particle(particle, &swarm_best_position, num_nodes, rng);
            }

            // The position/velocity update above must stay strictly sequential (each particle's
            // random draws are ordered), but the cost evaluation that follows has no such
            // constraint: every particle's updated position is independent of every other's, so
            // the batch is handed to `evaluate_many`, which fans out across `rayon` when the
            // `rayon-eval` feature is enabled.
            let positions: Vec<Vec<i64>> = particles.iter().map(|p| p.position.clone()).collect();
            let costs = evaluate_many(scenario, &positions);

            for (particle, cost) in particles.iter_mut().zip(costs) {
                particle.cost = cost;

                if particle.cost < particle.best_cost {
                    particle.best_position = particle.position.clone();
                    particle.best_cost = particle.cost;

                    if particle.cost < swarm_best_cost {
                        swarm_best_position = particle.position.clone();
                        swarm_best_cost = particle.cost;
                    }
                }
            }
        }

        if swarm_best_cost.is_infinite() {
            return Err(place_error!(
                NoSolution,
                "particle swarm optimization never reached a feasible placement"
            ));
        }

        let placement = build_placement(scenario, &swarm_best_position)
            .ok_or_else(place_error_closure!(
                InternalInvariant,
                "swarm-best position was feasible during search but not at extraction"
            ))?;

        Ok((placement, swarm_best_cost))
    }

    fn seed_swarm_best(&self, particles: &[Particle], rng: &mut Xoshiro256PlusPlus) -> (Vec<i64>, f64) {
        let mut best_position = particles[0].position.clone();
        let mut best_cost = f64::INFINITY;

        for particle in particles {
            if particle.best_cost < best_cost {
                best_cost = particle.best_cost;
                best_position = particle.best_position.clone();
            }
        }

        if best_cost.is_infinite() {
            best_position = particles
                .choose(rng)
                .expect("at least one particle exists")
                .position
                .clone();
        }

        (best_position, best_cost)
    }

    fn init_particle(
        &self,
        scenario: &Scenario,
        num_nodes: usize,
        num_containers: usize,
        rng: &mut Xoshiro256PlusPlus,
        logger: &slog::Logger,
    ) -> Particle {
        let position = if self.random_init_position {
            random_position(num_nodes, num_containers, rng)
        } else {
            viable_position(scenario, num_nodes, num_containers, rng, logger)
        };

        let velocity = if self.zero_init_velocity {
            vec![0.0; num_containers]
        } else {
            (0..num_containers)
                .map(|_| rng.gen_range(-(num_nodes as i64 - 1)..num_nodes as i64) as f64)
                .collect()
        };

        let cost = evaluate(scenario, &position);

        Particle {
            best_position: position.clone(),
            position,
            velocity,
            cost,
            best_cost: cost,
        }
    }

    fn update_particle(
        &self,
        particle: &mut Particle,
        swarm_best_position: &[i64],
        num_nodes: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) {
        let velocity_lo = -(num_nodes as f64 - 1.0);
        let velocity_hi = num_nodes as f64;

        for dim in 0..particle.position.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();

            let raw_velocity = self.weight_inertia * particle.velocity[dim]
                + self.weight_cognitive
                    * r1
                    * (particle.best_position[dim] - particle.position[dim]) as f64
                + self.weight_social * r2 * (swarm_best_position[dim] - particle.position[dim]) as f64;

            let (mut velocity, _) = self
                .velocity_handling
                .apply(raw_velocity, velocity_lo, velocity_hi, rng);

            let raw_position = particle.position[dim] as f64 + velocity.trunc();
            let (position, negate_velocity) =
                self.position_handling
                    .apply(raw_position, 0.0, num_nodes as f64, rng);

            if negate_velocity {
                velocity = -velocity;
            }

            particle.velocity[dim] = velocity;
            particle.position[dim] = position as i64;
        }
    }
}

fn random_position(num_nodes: usize, num_containers: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<i64> {
    (0..num_containers)
        .map(|_| rng.gen_range(0..num_nodes as i64))
        .collect()
}

/// Attempts a greedy first-fit placement: shuffle node order, then for each container in
/// canonical order pick the first shuffled node that currently fits. Falls back to a uniformly
/// random position if any container is left unplaced, logging the fallback at `debug` level.
fn viable_position(
    scenario: &Scenario,
    num_nodes: usize,
    num_containers: usize,
    rng: &mut Xoshiro256PlusPlus,
    logger: &slog::Logger,
) -> Vec<i64> {
    let mut shuffled_nodes: Vec<usize> = (0..num_nodes).collect();
    shuffled_nodes.shuffle(rng);

    let mut usage = vec![NodeUsage::default(); num_nodes];
    let mut position = Vec::with_capacity(num_containers);

    for container in 0..num_containers {
        let microservice_idx = scenario.microservice_of(container as u32);
        let microservice = &scenario.microservices()[microservice_idx];

        let placed = shuffled_nodes
            .iter()
            .find(|&&node_idx| scenario.nodes()[node_idx].fits(&usage[node_idx], microservice));

        match placed {
            Some(&node_idx) => {
                usage[node_idx].cpu += microservice.cpu_req;
                usage[node_idx].mem += microservice.mem_req;
                usage[node_idx].cont += 1;
                position.push(node_idx as i64);
            }
            None => {
                debug!(
                    logger,
                    "viable-init greedy placement failed, falling back to random init";
                    "containers_placed" => position.len(),
                    "total_containers" => num_containers,
                );
                return random_position(num_nodes, num_containers, rng);
            }
        }
    }

    position
}
