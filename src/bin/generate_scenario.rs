// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Generates a random scenario YAML document on stdout, for exercising the solvers at scale
//! without hand-authoring a scenario file.

use std::collections::BTreeMap;

use clap::Parser;
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rand::SeedableRng;
use serde::Serialize;

const ZONES: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
];

#[derive(Debug, Parser)]
#[command(name = "generate_scenario", about = "Generate a random placement scenario")]
struct Cli {
    /// Number of microservices to generate.
    #[arg(short = 'm', long, default_value_t = 20)]
    micros: u32,

    /// Minimum containers per microservice.
    #[arg(long, default_value_t = 1)]
    min_containers: u32,

    /// Maximum containers per microservice.
    #[arg(long, default_value_t = 10)]
    max_containers: u32,

    /// Generate no datarate entries between microservices.
    #[arg(long, default_value_t = false)]
    no_data: bool,

    /// Minimum data rate between two microservices that do exchange data.
    #[arg(long, default_value_t = 1.0)]
    min_datarate: f64,

    /// Maximum data rate between two microservices that do exchange data.
    #[arg(long, default_value_t = 10.0)]
    max_datarate: f64,

    /// Number of nodes to generate.
    #[arg(short = 'n', long, default_value_t = 80)]
    nodes: u32,

    /// Number of distinct zones to scatter nodes across.
    #[arg(short = 'z', long, default_value_t = 3)]
    zones: usize,

    /// RNG seed; defaults to a fresh seed each run.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct RawMicroservice {
    cpureq: u32,
    memreq: u32,
    containers: u32,
}

#[derive(Debug, Serialize)]
struct RawNode {
    cost: f64,
    cpulim: u32,
    memlim: u32,
    contlim: u32,
    zone: String,
}

#[derive(Debug, Serialize)]
struct RawDataCost {
    intrazone: f64,
    interzone: f64,
}

#[derive(Debug, Serialize)]
struct RawScenario {
    microservices: BTreeMap<String, RawMicroservice>,
    nodes: BTreeMap<String, RawNode>,
    datarate: BTreeMap<String, BTreeMap<String, f64>>,
    data_cost: RawDataCost,
}

fn random_microservice(rng: &mut Xoshiro256PlusPlus, min: u32, max: u32) -> RawMicroservice {
    RawMicroservice {
        cpureq: 250 * rng.gen_range(1..=16),
        memreq: 128 * rng.gen_range(1..=64),
        containers: rng.gen_range(min..=max),
    }
}

fn random_node(rng: &mut Xoshiro256PlusPlus, zone_count: usize) -> RawNode {
    let r1 = rng.gen_range(1..=128);
    let r2 = rng.gen_range(1..=128);
    let cpulim = 1000 * r1;
    let memlim = 512 * r2;
    let cost = ((r1 + r2) as f64 * rng.gen_range(1.0..2.0) * 100.0).round() / 100.0;
    let contlim = (r1.max(r2) as f64 * rng.gen_range(0.5..1.5)) as u32;
    let zone = ZONES[rng.gen_range(0..zone_count.min(ZONES.len()))].to_string();

    RawNode {
        cost,
        cpulim,
        memlim,
        contlim,
        zone,
    }
}

/// Picks a random spanning tree over `names` (the first name is the root) and assigns a random
/// data rate to each edge, mirroring the reference generator's preference for sparse, tree-shaped
/// communication graphs over a dense all-pairs one.
fn random_datarate(
    rng: &mut Xoshiro256PlusPlus,
    names: &[String],
    min: f64,
    max: f64,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut edges: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    if names.len() < 2 {
        return edges;
    }

    let mut placed = vec![names[0].clone()];
    for name in &names[1..] {
        let parent = &placed[rng.gen_range(0..placed.len())];
        let rate = (rng.gen_range(min..max) * 100.0).round() / 100.0;
        edges.entry(parent.clone()).or_default().insert(name.clone(), rate);
        placed.push(name.clone());
    }

    edges
}

fn main() {
    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let micro_names: Vec<String> = (0..cli.micros).map(|i| format!("ms-{i}")).collect();
    let node_names: Vec<String> = (0..cli.nodes).map(|i| format!("node-{i}")).collect();

    let microservices = micro_names
        .iter()
        .map(|name| {
            (
                name.clone(),
                random_microservice(&mut rng, cli.min_containers, cli.max_containers),
            )
        })
        .collect();

    let nodes = node_names
        .iter()
        .map(|name| (name.clone(), random_node(&mut rng, cli.zones)))
        .collect();

    let datarate = if cli.no_data {
        BTreeMap::new()
    } else {
        random_datarate(&mut rng, &micro_names, cli.min_datarate, cli.max_datarate)
    };

    let scenario = RawScenario {
        microservices,
        nodes,
        datarate,
        data_cost: RawDataCost {
            intrazone: 0.01,
            interzone: 0.02,
        },
    };

    print!("{}", serde_yaml::to_string(&scenario).expect("scenario serializes to YAML"));
}
