// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! `place` — the command-line entry point. Parses a scenario, runs one of the two placement
//! engines, and prints (or writes) a rendered report.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use slog::{info, Level};

use placer::core::{PlaceError, Scenario};
use placer::solver::exact::ExactSolver;
use placer::solver::particleswarm::ParticleSwarm;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverKind {
    Exact,
    Pso,
}

/// Decide how many containers of each microservice to place on each cluster node.
#[derive(Debug, Parser)]
#[command(name = "place", version, about)]
struct Cli {
    /// Which engine to run.
    solver: SolverKind,

    /// Path to the scenario YAML file.
    scenario: PathBuf,

    /// RNG seed. Defaults to a time-derived value; only consulted by the `pso` solver.
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the rendered report. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path to a JSON log file. If omitted, logs go to the terminal.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level: critical, error, warning, info, debug, or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_nanos() as u64
}

fn build_logger(cli: &Cli) -> Result<slog::Logger, placer::core::Error> {
    let level: Level = placer::logging::parse_level(&cli.log_level)?;
    match &cli.log_file {
        Some(path) => placer::logging::file(&path.to_string_lossy(), level),
        None => Ok(placer::logging::term(level)),
    }
}

fn run(cli: &Cli) -> Result<String, placer::core::Error> {
    let logger = build_logger(cli)?;

    let yaml = fs::read_to_string(&cli.scenario).map_err(|e| {
        placer::place_error!(
            ConfigError,
            format!("cannot read scenario {:?}: {e}", cli.scenario)
        )
    })?;
    let scenario = Scenario::from_yaml(&yaml)?;

    let (placement, cost) = match cli.solver {
        SolverKind::Exact => {
            info!(logger, "running exact engine");
            ExactSolver::new().solve(&scenario, &logger)?
        }
        SolverKind::Pso => {
            let seed = cli.seed.unwrap_or_else(default_seed);
            info!(logger, "running particle swarm engine"; "seed" => seed);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            ParticleSwarm::new(40, 200)?.solve(&scenario, &mut rng, &logger)?
        }
    };

    Ok(placement.render(&scenario, cost))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let report = match run(&cli) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{err}");
            return match err.downcast_ref::<PlaceError>() {
                Some(PlaceError::NoSolution { .. }) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            };
        }
    };

    let write_result = match &cli.output {
        Some(path) => fs::write(path, &report),
        None => {
            println!("{report}");
            Ok(())
        }
    };

    if let Err(e) = write_result {
        eprintln!("failed to write report: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
