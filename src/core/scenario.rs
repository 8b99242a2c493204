// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The scenario model: microservices, nodes, data rates, and data-transfer tariffs.
//!
//! A [`Scenario`] is immutable once built. Microservice and node order is fixed at construction
//! time (mirroring YAML declaration order) and is the sole identifier the solvers use: a
//! microservice or node is always addressed by its index, never its name, once a `Scenario`
//! exists.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::core::errors::Error;
use crate::core::objective::NodeUsage;
use crate::{place_error, place_error_closure};

/// A microservice replicated into a fixed number of identical containers.
#[derive(Debug, Clone, PartialEq)]
pub struct Microservice {
    pub name: String,
    pub cpu_req: u32,
    pub mem_req: u32,
    pub containers: u32,
}

/// A compute node with fixed capacity and a monetary cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub cost: f64,
    pub cpu_lim: u32,
    pub mem_lim: u32,
    pub cont_lim: u32,
    pub zone: String,
}

/// An immutable problem description.
///
/// Deliberately carries no mutable scratch: `Node` and `Scenario` hold only the static problem
/// description. Per-evaluation running totals live in [`crate::core::objective::NodeUsage`],
/// allocated fresh by the caller.
#[derive(Debug, Clone)]
pub struct Scenario {
    microservices: Vec<Microservice>,
    nodes: Vec<Node>,
    /// `(producer index, consumer index) -> rate`. Absent entries are 0.
    data_rate: HashMap<(usize, usize), f64>,
    intrazone_cost: f64,
    interzone_cost: f64,
    /// Cumulative container counts: `container_offsets[i]` is the index of the first container
    /// belonging to microservice `i`; `container_offsets[len]` is `total_containers`.
    container_offsets: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct RawMicroservice {
    cpureq: u32,
    memreq: u32,
    containers: u32,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    cost: f64,
    cpulim: u32,
    memlim: u32,
    contlim: u32,
    zone: String,
}

#[derive(Debug, Deserialize)]
struct RawDataCost {
    intrazone: f64,
    interzone: f64,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    microservices: IndexMap<String, RawMicroservice>,
    nodes: IndexMap<String, RawNode>,
    #[serde(default)]
    datarate: IndexMap<String, IndexMap<String, f64>>,
    data_cost: RawDataCost,
}

impl Scenario {
    /// Parses a scenario from a YAML document, per the schema described in the crate's external
    /// interfaces documentation.
    pub fn from_yaml(yaml: &str) -> Result<Scenario, Error> {
        let raw: RawScenario = serde_yaml::from_str(yaml)
            .map_err(|e| place_error!(ConfigError, format!("malformed scenario YAML: {e}")))?;
        Scenario::from_raw(raw)
    }

    fn from_raw(raw: RawScenario) -> Result<Scenario, Error> {
        if raw.microservices.is_empty() {
            return Err(place_error!(
                ConfigError,
                "scenario declares no microservices"
            ));
        }
        if raw.nodes.is_empty() {
            return Err(place_error!(ConfigError, "scenario declares no nodes"));
        }

        let microservices: Vec<Microservice> = raw
            .microservices
            .iter()
            .map(|(name, m)| Microservice {
                name: name.clone(),
                cpu_req: m.cpureq,
                mem_req: m.memreq,
                containers: m.containers,
            })
            .collect();

        let nodes: Vec<Node> = raw
            .nodes
            .iter()
            .map(|(name, n)| Node {
                name: name.clone(),
                cost: n.cost,
                cpu_lim: n.cpulim,
                mem_lim: n.memlim,
                cont_lim: n.contlim,
                zone: n.zone.clone(),
            })
            .collect();

        let micro_index: HashMap<&str, usize> = microservices
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.as_str(), i))
            .collect();

        let mut data_rate = HashMap::new();
        for (producer, row) in &raw.datarate {
            let producer_idx = *micro_index.get(producer.as_str()).ok_or_else(place_error_closure!(
                ConfigError,
                format!("datarate references unknown microservice {producer:?}")
            ))?;
            for (consumer, rate) in row {
                let consumer_idx =
                    *micro_index.get(consumer.as_str()).ok_or_else(place_error_closure!(
                        ConfigError,
                        format!("datarate references unknown microservice {consumer:?}")
                    ))?;
                data_rate.insert((producer_idx, consumer_idx), *rate);
            }
        }

        let mut container_offsets = Vec::with_capacity(microservices.len() + 1);
        let mut offset = 0u32;
        for m in &microservices {
            container_offsets.push(offset);
            offset += m.containers;
        }
        container_offsets.push(offset);

        Ok(Scenario {
            microservices,
            nodes,
            data_rate,
            intrazone_cost: raw.data_cost.intrazone,
            interzone_cost: raw.data_cost.interzone,
            container_offsets,
        })
    }

    pub fn microservices(&self) -> &[Microservice] {
        &self.microservices
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Total number of containers across every microservice; the dimensionality of a PSO
    /// position vector and the container index space used throughout the crate.
    pub fn total_containers(&self) -> u32 {
        *self.container_offsets.last().expect("always non-empty")
    }

    /// Maps a canonical container index to the microservice it belongs to.
    ///
    /// Containers are flattened in microservice-declaration order: `container_of(c)` returns the
    /// microservice index `i` such that `offsets[i] <= c < offsets[i+1]`.
    pub fn microservice_of(&self, container: u32) -> usize {
        match self.container_offsets.binary_search(&container) {
            Ok(i) if i < self.microservices.len() => i,
            Ok(i) => i - 1,
            Err(i) => i - 1,
        }
    }

    /// The data-exchange rate from microservice `producer` to `consumer`; 0 if unspecified.
    pub fn data_rate(&self, producer: usize, consumer: usize) -> f64 {
        self.data_rate
            .get(&(producer, consumer))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a nonzero data rate was declared from `producer` to `consumer`. Lets callers skip
    /// building cross-term machinery for pairs with no declared exchange, without ever comparing
    /// an `f64` rate against `0.0`.
    pub fn has_data_rate(&self, producer: usize, consumer: usize) -> bool {
        self.data_rate.contains_key(&(producer, consumer))
    }

    /// The transfer tariff between two nodes: 0 within the same node, `intrazone_cost` within the
    /// same zone, `interzone_cost` otherwise.
    pub fn data_cost(&self, j1: usize, j2: usize) -> f64 {
        if j1 == j2 {
            0.0
        } else if self.nodes[j1].zone == self.nodes[j2].zone {
            self.intrazone_cost
        } else {
            self.interzone_cost
        }
    }
}

impl Node {
    /// Whether this node, carrying the resource usage in `usage`, has room for one more container
    /// of `microservice`.
    pub fn fits(&self, usage: &NodeUsage, microservice: &Microservice) -> bool {
        usage.cpu + microservice.cpu_req <= self.cpu_lim
            && usage.mem + microservice.mem_req <= self.mem_lim
            && usage.cont + 1 <= self.cont_lim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
microservices:
  web: { cpureq: 100, memreq: 256, containers: 2 }
  db: { cpureq: 200, memreq: 512, containers: 1 }
nodes:
  a: { cost: 10.0, cpulim: 400, memlim: 1024, contlim: 4, zone: z1 }
  b: { cost: 20.0, cpulim: 400, memlim: 1024, contlim: 4, zone: z2 }
datarate:
  web: { db: 5.0 }
data_cost:
  intrazone: 1.0
  interzone: 2.0
"#
    }

    #[test]
    fn parses_scenario() {
        let s = Scenario::from_yaml(sample_yaml()).unwrap();
        assert_eq!(s.microservices().len(), 2);
        assert_eq!(s.nodes().len(), 2);
        assert_eq!(s.total_containers(), 3);
        assert_eq!(s.data_rate(0, 1), 5.0);
        assert_eq!(s.data_rate(1, 0), 0.0);
    }

    #[test]
    fn container_of_respects_declaration_order() {
        let s = Scenario::from_yaml(sample_yaml()).unwrap();
        assert_eq!(s.microservice_of(0), 0);
        assert_eq!(s.microservice_of(1), 0);
        assert_eq!(s.microservice_of(2), 1);
    }

    #[test]
    fn data_cost_by_zone() {
        let s = Scenario::from_yaml(sample_yaml()).unwrap();
        assert_eq!(s.data_cost(0, 0), 0.0);
        assert_eq!(s.data_cost(0, 1), 2.0);
    }

    #[test]
    fn dangling_datarate_reference_is_config_error() {
        let yaml = r#"
microservices:
  web: { cpureq: 100, memreq: 256, containers: 1 }
nodes:
  a: { cost: 1.0, cpulim: 100, memlim: 100, contlim: 1, zone: z1 }
datarate:
  web: { ghost: 1.0 }
data_cost: { intrazone: 0.0, interzone: 0.0 }
"#;
        crate::assert_error!(
            Scenario::from_yaml(yaml),
            crate::core::PlaceError,
            "configuration error: \"datarate references unknown microservice \\\"ghost\\\"\""
        );
    }
}
