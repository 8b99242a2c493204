// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The placement mapping: which node hosts how many containers of which microservice.

use std::fmt::Write as _;

use crate::core::scenario::Scenario;

/// A dense, node-major mapping from (node index, microservice index) to container count.
///
/// Produced by an engine once it has a final, feasible assignment. Zero entries are pruned only
/// when rendering or iterating used nodes; the underlying storage stays dense for cheap
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    mapping: Vec<Vec<u32>>,
}

impl Placement {
    pub(crate) fn from_dense(mapping: Vec<Vec<u32>>) -> Placement {
        Placement { mapping }
    }

    /// Number of containers of microservice `i` placed on node `j`.
    pub fn count(&self, node: usize, microservice: usize) -> u32 {
        self.mapping[node][microservice]
    }

    /// Node indices that host at least one container, in node-declaration order.
    pub fn used_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.mapping
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&c| c > 0))
            .map(|(j, _)| j)
    }

    /// Renders a human-readable report: total cost, then one block per used node listing its
    /// container counts and resource utilization.
    pub fn render(&self, scenario: &Scenario, cost: f64) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total cost: {cost:.2}");

        for j in self.used_nodes() {
            let node = &scenario.nodes()[j];
            let _ = write!(out, "\nNode {:?}:", node.name);

            let mut cpu = 0u32;
            let mut mem = 0u32;
            let mut cont = 0u32;

            for (i, microservice) in scenario.microservices().iter().enumerate() {
                let count = self.mapping[j][i];
                if count == 0 {
                    continue;
                }
                let _ = write!(
                    out,
                    "\n  - {count} containers of microservice {:?}",
                    microservice.name
                );
                cpu += count * microservice.cpu_req;
                mem += count * microservice.mem_req;
                cont += count;
            }

            let _ = writeln!(
                out,
                "\n{cpu}/{} mCPU, {mem}/{} MiB RAM, {cont}/{} containers",
                node.cpu_lim, node.mem_lim, node.cont_lim
            );
        }

        out
    }
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
  a: { cost: 10.0, cpulim: 400, memlim: 1024, contlim: 4, zone: z1 }
data_cost:
  intrazone: 0.0
  interzone: 0.0
"#,
        )
        .unwrap()
    }

    #[test]
    fn used_nodes_skips_empty_rows() {
        let p = Placement::from_dense(vec![vec![2]]);
        assert_eq!(p.used_nodes().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn empty_placement_has_no_used_nodes() {
        let p = Placement::from_dense(vec![vec![0]]);
        assert_eq!(p.used_nodes().count(), 0);
    }

    #[test]
    fn render_includes_total_cost_and_node_block() {
        let scenario = scenario();
        let p = Placement::from_dense(vec![vec![2]]);
        let report = p.render(&scenario, 10.0);
        assert!(report.starts_with("Total cost: 10.00"));
        assert!(report.contains("Node \"a\":"));
        assert!(report.contains("2 containers of microservice \"web\""));
        assert!(report.contains("200/400 mCPU"));
    }
}
