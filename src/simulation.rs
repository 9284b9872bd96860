//! Simulation driver.
//!
//! A run injects the whole batch at the source, then lets the forwarders
//! flush in forward-list order, one round at a time, until the network
//! stops changing or the round bound is hit. Runs are independent: node
//! state is cleared and the generator reseeded between them.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Config, GeneralConfig};
use crate::network::{Network, NetworkError};
use crate::node::{ForwardingPolicy, Node};
use crate::packet::{Batch, ForwardList, NodeId, SeqNum};
use crate::topology::build_network;

/// Per-node state at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub buffered: usize,
    pub batch_map: BTreeMap<SeqNum, NodeId>,
    /// Smoothed upstream rate, packets per second
    pub rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_delay_ms: Option<f64>,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id(),
            buffered: node.packets().len(),
            batch_map: node.batch_map().clone(),
            rate: node.rate().rate(),
            forward_delay_ms: node.forward_delay().map(|d| d.as_secs_f64() * 1000.0),
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub run: u32,
    pub seed: u64,
    /// Sequence numbers buffered at the destination, ascending
    pub delivered: Vec<SeqNum>,
    pub missing: Vec<SeqNum>,
    pub delivery_ratio: f64,
    /// Flush rounds executed
    pub rounds: u32,
    /// Ended because rounds stopped changing state
    pub settled: bool,
    /// Broadcasts made, source included
    pub transmissions: u64,
    pub forwarder_transmissions: u64,
    pub nodes: Vec<NodeSummary>,
}

/// Aggregate over all runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub runs: usize,
    pub settled_runs: usize,
    pub mean_delivery_ratio: f64,
    pub min_delivery_ratio: f64,
    pub max_delivery_ratio: f64,
    pub mean_transmissions: f64,
    pub mean_rounds: f64,
}

impl RunSummary {
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let ratios: Vec<f64> = runs.iter().map(|r| r.delivery_ratio).collect();
        let transmissions: Vec<f64> = runs.iter().map(|r| r.transmissions as f64).collect();
        let rounds: Vec<f64> = runs.iter().map(|r| f64::from(r.rounds)).collect();

        Self {
            runs: runs.len(),
            settled_runs: runs.iter().filter(|r| r.settled).count(),
            mean_delivery_ratio: mean(&ratios),
            min_delivery_ratio: ratios.iter().copied().fold(None, min_opt).unwrap_or(0.0),
            max_delivery_ratio: ratios.iter().copied().fold(None, max_opt).unwrap_or(0.0),
            mean_transmissions: mean(&transmissions),
            mean_rounds: mean(&rounds),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn min_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

/// Describes what was simulated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationMetadata {
    pub generated_at: String,
    pub seed: u64,
    pub policy: ForwardingPolicy,
    pub node_count: usize,
    pub link_count: usize,
    pub batch_id: u32,
    pub batch_size: u32,
    pub source: NodeId,
    pub destination: NodeId,
    pub forwarders: Vec<NodeId>,
    pub max_rounds: u32,
    pub settle_rounds: u32,
}

/// Everything a simulation produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub metadata: SimulationMetadata,
    pub summary: RunSummary,
    pub runs: Vec<RunResult>,
}

pub struct Simulation {
    general: GeneralConfig,
    network: Network,
    batch: Batch,
    destination: NodeId,
    link_count: usize,
}

impl Simulation {
    /// Build the network and the batch for a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        let network = build_network(config)?;
        let batch = Batch::new(
            config.batch.id,
            config.batch.source,
            ForwardList::new(config.batch.forwarders.clone()),
            config.batch.size,
            config.batch.payload.as_bytes(),
        );

        Ok(Self {
            general: config.general.clone(),
            network,
            batch,
            destination: config.batch.destination,
            link_count: config.link_count(),
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Seed used by run `run`; runs differ so repeated runs sample new losses
    pub fn seed_for(&self, run: u32) -> u64 {
        self.general.seed.wrapping_add(u64::from(run))
    }

    /// Execute every configured run
    pub fn run(&mut self) -> Result<SimulationReport, NetworkError> {
        info!(
            "Simulating batch {} of {} packets from {} to {} over {} runs ({} policy)",
            self.batch.batch_id,
            self.batch.len(),
            self.batch.source,
            self.destination,
            self.general.runs,
            self.general.policy
        );

        let mut runs = Vec::with_capacity(self.general.runs as usize);
        for run in 0..self.general.runs {
            let result = self.run_once(run)?;
            info!(
                "Run {}: {}/{} packets delivered in {} rounds, {} transmissions{}",
                run,
                result.delivered.len(),
                self.batch.len(),
                result.rounds,
                result.transmissions,
                if result.settled { "" } else { " (round bound hit)" }
            );
            runs.push(result);
        }

        Ok(SimulationReport {
            metadata: self.metadata(),
            summary: RunSummary::from_runs(&runs),
            runs,
        })
    }

    /// One independent run, starting from clean node state
    pub fn run_once(&mut self, run: u32) -> Result<RunResult, NetworkError> {
        let seed = self.seed_for(run);
        self.network.reset(seed);

        let source = self.batch.source;
        for packet in &self.batch.packets {
            self.network.send(source, packet)?;
        }
        let source_transmissions = self.network.transmissions();

        let mut rounds = 0;
        let mut quiet = 0;
        let mut settled = false;
        while rounds < self.general.max_rounds {
            rounds += 1;
            let mut changes = 0;
            for &forwarder in self.batch.forward_list.iter() {
                changes += self.network.flush(forwarder, self.general.policy)?.changes;
            }
            debug!("Run {} round {}: {} changes", run, rounds, changes);

            if changes == 0 {
                quiet += 1;
                if quiet >= self.general.settle_rounds {
                    settled = true;
                    break;
                }
            } else {
                quiet = 0;
            }
        }

        let delivered: Vec<SeqNum> = self
            .network
            .node(self.destination)
            .ok_or(NetworkError::UnknownNode(self.destination))?
            .received_seqs()
            .into_iter()
            .collect();
        let missing: Vec<SeqNum> = self
            .batch
            .packets
            .iter()
            .map(|p| p.seq)
            .filter(|seq| delivered.binary_search(seq).is_err())
            .collect();
        let delivery_ratio = if self.batch.is_empty() {
            0.0
        } else {
            delivered.len() as f64 / self.batch.len() as f64
        };
        let transmissions = self.network.transmissions();

        Ok(RunResult {
            run,
            seed,
            delivered,
            missing,
            delivery_ratio,
            rounds,
            settled,
            transmissions,
            forwarder_transmissions: transmissions - source_transmissions,
            nodes: self.network.nodes().map(NodeSummary::from).collect(),
        })
    }

    fn metadata(&self) -> SimulationMetadata {
        SimulationMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            seed: self.general.seed,
            policy: self.general.policy,
            node_count: self.network.len(),
            link_count: self.link_count,
            batch_id: self.batch.batch_id,
            batch_size: self.batch.len() as u32,
            source: self.batch.source,
            destination: self.destination,
            forwarders: self.batch.forward_list.iter().copied().collect(),
            max_rounds: self.general.max_rounds,
            settle_rounds: self.general.settle_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_config(ab: f64, bc: f64, policy: &str) -> Config {
        let yaml = format!(
            r#"
general:
  seed: 1
  policy: {policy}
network:
  nodes: [0, 1, 2]
  links:
    - {{ from: 0, to: 1, probability: {ab} }}
    - {{ from: 1, to: 2, probability: {bc} }}
batch:
  source: 0
  destination: 2
  size: 3
  forwarders: [1, 2]
"#
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_perfect_chain_delivers_and_settles() {
        let mut sim = Simulation::from_config(&chain_config(1.0, 1.0, "best_holder")).unwrap();
        let result = sim.run_once(0).unwrap();

        assert_eq!(result.delivered, vec![0, 1, 2]);
        assert!(result.missing.is_empty());
        assert_eq!(result.delivery_ratio, 1.0);
        assert!(result.settled);
        // Round 1 delivers, rounds 2 and 3 only produce duplicates
        assert_eq!(result.rounds, 3);
        assert_eq!(result.transmissions, 3 + 3 * 3);
        assert_eq!(result.forwarder_transmissions, 9);

        let c = result.nodes.iter().find(|n| n.id == NodeId(2)).unwrap();
        assert_eq!(c.buffered, 3);
        assert!(c.batch_map.values().all(|&n| n == NodeId(1)));
    }

    #[test]
    fn test_dead_first_hop() {
        let mut sim = Simulation::from_config(&chain_config(0.0, 1.0, "unconditional")).unwrap();
        let result = sim.run_once(0).unwrap();

        assert!(result.delivered.is_empty());
        assert_eq!(result.missing, vec![0, 1, 2]);
        assert_eq!(result.delivery_ratio, 0.0);
        assert_eq!(result.forwarder_transmissions, 0);
        assert!(result.settled);
        assert_eq!(result.rounds, 2);
    }

    #[test]
    fn test_round_bound_without_settling() {
        let mut config = chain_config(1.0, 1.0, "best_holder");
        config.general.max_rounds = 1;
        let mut sim = Simulation::from_config(&config).unwrap();
        let result = sim.run_once(0).unwrap();
        assert_eq!(result.rounds, 1);
        assert!(!result.settled);
        assert_eq!(result.delivered, vec![0, 1, 2]);
    }

    #[test]
    fn test_runs_are_independent() {
        let mut config = chain_config(1.0, 1.0, "best_holder");
        config.general.runs = 3;
        let mut sim = Simulation::from_config(&config).unwrap();
        let report = sim.run().unwrap();

        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.summary.runs, 3);
        assert_eq!(report.summary.settled_runs, 3);
        assert_eq!(report.summary.mean_delivery_ratio, 1.0);
        // State from earlier runs does not leak in
        for run in &report.runs {
            assert_eq!(run.transmissions, report.runs[0].transmissions);
        }
        assert_eq!(report.runs[2].seed, 3);
        assert_eq!(report.metadata.batch_size, 3);
        assert_eq!(report.metadata.link_count, 2);
    }

    #[test]
    fn test_summary_of_no_runs() {
        let summary = RunSummary::from_runs(&[]);
        assert_eq!(summary.runs, 0);
        assert_eq!(summary.mean_delivery_ratio, 0.0);
        assert_eq!(summary.min_delivery_ratio, 0.0);
    }
}
