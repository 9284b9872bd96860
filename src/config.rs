use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::network::DEFAULT_TX_INTERVAL;
use crate::node::ForwardingPolicy;
use crate::packet::NodeId;

/// Link generation templates over the ordered node list
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    /// Each node links to the next one in the list
    Chain,
    /// Chain closed back onto the first node
    Ring,
    /// Every node links to every other node
    Mesh,
    /// The first node is the hub, every other node links to it
    Star,
}

/// Simulation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    pub batch: BatchConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.general.validate()?;
        self.network.validate()?;

        let known: HashSet<NodeId> = self.network.nodes.iter().copied().collect();
        let batch = &self.batch;

        if batch.size == 0 {
            return Err(ValidationError::InvalidBatch(
                "size must be greater than zero".to_string(),
            ));
        }
        for (role, id) in [("source", batch.source), ("destination", batch.destination)] {
            if !known.contains(&id) {
                return Err(ValidationError::InvalidBatch(format!(
                    "{} {} is not a declared node",
                    role, id
                )));
            }
        }
        if batch.forwarders.is_empty() {
            return Err(ValidationError::InvalidBatch(
                "forwarders cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for &id in &batch.forwarders {
            if !known.contains(&id) {
                return Err(ValidationError::InvalidBatch(format!(
                    "forwarder {} is not a declared node",
                    id
                )));
            }
            if !seen.insert(id) {
                return Err(ValidationError::InvalidBatch(format!(
                    "forwarder {} is listed more than once",
                    id
                )));
            }
        }
        if !seen.contains(&batch.destination) {
            log::warn!(
                "Destination {} is not in the forwarder list and will ignore the batch",
                batch.destination
            );
        }

        Ok(())
    }

    /// Number of explicit links plus the links the template would generate
    pub fn link_count(&self) -> usize {
        crate::topology::collect_links(&self.network).len()
    }
}

/// Run-wide settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneralConfig {
    #[serde(default)]
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Spacing between consecutive transmissions on the simulated clock
    #[serde(default = "default_tx_interval", with = "humantime_serde")]
    pub tx_interval: Duration,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Consecutive rounds without any state change that end a run
    #[serde(default = "default_settle_rounds")]
    pub settle_rounds: u32,
    #[serde(default)]
    pub policy: ForwardingPolicy,
    #[serde(default = "default_runs")]
    pub runs: u32,
}

fn default_tx_interval() -> Duration {
    DEFAULT_TX_INTERVAL
}

fn default_max_rounds() -> u32 {
    16
}

fn default_settle_rounds() -> u32 {
    2
}

fn default_runs() -> u32 {
    1
}

impl GeneralConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_rounds == 0 {
            return Err(ValidationError::InvalidGeneral(
                "max_rounds must be greater than zero".to_string(),
            ));
        }
        if self.settle_rounds == 0 {
            return Err(ValidationError::InvalidGeneral(
                "settle_rounds must be greater than zero".to_string(),
            ));
        }
        if self.runs == 0 {
            return Err(ValidationError::InvalidGeneral(
                "runs must be greater than zero".to_string(),
            ));
        }
        if self.tx_interval.is_zero() {
            // Every arrival would share one timestamp and the rate estimate never moves
            log::warn!("tx_interval is zero; rate estimation is disabled");
        }
        Ok(())
    }
}

/// Nodes and the links between them
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    pub nodes: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateConfig>,
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::InvalidNetwork(
                "nodes cannot be empty".to_string(),
            ));
        }
        let mut known = HashSet::new();
        for &id in &self.nodes {
            if !known.insert(id) {
                return Err(ValidationError::InvalidNetwork(format!(
                    "node {} is declared more than once",
                    id
                )));
            }
        }

        for link in &self.links {
            for end in [link.from, link.to] {
                if !known.contains(&end) {
                    return Err(ValidationError::InvalidNetwork(format!(
                        "link {} -> {} references unknown node {}",
                        link.from, link.to, end
                    )));
                }
            }
            if link.from == link.to {
                return Err(ValidationError::InvalidNetwork(format!(
                    "link {} -> {} is a self-loop",
                    link.from, link.to
                )));
            }
            validate_probability(link.probability)?;
        }

        if let Some(template) = &self.template {
            validate_probability(template.probability)?;
        }

        if self.links.is_empty() && self.template.is_none() {
            log::warn!("Network declares no links; nothing will be delivered");
        }

        Ok(())
    }
}

fn validate_probability(probability: f64) -> Result<(), ValidationError> {
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(ValidationError::InvalidNetwork(format!(
            "probability {} is outside [0, 1]",
            probability
        )));
    }
    Ok(())
}

/// A single directed link
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    pub from: NodeId,
    pub to: NodeId,
    pub probability: f64,
}

/// Generated links with a uniform delivery probability
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct TemplateConfig {
    pub kind: TopologyKind,
    pub probability: f64,
    /// Also add the reverse of every generated link
    #[serde(default)]
    pub bidirectional: bool,
}

/// The batch the source disseminates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    #[serde(default)]
    pub id: u32,
    pub source: NodeId,
    pub destination: NodeId,
    pub size: u32,
    /// Candidate relays, highest priority first
    pub forwarders: Vec<NodeId>,
    #[serde(default)]
    pub payload: String,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid batch configuration: {0}")]
    InvalidBatch(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            log_level: Some("info".to_string()),
            tx_interval: default_tx_interval(),
            max_rounds: default_max_rounds(),
            settle_rounds: default_settle_rounds(),
            policy: ForwardingPolicy::default(),
            runs: default_runs(),
        }
    }
}
