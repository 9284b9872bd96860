//! Simulated lossy mesh.
//!
//! The network owns every node, the single seeded generator used for all
//! link trials, and the simulated clock. A transmission is a broadcast: one
//! independent trial per outbound link of the sender, and every neighbour
//! that wins its trial receives its own copy of the packet at the same
//! instant. The clock advances by one transmission interval afterwards.

use log::{debug, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::link::{Link, LinkError};
use crate::node::{ForwardingPolicy, Node, ReceiveOutcome};
use crate::packet::{ExOrPacket, NodeId};

/// Default spacing between consecutive transmissions
pub const DEFAULT_TX_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} already exists")]
    DuplicateNode(NodeId),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Result of one broadcast
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    /// Links tried
    pub attempted: usize,
    /// Neighbours that got the packet, with what it did to them
    pub delivered: Vec<(NodeId, ReceiveOutcome)>,
}

impl SendOutcome {
    pub fn dropped(&self) -> usize {
        self.attempted - self.delivered.len()
    }

    pub fn changed(&self) -> bool {
        self.delivered.iter().any(|(_, outcome)| outcome.changed())
    }
}

/// Aggregate of the broadcasts made by one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub transmissions: usize,
    pub deliveries: usize,
    /// Receives that stored a packet or tightened a batch map
    pub changes: usize,
}

pub struct Network {
    nodes: BTreeMap<NodeId, Node>,
    rng: ChaCha8Rng,
    seed: u64,
    now: Duration,
    tx_interval: Duration,
    transmissions: u64,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.nodes.len())
            .field("seed", &self.seed)
            .field("now", &self.now)
            .field("tx_interval", &self.tx_interval)
            .field("transmissions", &self.transmissions)
            .finish()
    }
}

impl Network {
    pub fn new(seed: u64, tx_interval: Duration) -> Self {
        Self {
            nodes: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            now: Duration::ZERO,
            tx_interval,
            transmissions: 0,
        }
    }

    pub fn add_node(&mut self, id: NodeId) -> Result<(), NetworkError> {
        if self.nodes.contains_key(&id) {
            return Err(NetworkError::DuplicateNode(id));
        }
        self.nodes.insert(id, Node::new(id));
        Ok(())
    }

    /// Add a directed link. Both endpoints must already exist.
    pub fn add_link(&mut self, from: NodeId, to: NodeId, probability: f64) -> Result<(), NetworkError> {
        if !self.nodes.contains_key(&to) {
            return Err(NetworkError::UnknownNode(to));
        }
        let link = Link::new(to, probability)?;
        self.node_mut(from)?.add_link(link);
        trace!("Added link {} -> {} (p = {})", from, to, probability);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetworkError> {
        self.nodes.get_mut(&id).ok_or(NetworkError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn transmissions(&self) -> u64 {
        self.transmissions
    }

    /// Broadcast `packet` from `from` over all of its links.
    pub fn send(&mut self, from: NodeId, packet: &ExOrPacket) -> Result<SendOutcome, NetworkError> {
        let sender = self.nodes.get(&from).ok_or(NetworkError::UnknownNode(from))?;
        let rng = &mut self.rng;
        let attempted = sender.links().len();
        let reached: Vec<NodeId> = sender
            .links()
            .iter()
            .filter(|link| link.attempt_delivery(rng))
            .map(Link::to)
            .collect();

        let now = self.now;
        let mut outcome = SendOutcome {
            attempted,
            delivered: Vec::with_capacity(reached.len()),
        };
        for to in reached {
            let received = self.node_mut(to)?.receive(packet, now);
            outcome.delivered.push((to, received));
        }

        trace!(
            "{} sent seq {} at {:?}: {}/{} delivered",
            from,
            packet.seq,
            now,
            outcome.delivered.len(),
            attempted
        );

        self.now += self.tx_interval;
        self.transmissions += 1;
        Ok(outcome)
    }

    /// Let `id` re-send its buffer according to `policy`.
    pub fn flush(&mut self, id: NodeId, policy: ForwardingPolicy) -> Result<FlushOutcome, NetworkError> {
        let outgoing = self
            .nodes
            .get(&id)
            .ok_or(NetworkError::UnknownNode(id))?
            .flush(policy);

        let mut result = FlushOutcome::default();
        for packet in &outgoing {
            let sent = self.send(id, packet)?;
            result.transmissions += 1;
            result.deliveries += sent.delivered.len();
            result.changes += sent.delivered.iter().filter(|(_, o)| o.changed()).count();
        }

        debug!(
            "{} flush: {} transmissions, {} deliveries, {} changes",
            id, result.transmissions, result.deliveries, result.changes
        );
        Ok(result)
    }

    /// Clear per-batch state everywhere and restart the clock and the
    /// generator from `seed`. Topology is kept.
    pub fn reset(&mut self, seed: u64) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
        self.now = Duration::ZERO;
        self.transmissions = 0;
    }
}
