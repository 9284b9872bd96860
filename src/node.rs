//! Per-node ExOR forwarding state.
//!
//! A node only takes part in a batch when it appears in the batch's
//! forwarder list. Participating nodes buffer one copy of every packet they
//! overhear, merge the batch maps carried by incoming packets into their own
//! and hand the buffered packets back out on flush, each stamped with the
//! node's merged view.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::link::Link;
use crate::packet::{BatchMap, ExOrPacket, ForwardList, NodeId, SeqNum};
use crate::rate::RateEstimator;

/// Which buffered packets a node re-sends on flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingPolicy {
    /// Re-send everything in the buffer
    Unconditional,
    /// Re-send only packets this node is the best known holder of
    #[default]
    BestHolder,
}

impl std::fmt::Display for ForwardingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardingPolicy::Unconditional => write!(f, "unconditional"),
            ForwardingPolicy::BestHolder => write!(f, "best_holder"),
        }
    }
}

impl std::str::FromStr for ForwardingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "unconditional" => Ok(ForwardingPolicy::Unconditional),
            "best_holder" => Ok(ForwardingPolicy::BestHolder),
            other => Err(format!("Unknown forwarding policy: {}", other)),
        }
    }
}

/// What a single `receive` did to the node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// The node is in the packet's forwarder list
    pub eligible: bool,
    /// The packet was new and went into the buffer
    pub stored: bool,
    /// Batch map entries added or tightened
    pub map_updates: usize,
}

impl ReceiveOutcome {
    fn not_forwarder() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self) -> bool {
        self.eligible && !self.stored
    }

    pub fn changed(&self) -> bool {
        self.stored || self.map_updates > 0
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    links: Vec<Link>,
    packets: Vec<ExOrPacket>,
    forward_list: ForwardList,
    batch_map: BatchMap,
    rate: RateEstimator,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            links: Vec::new(),
            packets: Vec::new(),
            forward_list: ForwardList::default(),
            batch_map: BatchMap::new(),
            rate: RateEstimator::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Buffered packets in arrival order, one per sequence number.
    pub fn packets(&self) -> &[ExOrPacket] {
        &self.packets
    }

    pub fn received_seqs(&self) -> BTreeSet<SeqNum> {
        self.packets.iter().map(|p| p.seq).collect()
    }

    pub fn forward_list(&self) -> &ForwardList {
        &self.forward_list
    }

    pub fn batch_map(&self) -> &BatchMap {
        &self.batch_map
    }

    pub fn best_holder(&self, seq: SeqNum) -> Option<NodeId> {
        self.batch_map.get(&seq).copied()
    }

    pub fn rate(&self) -> &RateEstimator {
        &self.rate
    }

    /// Predicted wait before the upstream sender is done with the batch.
    pub fn forward_delay(&self) -> Option<Duration> {
        let batch_size = self.packets.first()?.batch_size;
        self.rate.forward_delay(batch_size)
    }

    /// Take in a packet overheard at simulated time `now`.
    pub fn receive(&mut self, packet: &ExOrPacket, now: Duration) -> ReceiveOutcome {
        if !packet.forward_list.contains(self.id) {
            trace!("{} not a forwarder for batch {}, ignoring seq {}", self.id, packet.batch_id, packet.seq);
            return ReceiveOutcome::not_forwarder();
        }

        let was_empty = self.packets.is_empty();
        let stored = !self.packets.iter().any(|p| p.seq == packet.seq);
        if stored {
            self.packets.push(packet.clone());
        }

        self.forward_list = packet.forward_list.clone();

        // Our own copy counts as a holder before anything the packet claims
        let mut map_updates = usize::from(self.record_holder(packet.seq, self.id));
        for (&seq, &candidate) in &packet.batch_map {
            if self.record_holder(seq, candidate) {
                map_updates += 1;
            }
        }

        if was_empty {
            self.rate.baseline(packet.seq, now);
        } else {
            self.rate.observe(packet.seq, now);
        }

        debug!(
            "{} received seq {} of batch {} (stored: {}, map updates: {})",
            self.id, packet.seq, packet.batch_id, stored, map_updates
        );

        ReceiveOutcome {
            eligible: true,
            stored,
            map_updates,
        }
    }

    /// Record `candidate` as holder of `seq` if it outranks the current entry.
    fn record_holder(&mut self, seq: SeqNum, candidate: NodeId) -> bool {
        if !self.forward_list.contains(candidate) {
            return false;
        }
        match self.batch_map.get(&seq) {
            Some(&current) if !self.forward_list.prefers(candidate, current) => false,
            _ => {
                self.batch_map.insert(seq, candidate);
                true
            }
        }
    }

    /// Outgoing copies of the buffered packets, each carrying this node's
    /// current batch map.
    pub fn flush(&self, policy: ForwardingPolicy) -> Vec<ExOrPacket> {
        let outgoing: Vec<ExOrPacket> = self
            .packets
            .iter()
            .filter(|p| match policy {
                ForwardingPolicy::Unconditional => true,
                ForwardingPolicy::BestHolder => {
                    self.best_holder(p.seq).map_or(true, |holder| holder == self.id)
                }
            })
            .map(|p| p.with_batch_map(self.batch_map.clone()))
            .collect();

        debug!(
            "{} flushing {} of {} buffered packets ({})",
            self.id,
            outgoing.len(),
            self.packets.len(),
            policy
        );
        outgoing
    }

    /// Drop all per-batch state. Links stay.
    pub fn reset(&mut self) {
        self.packets.clear();
        self.forward_list = ForwardList::default();
        self.batch_map.clear();
        self.rate.reset();
    }
}
