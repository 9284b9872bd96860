//! # ExOrSim - Simulator for ExOR-style opportunistic routing
//!
//! A source disseminates a fixed batch of packets across a lossy mesh.
//! Every node on the batch's forwarder list that overhears a packet may
//! relay it, and forwarders coordinate through a per-packet batch map that
//! records the highest-priority node known to hold each packet.
//!
//! ## Architecture
//!
//! - `packet`: node ids, forwarder lists, batch maps and batch fragments
//! - `link`: lossy one-way channels (one Bernoulli trial per attempt)
//! - `rate`: smoothed upstream transmission-rate estimation
//! - `node`: the receive/merge/flush protocol of a single node
//! - `network`: node arena, seeded generator and simulated clock
//! - `config`, `config_loader`: YAML configuration and validation
//! - `topology`: link generation and network construction
//! - `simulation`: batch injection and bounded flush rounds
//! - `report`: JSON and text output
//!
//! ## Example Usage
//!
//! ```rust
//! use exorsim::network::{Network, DEFAULT_TX_INTERVAL};
//! use exorsim::node::ForwardingPolicy;
//! use exorsim::packet::{Batch, ForwardList, NodeId};
//!
//! let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));
//! let mut network = Network::new(42, DEFAULT_TX_INTERVAL);
//! for id in [a, b, c] {
//!     network.add_node(id)?;
//! }
//! network.add_link(a, b, 1.0)?;
//! network.add_link(b, c, 1.0)?;
//!
//! let batch = Batch::new(0, a, ForwardList::new(vec![b, c]), 3, b"hello");
//! for packet in &batch.packets {
//!     network.send(a, packet)?;
//! }
//! network.flush(b, ForwardingPolicy::BestHolder)?;
//!
//! assert_eq!(network.node(c).unwrap().packets().len(), 3);
//! # Ok::<(), exorsim::network::NetworkError>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   seed: 42
//!   tx_interval: "1ms"
//!   policy: best_holder    # or unconditional
//! network:
//!   nodes: [0, 1, 2]
//!   links:
//!     - { from: 0, to: 1, probability: 0.8 }
//!     - { from: 1, to: 2, probability: 0.9 }
//! batch:
//!   source: 0
//!   destination: 2
//!   size: 10
//!   forwarders: [1, 2]
//! ```
//!
//! ## Error Handling
//!
//! Library modules return `thiserror` enums; the loader, report writers and
//! the binary use `color_eyre` for context-rich errors.

pub mod packet;
pub mod link;
pub mod rate;
pub mod node;
pub mod network;

pub mod config;
pub mod config_loader;
pub mod topology;
pub mod simulation;
pub mod report;
