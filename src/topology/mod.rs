//! Network topology module.
//!
//! This module turns the `network` section of a configuration into a
//! populated [`Network`](crate::network::Network): explicit links as given,
//! plus the links a template generates over the node list.

pub mod types;
pub mod templates;
pub mod builder;

// Re-export key types and functions for easier access
pub use types::{LinkConfig, TopologyKind};
pub use templates::generate_template_links;
pub use builder::{build_network, collect_links};
