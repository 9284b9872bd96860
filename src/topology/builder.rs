//! Network construction from configuration.

use log::{debug, info};
use std::collections::HashSet;

use crate::config::{Config, NetworkConfig};
use crate::network::{Network, NetworkError};
use crate::topology::templates::generate_template_links;
use crate::topology::types::LinkConfig;

/// All links of a network section: explicit ones first, then template links
/// for node pairs the explicit list does not already cover.
pub fn collect_links(network: &NetworkConfig) -> Vec<LinkConfig> {
    let mut seen: HashSet<_> = HashSet::new();
    let mut links = Vec::with_capacity(network.links.len());

    for link in &network.links {
        if seen.insert((link.from, link.to)) {
            links.push(*link);
        }
    }

    if let Some(template) = &network.template {
        for link in generate_template_links(template, &network.nodes) {
            if seen.insert((link.from, link.to)) {
                links.push(link);
            } else {
                debug!("Explicit link {} -> {} overrides template", link.from, link.to);
            }
        }
    }

    links
}

/// Build the simulated network described by `config`
pub fn build_network(config: &Config) -> Result<Network, NetworkError> {
    let mut network = Network::new(config.general.seed, config.general.tx_interval);

    for &id in &config.network.nodes {
        network.add_node(id)?;
    }

    let links = collect_links(&config.network);
    for link in &links {
        network.add_link(link.from, link.to, link.probability)?;
    }

    info!(
        "Built network with {} nodes and {} links",
        network.len(),
        links.len()
    );
    Ok(network)
}
