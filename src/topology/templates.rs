//! Link generation from topology templates.
//!
//! Templates walk the configured node list in order and emit directed links
//! with one shared delivery probability.

use std::collections::HashSet;

use crate::packet::NodeId;
use crate::topology::types::{LinkConfig, TemplateConfig, TopologyKind};

/// Generate links for a template
///
/// # Arguments
/// * `template` - Template kind, link probability and direction
/// * `nodes` - Nodes in template order; for Star the first one is the hub
///
/// # Returns
/// Directed links without duplicates, in generation order
pub fn generate_template_links(template: &TemplateConfig, nodes: &[NodeId]) -> Vec<LinkConfig> {
    let link = |from: NodeId, to: NodeId| LinkConfig {
        from,
        to,
        probability: template.probability,
    };

    let mut links: Vec<LinkConfig> = match template.kind {
        TopologyKind::Chain => nodes.windows(2).map(|w| link(w[0], w[1])).collect(),
        TopologyKind::Ring => {
            let mut links: Vec<LinkConfig> = nodes.windows(2).map(|w| link(w[0], w[1])).collect();
            if nodes.len() >= template.kind.min_nodes() {
                links.push(link(nodes[nodes.len() - 1], nodes[0]));
            }
            links
        }
        TopologyKind::Mesh => {
            let mut links = Vec::new();
            for &from in nodes {
                for &to in nodes {
                    // Don't connect to self
                    if from != to {
                        links.push(link(from, to));
                    }
                }
            }
            links
        }
        TopologyKind::Star => match nodes.split_first() {
            Some((&hub, rest)) => rest.iter().map(|&to| link(hub, to)).collect(),
            None => vec![],
        },
    };

    if template.bidirectional {
        let reversed: Vec<LinkConfig> = links.iter().map(|l| link(l.to, l.from)).collect();
        links.extend(reversed);
    }

    // Remove duplicates
    let mut seen = HashSet::new();
    links.retain(|l| seen.insert((l.from, l.to)));
    links
}
