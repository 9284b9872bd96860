#[cfg(test)]
mod exor_scenarios {
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::time::Duration;

    use exorsim::config_loader::load_config;
    use exorsim::network::{Network, DEFAULT_TX_INTERVAL};
    use exorsim::node::ForwardingPolicy;
    use exorsim::packet::{Batch, ForwardList, NodeId, SeqNum};
    use exorsim::simulation::Simulation;

    const A: NodeId = NodeId(0);
    const B: NodeId = NodeId(1);
    const C: NodeId = NodeId(2);
    const D: NodeId = NodeId(3);

    fn network(seed: u64, nodes: &[NodeId], links: &[(NodeId, NodeId, f64)]) -> Network {
        let mut net = Network::new(seed, DEFAULT_TX_INTERVAL);
        for &id in nodes {
            net.add_node(id).unwrap();
        }
        for &(from, to, p) in links {
            net.add_link(from, to, p).unwrap();
        }
        net
    }

    fn send_batch(net: &mut Network, batch: &Batch) {
        for packet in &batch.packets {
            net.send(batch.source, packet).unwrap();
        }
    }

    fn chain_batch() -> Batch {
        Batch::new(0, A, ForwardList::new(vec![B, C]), 3, b"hello")
    }

    fn config_path(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("configs").join(name)
    }

    /// A -> B -> C with perfect links delivers the whole batch
    #[test]
    fn test_perfect_chain() {
        let mut net = network(1, &[A, B, C], &[(A, B, 1.0), (B, C, 1.0)]);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::Unconditional).unwrap();

        let seqs: Vec<SeqNum> = net.node(C).unwrap().received_seqs().into_iter().collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    /// Nothing crosses a dead first hop
    #[test]
    fn test_dead_first_hop() {
        let mut net = network(1, &[A, B, C], &[(A, B, 0.0), (B, C, 1.0)]);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::Unconditional).unwrap();

        assert!(net.node(B).unwrap().packets().is_empty());
        assert!(net.node(C).unwrap().packets().is_empty());
    }

    /// The source is not a forwarder, so C learns B as best holder
    #[test]
    fn test_batch_map_names_relay() {
        let mut net = network(1, &[A, B, C], &[(A, B, 1.0), (B, C, 1.0)]);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::BestHolder).unwrap();

        let c = net.node(C).unwrap();
        for seq in 0..3 {
            assert_eq!(c.best_holder(seq), Some(B));
        }
        assert!(c.batch_map().values().all(|&n| n != A));
    }

    /// An overhearing node outside the forwarder list keeps no state
    #[test]
    fn test_outsider_stays_clean() {
        let mut net = network(1, &[A, B, C, D], &[(A, B, 1.0), (A, D, 1.0), (B, D, 1.0), (B, C, 1.0)]);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::Unconditional).unwrap();

        let d = net.node(D).unwrap();
        assert!(d.packets().is_empty());
        assert!(d.batch_map().is_empty());
        assert!(d.forward_list().is_empty());
        assert_eq!(d.rate().last_seq(), None);
    }

    /// Repeated flushes never buffer a sequence number twice
    #[test]
    fn test_dedup_under_repeated_flush() {
        let mut net = network(3, &[A, B, C], &[(A, B, 1.0), (A, C, 1.0), (B, C, 1.0), (C, B, 1.0)]);
        send_batch(&mut net, &chain_batch());
        for _ in 0..5 {
            net.flush(B, ForwardingPolicy::Unconditional).unwrap();
            net.flush(C, ForwardingPolicy::Unconditional).unwrap();
        }

        for id in [B, C] {
            let node = net.node(id).unwrap();
            assert_eq!(node.packets().len(), 3);
            assert_eq!(node.received_seqs().len(), 3);
        }
    }

    /// Best-holder indices only move towards the front of the list
    #[test]
    fn test_batch_map_tightens_monotonically() {
        let nodes: Vec<NodeId> = (0..6).map(NodeId).collect();
        let mut links = Vec::new();
        for &from in &nodes {
            for &to in &nodes {
                if from != to {
                    links.push((from, to, 0.5));
                }
            }
        }
        let mut net = network(2024, &nodes, &links);
        let forward_list = ForwardList::new(nodes[1..].to_vec());
        let batch = Batch::new(0, A, forward_list.clone(), 16, b"");
        send_batch(&mut net, &batch);

        let snapshot = |net: &Network| -> BTreeMap<(NodeId, SeqNum), usize> {
            net.nodes()
                .flat_map(|node| {
                    node.batch_map()
                        .iter()
                        .map(move |(&seq, &holder)| ((node.id(), seq), holder))
                })
                .map(|(key, holder)| (key, forward_list.priority(holder).unwrap()))
                .collect()
        };

        let mut previous = snapshot(&net);
        for _ in 0..8 {
            for &id in forward_list.iter() {
                net.flush(id, ForwardingPolicy::Unconditional).unwrap();
                let current = snapshot(&net);
                for (key, index) in &previous {
                    let now = current.get(key).expect("batch map entries are never removed");
                    assert!(now <= index, "{:?} loosened from {} to {}", key, index, now);
                }
                previous = current;
            }
        }
    }

    /// In a triangle the destination hears the relay's better claim and abstains
    #[test]
    fn test_best_holder_policy_suppresses_destination() {
        let links = [(A, B, 1.0), (A, C, 1.0), (B, C, 1.0), (C, B, 1.0)];

        let mut net = network(5, &[A, B, C], &links);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::BestHolder).unwrap();
        let flushed = net.flush(C, ForwardingPolicy::BestHolder).unwrap();
        assert_eq!(flushed.transmissions, 0);

        let mut net = network(5, &[A, B, C], &links);
        send_batch(&mut net, &chain_batch());
        net.flush(B, ForwardingPolicy::Unconditional).unwrap();
        let flushed = net.flush(C, ForwardingPolicy::Unconditional).unwrap();
        assert_eq!(flushed.transmissions, 3);
    }

    /// Evenly spaced arrivals converge on the inverse of the spacing
    #[test]
    fn test_rate_estimate_converges() {
        let interval = Duration::from_millis(5);
        let mut net = Network::new(0, interval);
        for id in [A, B] {
            net.add_node(id).unwrap();
        }
        net.add_link(A, B, 1.0).unwrap();
        send_batch(&mut net, &Batch::new(0, A, ForwardList::new(vec![B]), 200, b""));

        let rate = net.node(B).unwrap().rate().rate();
        assert!((rate - 200.0).abs() < 1.0, "rate {}", rate);
    }

    /// Shipped configurations load and replay identically under one seed
    #[test]
    fn test_shipped_configs_are_reproducible() {
        for name in ["triangle.yaml", "mesh.yaml"] {
            let config = load_config(&config_path(name)).unwrap();

            let first = Simulation::from_config(&config).unwrap().run().unwrap();
            let second = Simulation::from_config(&config).unwrap().run().unwrap();
            assert_eq!(first.runs, second.runs, "{} diverged", name);
            assert_eq!(first.runs.len(), config.general.runs as usize);

            for run in &first.runs {
                assert!(run.delivery_ratio >= 0.0 && run.delivery_ratio <= 1.0);
                assert_eq!(run.delivered.len() + run.missing.len(), config.batch.size as usize);
                assert!(run.rounds <= config.general.max_rounds);
            }
        }
    }

    /// The relay path makes the triangle far more reliable than the direct link
    #[test]
    fn test_triangle_relay_beats_direct_link() {
        let config = load_config(&config_path("triangle.yaml")).unwrap();
        let report = Simulation::from_config(&config).unwrap().run().unwrap();
        assert!(
            report.summary.mean_delivery_ratio > 0.5,
            "mean delivery {}",
            report.summary.mean_delivery_ratio
        );
    }
}
