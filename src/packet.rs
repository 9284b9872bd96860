//! Batch fragments and the bookkeeping they carry between hops.
//!
//! Every packet of a batch carries the same forwarder-priority list and a
//! snapshot of the sending node's batch map. Packets are plain values: each
//! hop transmits its own copy, so a node rewriting the map it attaches never
//! affects copies already buffered elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable node identity. All membership and priority checks compare ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// Sequence number of a packet within its batch.
pub type SeqNum = u32;

/// Best known holder of each packet of a batch.
pub type BatchMap = BTreeMap<SeqNum, NodeId>;

/// Ordered candidate forwarders, highest priority first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForwardList(Vec<NodeId>);

impl ForwardList {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    /// Position of `node` in the list, `None` when it is not a forwarder.
    pub fn priority(&self, node: NodeId) -> Option<usize> {
        self.0.iter().position(|&n| n == node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains(&node)
    }

    /// True when `candidate` ranks strictly ahead of `current`.
    ///
    /// Nodes outside the list never rank ahead of anything.
    pub fn prefers(&self, candidate: NodeId, current: NodeId) -> bool {
        match (self.priority(candidate), self.priority(current)) {
            (Some(c), Some(k)) => c < k,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NodeId>> for ForwardList {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }
}

/// One fragment of a batch as it travels over a single hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExOrPacket {
    pub batch_id: u32,
    pub seq: SeqNum,
    pub batch_size: u32,
    /// Reserved for payload splitting.
    pub frag_num: u32,
    /// Reserved for payload splitting.
    pub frag_size: u32,
    pub forward_list: ForwardList,
    pub batch_map: BatchMap,
    pub payload: Vec<u8>,
}

impl ExOrPacket {
    /// Copy of this packet carrying `batch_map` instead of its current snapshot.
    pub fn with_batch_map(&self, batch_map: BatchMap) -> Self {
        Self {
            batch_map,
            ..self.clone()
        }
    }
}

/// A full batch as built by the source.
#[derive(Debug, Clone)]
pub struct Batch {
    pub batch_id: u32,
    pub source: NodeId,
    pub forward_list: ForwardList,
    pub packets: Vec<ExOrPacket>,
}

impl Batch {
    /// Build packets `0..batch_size`, all sharing `forward_list` and a batch
    /// map that names `source` as the holder of every packet.
    pub fn new(
        batch_id: u32,
        source: NodeId,
        forward_list: ForwardList,
        batch_size: u32,
        payload: &[u8],
    ) -> Self {
        let batch_map: BatchMap = (0..batch_size).map(|seq| (seq, source)).collect();
        let packets = (0..batch_size)
            .map(|seq| ExOrPacket {
                batch_id,
                seq,
                batch_size,
                frag_num: 0,
                frag_size: 0,
                forward_list: forward_list.clone(),
                batch_map: batch_map.clone(),
                payload: payload.to_vec(),
            })
            .collect();

        Self {
            batch_id,
            source,
            forward_list,
            packets,
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[u32]) -> ForwardList {
        ForwardList::new(ids.iter().copied().map(NodeId).collect())
    }

    #[test]
    fn test_priority_lookup() {
        let fl = list(&[1, 2, 5]);
        assert_eq!(fl.priority(NodeId(1)), Some(0));
        assert_eq!(fl.priority(NodeId(5)), Some(2));
        assert_eq!(fl.priority(NodeId(0)), None);
        assert!(fl.contains(NodeId(2)));
        assert!(!fl.contains(NodeId(9)));
    }

    #[test]
    fn test_prefers_treats_outsiders_as_lowest() {
        let fl = list(&[1, 2]);
        assert!(fl.prefers(NodeId(1), NodeId(2)));
        assert!(!fl.prefers(NodeId(2), NodeId(1)));
        assert!(!fl.prefers(NodeId(1), NodeId(1)));
        // Any listed node beats an unlisted one, unlisted never wins
        assert!(fl.prefers(NodeId(2), NodeId(0)));
        assert!(!fl.prefers(NodeId(0), NodeId(2)));
        assert!(!fl.prefers(NodeId(0), NodeId(7)));
    }

    #[test]
    fn test_batch_construction() {
        let batch = Batch::new(3, NodeId(0), list(&[1, 2]), 4, b"hello");
        assert_eq!(batch.len(), 4);
        for (i, packet) in batch.packets.iter().enumerate() {
            assert_eq!(packet.seq, i as u32);
            assert_eq!(packet.batch_id, 3);
            assert_eq!(packet.batch_size, 4);
            assert_eq!(packet.payload, b"hello".to_vec());
            assert_eq!(packet.batch_map.len(), 4);
            assert!(packet.batch_map.values().all(|&n| n == NodeId(0)));
        }
    }

    #[test]
    fn test_with_batch_map_leaves_original_untouched() {
        let batch = Batch::new(0, NodeId(0), list(&[1]), 2, b"");
        let original = &batch.packets[0];
        let mut map = BatchMap::new();
        map.insert(0, NodeId(1));

        let copy = original.with_batch_map(map.clone());
        assert_eq!(copy.batch_map, map);
        assert_eq!(original.batch_map.get(&0), Some(&NodeId(0)));
        assert_eq!(copy.seq, original.seq);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "n7");
    }
}
