//! DebateGraph: the keyed store holding every utterance node
//!
//! A plain map from id to node. Edges are implicit via `target_id` and are
//! discovered by full scan when needed; node counts stay in the tens to low
//! hundreds per debate, so no adjacency index is kept.

use super::node::{NodeId, UtteranceNode};
use std::collections::{HashMap, HashSet};

/// The in-memory argument graph for one debate.
///
/// Mutated only by the round processor during construction and by the
/// deduplicator during cleanup. Removing a node never cascades; the two
/// legitimate callers maintain referential integrity themselves.
#[derive(Debug, Clone, Default)]
pub struct DebateGraph {
    nodes: HashMap<NodeId, UtteranceNode>,
}

impl DebateGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, overwriting any existing node with the same id
    /// (last-writer-wins, used for controlled replacement).
    pub fn add_node(&mut self, node: UtteranceNode) {
        self.nodes.insert(node.id, node);
    }

    /// Delete a node if present; no-op otherwise.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    /// Get a node by id.
    pub fn get_node(&self, id: NodeId) -> Option<&UtteranceNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut UtteranceNode> {
        self.nodes.get_mut(&id)
    }

    /// Check whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate over all nodes in arbitrary order.
    pub fn nodes(&self) -> impl Iterator<Item = &UtteranceNode> {
        self.nodes.values()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids, ascending.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Remove later nodes whose `text` exactly matches an earlier node's.
    ///
    /// Nodes are scanned in ascending id order, so the first (oldest) node
    /// wins for each distinct text. This is a cheap pre-filter; semantic
    /// deduplication is a separate pass. Returns the number of removed
    /// nodes. Idempotent.
    pub fn dedupe_by_text(&mut self) -> usize {
        let mut seen: HashSet<String> = HashSet::new();
        let mut to_remove: Vec<NodeId> = Vec::new();
        for id in self.ids() {
            let text = &self.nodes[&id].text;
            if !seen.insert(text.clone()) {
                to_remove.push(id);
            }
        }
        for id in &to_remove {
            self.remove_node(*id);
        }
        to_remove.len()
    }

    /// An ordered list of node records, suitable for handing to the
    /// extraction oracle or for persistence. Ordered by ascending id.
    pub fn snapshot(&self) -> Vec<UtteranceNode> {
        let mut records: Vec<UtteranceNode> = self.nodes.values().cloned().collect();
        records.sort_by_key(|n| n.id);
        records
    }

    /// Rebuild a graph from a record list (the snapshot wire form).
    pub fn from_records(records: Vec<UtteranceNode>) -> Self {
        let mut graph = Self::new();
        for node in records {
            graph.add_node(node);
        }
        graph
    }
}
