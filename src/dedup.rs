//! Semantic deduplicator
//!
//! Runs once over the finished graph: embeds every node's text, finds pairs
//! above the similarity threshold, merges each pair into its smaller-id
//! node through a transitive redirect map, and rewrites the `target_id` of
//! every surviving node. Idempotent: a second pass over the cleaned graph
//! deletes nothing.

use crate::config::JudgeConfig;
use crate::embedding::{cosine_similarity, embed_all, Embedder, EmbeddingError};
use crate::graph::{DebateGraph, NodeId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a deduplication pass.
#[derive(Debug, Default)]
pub struct DedupReport {
    /// Nodes removed as duplicates.
    pub removed: usize,
    /// Collapsed redirect map: every deleted id maps directly to its final
    /// surviving representative, never to another deleted id.
    pub redirects: HashMap<NodeId, NodeId>,
}

/// Merges semantically duplicate nodes across the whole graph.
pub struct Deduplicator {
    threshold: f32,
    batch_size: usize,
    embedder: Arc<dyn Embedder>,
}

impl Deduplicator {
    pub fn new(config: &JudgeConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            threshold: config.similarity_threshold,
            batch_size: config.embedding_batch_size,
            embedder,
        }
    }

    /// Deduplicate the graph in place.
    ///
    /// On an embedding failure the graph is left untouched and the error is
    /// returned; the caller decides whether to proceed on the unclean graph.
    pub async fn dedupe(&self, graph: &mut DebateGraph) -> Result<DedupReport, EmbeddingError> {
        let records = graph.snapshot();
        if records.len() < 2 {
            return Ok(DedupReport::default());
        }

        let texts: Vec<String> = records.iter().map(|n| n.text.clone()).collect();
        let vectors = embed_all(self.embedder.as_ref(), &texts, self.batch_size).await?;
        debug!(nodes = records.len(), "embedded node texts for deduplication");

        // All pairs above the threshold. `records` is id-ordered, so the
        // first id of each pair is the smaller (older) one.
        let mut pairs: Vec<(f32, NodeId, NodeId)> = Vec::new();
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let similarity = cosine_similarity(&vectors[i], &vectors[j]);
                if similarity > self.threshold {
                    pairs.push((similarity, records[i].id, records[j].id));
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut redirects: HashMap<NodeId, NodeId> = HashMap::new();
        let mut deleted: HashSet<NodeId> = HashSet::new();
        for (similarity, keep, drop) in pairs {
            if deleted.contains(&drop) {
                continue;
            }
            // Merges are transitive: route through any earlier redirect so
            // the retained node is itself a survivor.
            let retained = resolve(&redirects, keep);
            info!(%drop, %retained, similarity, "merging duplicate node");
            redirects.insert(drop, retained);
            deleted.insert(drop);
        }

        // Collapse chains so no multi-hop indirection survives.
        let final_redirects: HashMap<NodeId, NodeId> = redirects
            .keys()
            .map(|&id| (id, resolve(&redirects, id)))
            .collect();

        for id in &deleted {
            graph.remove_node(*id);
        }
        for id in graph.ids() {
            let Some(node) = graph.get_node_mut(id) else {
                continue;
            };
            if let Some(target) = node.target_id {
                if let Some(&survivor) = final_redirects.get(&target) {
                    node.target_id = Some(survivor);
                }
            }
        }

        Ok(DedupReport {
            removed: deleted.len(),
            redirects: final_redirects,
        })
    }
}

/// Follow redirect entries to the terminal survivor. Chains strictly
/// decrease in id, so this always terminates.
fn resolve(redirects: &HashMap<NodeId, NodeId>, mut id: NodeId) -> NodeId {
    while let Some(&next) = redirects.get(&id) {
        id = next;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedder;
    use crate::graph::UtteranceNode;

    fn unit8(components: &[f32]) -> Vec<f32> {
        let mut v = components.to_vec();
        v.resize(8, 0.0);
        v
    }

    fn deduplicator(embedder: MockEmbedder) -> Deduplicator {
        Deduplicator::new(&JudgeConfig::default(), Arc::new(embedder))
    }

    // --- Scenario: duplicate pair merges into the smaller id ---

    #[tokio::test]
    async fn duplicate_pair_merges_and_rewrites_referrers() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(3), "Pro", "older claim", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(7), "Pro", "newer claim", 0.8, 4));
        graph.add_node(UtteranceNode::support(
            NodeId::new(8),
            "Pro",
            "evidence",
            NodeId::new(7),
            0.2,
            5,
        ));

        // cosine("older claim", "newer claim") = 0.91 > 0.85
        let embedder = MockEmbedder::new()
            .with_vector("older claim", unit8(&[1.0]))
            .with_vector("newer claim", unit8(&[0.91, 0.4146]))
            .with_vector("evidence", unit8(&[0.0, 0.0, 1.0]));

        let report = deduplicator(embedder).dedupe(&mut graph).await.unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.redirects.get(&NodeId::new(7)), Some(&NodeId::new(3)));
        assert!(graph.contains(NodeId::new(3)));
        assert!(!graph.contains(NodeId::new(7)));
        assert_eq!(
            graph.get_node(NodeId::new(8)).unwrap().target_id,
            Some(NodeId::new(3))
        );
    }

    #[tokio::test]
    async fn below_threshold_pairs_are_not_merged() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "a", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Pro", "b", 1.0, 1));

        // Similar, but under the 0.85 threshold.
        let embedder = MockEmbedder::new()
            .with_vector("a", unit8(&[1.0]))
            .with_vector("b", unit8(&[0.84, (1.0f32 - 0.84 * 0.84).sqrt()]));

        let report = deduplicator(embedder).dedupe(&mut graph).await.unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(graph.node_count(), 2);
    }

    // --- Scenario: merges are transitive ---

    #[tokio::test]
    async fn redirect_chains_collapse_to_the_final_survivor() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Pro", "earliest", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(5), "Pro", "middle", 1.0, 2));
        graph.add_node(UtteranceNode::claim(NodeId::new(9), "Pro", "latest", 1.0, 3));
        graph.add_node(UtteranceNode::attack(
            NodeId::new(10),
            "Con",
            "objection",
            NodeId::new(9),
            0.3,
            4,
        ));

        // sim(middle, latest) = 0.95 is processed first (9 -> 5), then
        // sim(earliest, middle) = 0.88 deletes 5 (5 -> 2); the 9 -> 5 entry
        // must collapse to 2. sim(earliest, latest) = 0.836 stays below the
        // threshold.
        let embedder = MockEmbedder::new()
            .with_vector("middle", unit8(&[1.0]))
            .with_vector("latest", unit8(&[0.95, 0.3122]))
            .with_vector("earliest", unit8(&[0.88, 0.0, 0.475]))
            .with_vector("objection", unit8(&[0.0, 0.0, 0.0, 1.0]));

        let report = deduplicator(embedder).dedupe(&mut graph).await.unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(report.redirects.get(&NodeId::new(9)), Some(&NodeId::new(2)));
        assert_eq!(report.redirects.get(&NodeId::new(5)), Some(&NodeId::new(2)));
        assert_eq!(
            graph.get_node(NodeId::new(10)).unwrap().target_id,
            Some(NodeId::new(2))
        );
        // No redirect key survives as a value.
        for target in report.redirects.values() {
            assert!(!report.redirects.contains_key(target));
        }
    }

    // --- Scenario: idempotence ---

    #[tokio::test]
    async fn rerunning_on_cleaned_graph_changes_nothing() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "x", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Pro", "y", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(3), "Con", "z", 1.0, 2));

        let embedder = MockEmbedder::new()
            .with_vector("x", unit8(&[1.0]))
            .with_vector("y", unit8(&[0.99, 0.1411]))
            .with_vector("z", unit8(&[0.0, 0.0, 1.0]));
        let dedup = deduplicator(embedder);

        let first = dedup.dedupe(&mut graph).await.unwrap();
        let after_first = graph.snapshot();
        let second = dedup.dedupe(&mut graph).await.unwrap();

        assert_eq!(first.removed, 1);
        assert_eq!(second.removed, 0);
        assert!(second.redirects.is_empty());
        assert_eq!(graph.snapshot(), after_first);
    }

    // --- Scenario: embedding failure aborts cleanly ---

    #[tokio::test]
    async fn embedding_failure_leaves_graph_untouched() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "x", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Pro", "y", 1.0, 1));
        let before = graph.snapshot();

        let result = deduplicator(MockEmbedder::failing()).dedupe(&mut graph).await;

        assert!(result.is_err());
        assert_eq!(graph.snapshot(), before);
    }

    #[tokio::test]
    async fn tiny_graphs_short_circuit() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "only", 1.0, 1));

        // The failing embedder is never consulted for a single node.
        let report = deduplicator(MockEmbedder::failing())
            .dedupe(&mut graph)
            .await
            .unwrap();
        assert_eq!(report.removed, 0);
    }
}
