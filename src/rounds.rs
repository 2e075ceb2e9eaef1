//! Round processor — drives the extraction oracle and applies its updates
//!
//! Processes rounds strictly in order: each round's context snapshot and id
//! allocation depend on the state left by earlier rounds. A failed round
//! contributes zero nodes and is never fatal to the debate.

use crate::config::JudgeConfig;
use crate::graph::{DebateGraph, NodeId, UtteranceNode};
use crate::oracle::{parse_updates, ExtractionOracle, OracleError, UpdateAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One (speaker, text) contribution, as produced by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
}

/// What happened to a single round. Failures are recorded, not raised.
#[derive(Debug, Default)]
pub struct RoundSummary {
    pub round_number: u32,
    /// Nodes materialized from this round's updates.
    pub nodes_added: usize,
    /// Updates discarded (unknown action, or no resolvable target).
    pub updates_dropped: usize,
    /// Verbatim repeats removed by the post-round text dedup.
    pub duplicates_removed: usize,
    /// Set when the oracle call or its output parse failed; the round then
    /// contributed nothing.
    pub failure: Option<OracleError>,
}

/// Builds the argument graph from sequential round transcripts.
pub struct RoundProcessor {
    graph: DebateGraph,
    next_id: u64,
    opening_rounds: BTreeSet<u32>,
    window: u32,
    oracle: Arc<dyn ExtractionOracle>,
}

impl RoundProcessor {
    pub fn new(config: &JudgeConfig, oracle: Arc<dyn ExtractionOracle>) -> Self {
        Self {
            graph: DebateGraph::new(),
            next_id: 0,
            opening_rounds: config.opening_rounds.clone(),
            window: config.window,
            oracle,
        }
    }

    /// The graph built so far.
    pub fn graph(&self) -> &DebateGraph {
        &self.graph
    }

    /// Consume the processor, yielding the finished graph.
    pub fn into_graph(self) -> DebateGraph {
        self.graph
    }

    fn alloc_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    /// The subset of the graph exposed to the oracle for this round.
    ///
    /// Three tiers: opening rounds see nothing (the graph does not yet
    /// exist from the oracle's point of view); early rounds see everything;
    /// later rounds see the opening-round nodes plus a sliding window of
    /// recent ones. Opening claims are the structural backbone and must
    /// never fall out of view.
    pub fn context_snapshot(&self, round_number: u32) -> Vec<UtteranceNode> {
        if self.opening_rounds.contains(&round_number) {
            return Vec::new();
        }
        if round_number <= 2 + self.window {
            return self.graph.snapshot();
        }
        let horizon = round_number.saturating_sub(self.window);
        self.graph
            .snapshot()
            .into_iter()
            .filter(|n| self.opening_rounds.contains(&n.round_number) || n.round_number >= horizon)
            .collect()
    }

    fn render_transcript(utterances: &[Utterance]) -> String {
        utterances
            .iter()
            .map(|u| format!("{}: {}", u.speaker, u.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Process one round: build the context snapshot, consult the oracle,
    /// interpret its updates in order, then drop verbatim repeats.
    pub async fn process_round(
        &mut self,
        round_number: u32,
        utterances: &[Utterance],
    ) -> RoundSummary {
        let mut summary = RoundSummary {
            round_number,
            ..Default::default()
        };

        let transcript = Self::render_transcript(utterances);
        let snapshot = self.context_snapshot(round_number);
        let snapshot_json = serde_json::to_string_pretty(&snapshot)
            .expect("node records serialize infallibly");
        debug!(
            round = round_number,
            snapshot_nodes = snapshot.len(),
            transcript_len = transcript.len(),
            "consulting extraction oracle"
        );

        let raw = match self.oracle.extract(&transcript, &snapshot_json).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(round = round_number, error = %e, "oracle call failed; round contributes nothing");
                summary.failure = Some(e);
                return summary;
            }
        };
        let updates = match parse_updates(&raw) {
            Ok(updates) => updates,
            Err(e) => {
                warn!(round = round_number, error = %e, "oracle output unusable; round contributes nothing");
                summary.failure = Some(e);
                return summary;
            }
        };
        if updates.is_empty() {
            info!(round = round_number, "no updates this round");
            return summary;
        }

        let mut last_claim: Option<NodeId> = None;
        for update in updates {
            match update.action {
                UpdateAction::Claim => {
                    let id = self.alloc_id();
                    let importance = update.importance.unwrap_or(1.0);
                    info!(round = round_number, %id, speaker = %update.speaker, importance, "new claim");
                    self.graph.add_node(UtteranceNode::claim(
                        id,
                        update.speaker,
                        update.text,
                        importance,
                        round_number,
                    ));
                    last_claim = Some(id);
                    summary.nodes_added += 1;
                }
                UpdateAction::Support | UpdateAction::Attack => {
                    let supplied = update
                        .parsed_target()
                        .filter(|t| self.graph.contains(*t));
                    // In round 1 every reference reattaches to the most
                    // recent claim, even when the oracle supplied a
                    // resolvable target.
                    let resolved = if round_number == 1 { None } else { supplied };
                    let Some(target) = resolved.or(last_claim) else {
                        warn!(
                            round = round_number,
                            speaker = %update.speaker,
                            "no target and no claim to fall back to; dropping update"
                        );
                        summary.updates_dropped += 1;
                        continue;
                    };
                    let id = self.alloc_id();
                    let delta = update.delta.unwrap_or(0.0);
                    let node = if update.action == UpdateAction::Support {
                        UtteranceNode::support(id, update.speaker, update.text, target, delta, round_number)
                    } else {
                        UtteranceNode::attack(id, update.speaker, update.text, target, delta, round_number)
                    };
                    info!(round = round_number, %id, target = %target, delta = node.delta, "new {:?}", node.kind);
                    self.graph.add_node(node);
                    summary.nodes_added += 1;
                }
                UpdateAction::Other(tag) => {
                    warn!(round = round_number, tag = %tag, "unrecognized action; dropping update");
                    summary.updates_dropped += 1;
                }
            }
        }

        summary.duplicates_removed = self.graph.dedupe_by_text();
        if summary.duplicates_removed > 0 {
            debug!(
                round = round_number,
                removed = summary.duplicates_removed,
                "removed verbatim repeats"
            );
        }
        summary
    }

    #[cfg(test)]
    fn seed_node(&mut self, node: UtteranceNode) {
        self.next_id = self.next_id.max(node.id.index());
        self.graph.add_node(node);
    }
}
