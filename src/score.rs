//! Scorer — collapses the final graph into one total per side
//!
//! A pure function of the graph: no hidden state, identical results on
//! every run. Each claim contributes its positive aggregate (base
//! importance plus all incoming deltas) to its side; a claim argued down to
//! zero or below contributes nothing, and is never counted against the
//! opposing side.

use crate::config::JudgeConfig;
use crate::graph::{DebateGraph, NodeId};
use std::fmt;
use tracing::warn;

/// The outcome label of a debate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The side with the strictly highest total.
    Winner(String),
    /// Two or more sides share the highest total.
    Tie,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Winner(side) => write!(f, "{side}"),
            Verdict::Tie => write!(f, "Tie"),
        }
    }
}

/// Final scores for a debate.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    /// (side label, total) in configuration order.
    pub totals: Vec<(String, f64)>,
    pub verdict: Verdict,
    /// Claims excluded from the totals because their speaker is not a
    /// recognized side. A data-integrity signal, not a fatal error.
    pub unknown_speakers: Vec<(NodeId, String)>,
}

impl Scorecard {
    /// Total for one side, if that side is configured.
    pub fn total(&self, side: &str) -> Option<f64> {
        self.totals
            .iter()
            .find(|(s, _)| s == side)
            .map(|(_, total)| *total)
    }
}

/// A claim's effective importance: base importance plus every delta aimed
/// at it. Supports and attacks are already sign-correct. Deltas are summed
/// in id order so repeated runs accumulate identically.
pub fn claim_aggregate(graph: &DebateGraph, claim_id: NodeId) -> f64 {
    let base = graph
        .get_node(claim_id)
        .map(|n| n.base_importance)
        .unwrap_or(0.0);
    let adjustments: f64 = graph
        .ids()
        .into_iter()
        .filter_map(|id| graph.get_node(id))
        .filter(|n| n.target_id == Some(claim_id))
        .map(|n| n.delta)
        .sum();
    base + adjustments
}

/// Aggregates the final graph into side totals and a verdict.
pub struct Scorer {
    sides: Vec<String>,
}

impl Scorer {
    pub fn new(config: &JudgeConfig) -> Self {
        Self {
            sides: config.sides.clone(),
        }
    }

    pub fn score(&self, graph: &DebateGraph) -> Scorecard {
        let mut totals: Vec<(String, f64)> =
            self.sides.iter().map(|s| (s.clone(), 0.0)).collect();
        let mut unknown_speakers = Vec::new();

        for claim in graph.snapshot().iter().filter(|n| n.kind.is_claim()) {
            let aggregate = claim_aggregate(graph, claim.id);
            match totals.iter_mut().find(|(side, _)| side == &claim.speaker) {
                Some((_, total)) => {
                    if aggregate > 0.0 {
                        *total += aggregate;
                    }
                }
                None => {
                    warn!(id = %claim.id, speaker = %claim.speaker, "claim by unrecognized speaker excluded from totals");
                    unknown_speakers.push((claim.id, claim.speaker.clone()));
                }
            }
        }

        let verdict = verdict_for(&totals);
        Scorecard {
            totals,
            verdict,
            unknown_speakers,
        }
    }
}

fn verdict_for(totals: &[(String, f64)]) -> Verdict {
    let Some(best) = totals
        .iter()
        .map(|(_, t)| *t)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Verdict::Tie;
    };
    let mut leaders = totals.iter().filter(|(_, t)| *t == best);
    match (leaders.next(), leaders.next()) {
        (Some((side, _)), None) => Verdict::Winner(side.clone()),
        _ => Verdict::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UtteranceNode;

    fn scorer() -> Scorer {
        Scorer::new(&JudgeConfig::default())
    }

    #[test]
    fn aggregate_sums_base_and_incoming_deltas() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "c", 1.0, 1));
        graph.add_node(UtteranceNode::support(
            NodeId::new(2), "Pro", "s", NodeId::new(1), 0.3, 2,
        ));
        graph.add_node(UtteranceNode::attack(
            NodeId::new(3), "Con", "a", NodeId::new(1), 0.5, 2,
        ));

        let aggregate = claim_aggregate(&graph, NodeId::new(1));
        assert!((aggregate - 0.8).abs() < 1e-9);

        let card = scorer().score(&graph);
        assert!((card.total("Pro").unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(card.verdict, Verdict::Winner("Pro".to_string()));
    }

    #[test]
    fn negative_aggregates_contribute_nothing() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Con", "c", 0.3, 1));
        graph.add_node(UtteranceNode::attack(
            NodeId::new(2), "Pro", "a", NodeId::new(1), 0.5, 2,
        ));

        // Aggregate is -0.2: the claim contributes 0, and Pro gains nothing.
        let card = scorer().score(&graph);
        assert_eq!(card.total("Con"), Some(0.0));
        assert_eq!(card.total("Pro"), Some(0.0));
        assert_eq!(card.verdict, Verdict::Tie);
    }

    #[test]
    fn equal_totals_are_a_tie() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "c1", 1.0, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Con", "c2", 1.0, 3));

        assert_eq!(scorer().score(&graph).verdict, Verdict::Tie);
    }

    #[test]
    fn unknown_speaker_claims_are_excluded_but_reported() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Moderator", "c", 1.5, 1));
        graph.add_node(UtteranceNode::claim(NodeId::new(2), "Pro", "c2", 0.5, 1));

        let card = scorer().score(&graph);
        assert_eq!(
            card.unknown_speakers,
            vec![(NodeId::new(1), "Moderator".to_string())]
        );
        assert_eq!(card.verdict, Verdict::Winner("Pro".to_string()));
    }

    #[test]
    fn deltas_from_unrecognized_speakers_still_count_toward_targets() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "c", 1.0, 1));
        graph.add_node(UtteranceNode::support(
            NodeId::new(2), "Audience", "s", NodeId::new(1), 0.4, 2,
        ));

        // Only claim authorship is side-checked; the delta itself applies.
        let card = scorer().score(&graph);
        assert!((card.total("Pro").unwrap() - 1.4).abs() < 1e-9);
        assert!(card.unknown_speakers.is_empty());
    }

    #[test]
    fn scoring_is_pure() {
        let mut graph = DebateGraph::new();
        graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "c", 1.2, 1));
        graph.add_node(UtteranceNode::attack(
            NodeId::new(2), "Con", "a", NodeId::new(1), 0.2, 2,
        ));

        let s = scorer();
        assert_eq!(s.score(&graph), s.score(&graph));
    }
}
