//! Node representation in the argument graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound for a claim's base importance.
pub const MAX_BASE_IMPORTANCE: f64 = 1.5;

/// Unique identifier for a node
///
/// Ids are allocated monotonically by the round processor and never reused.
/// On the wire (oracle snapshots, the snapshot file) they appear as
/// `node_<n>` strings; the numeric part orders nodes by creation time, which
/// the deduplicator relies on to pick the retained node of a duplicate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a NodeId from its numeric index.
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// The numeric part of the id.
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Error parsing a node id from its wire form.
#[derive(Debug, thiserror::Error)]
#[error("invalid node id: {0:?}")]
pub struct ParseNodeIdError(String);

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    /// Accepts `node_<n>` and, for tolerance toward oracle output, any
    /// trailing `_`-separated integer segment or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tail = s.rsplit('_').next().unwrap_or(s);
        tail.parse::<u64>()
            .map(Self)
            .map_err(|_| ParseNodeIdError(s.to_string()))
    }
}

impl Serialize for NodeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The three ways an utterance can act on the graph.
///
/// `new_argument` is accepted on input as a legacy spelling of `claim`, so
/// snapshots written by earlier tooling load unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A newly introduced argument, carrying a base importance.
    #[serde(alias = "new_argument")]
    Claim,
    /// Strengthens a target claim (non-negative delta).
    Support,
    /// Weakens a target claim (non-positive delta).
    Attack,
}

impl NodeKind {
    pub fn is_claim(&self) -> bool {
        matches!(self, NodeKind::Claim)
    }
}

/// One atomic contribution to the debate.
///
/// Immutable after creation, except for `target_id` rewrites performed by
/// the deduplicator when the referenced node is merged away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtteranceNode {
    pub id: NodeId,
    /// Side label. Not validated here; an unrecognized label is surfaced at
    /// scoring time rather than dropped.
    pub speaker: String,
    /// Short summary of the contribution, not a verbatim excerpt.
    pub text: String,
    #[serde(rename = "node_type")]
    pub kind: NodeKind,
    /// Initial weight of a claim, in [0, 1.5]. Zero for support/attack.
    #[serde(default)]
    pub base_importance: f64,
    /// The claim this node acts on. Always present for support/attack once
    /// the round processor has resolved it; always absent for claims.
    #[serde(default)]
    pub target_id: Option<NodeId>,
    /// Importance adjustment applied to the target. Non-negative for
    /// support, non-positive for attack. Zero for claims.
    #[serde(default)]
    pub delta: f64,
    /// Round in which the node was produced. Used for context windowing
    /// only, never for scoring.
    #[serde(default)]
    pub round_number: u32,
}

impl UtteranceNode {
    /// Create a claim node. Importance is clamped into [0, 1.5].
    pub fn claim(
        id: NodeId,
        speaker: impl Into<String>,
        text: impl Into<String>,
        importance: f64,
        round_number: u32,
    ) -> Self {
        Self {
            id,
            speaker: speaker.into(),
            text: text.into(),
            kind: NodeKind::Claim,
            base_importance: importance.clamp(0.0, MAX_BASE_IMPORTANCE),
            target_id: None,
            delta: 0.0,
            round_number,
        }
    }

    /// Create a support node. A wrong-signed delta is flipped, not rejected.
    pub fn support(
        id: NodeId,
        speaker: impl Into<String>,
        text: impl Into<String>,
        target_id: NodeId,
        delta: f64,
        round_number: u32,
    ) -> Self {
        Self {
            id,
            speaker: speaker.into(),
            text: text.into(),
            kind: NodeKind::Support,
            base_importance: 0.0,
            target_id: Some(target_id),
            delta: delta.abs(),
            round_number,
        }
    }

    /// Create an attack node. A wrong-signed delta is flipped, not rejected.
    pub fn attack(
        id: NodeId,
        speaker: impl Into<String>,
        text: impl Into<String>,
        target_id: NodeId,
        delta: f64,
        round_number: u32,
    ) -> Self {
        Self {
            id,
            speaker: speaker.into(),
            text: text.into(),
            kind: NodeKind::Attack,
            base_importance: 0.0,
            target_id: Some(target_id),
            delta: -delta.abs(),
            round_number,
        }
    }
}
