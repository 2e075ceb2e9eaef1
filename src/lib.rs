//! Rostrum: Argument-Graph Debate Judging Engine
//!
//! Incrementally reconstructs the argumentative structure of a debate from
//! sequential round transcripts and produces a numeric score per side.
//!
//! # Core Concepts
//!
//! - **Claims**: nodes introducing a new argument, carrying a base importance
//! - **Supports/Attacks**: nodes adjusting a target claim's effective importance
//! - **Context snapshots**: the bounded subset of the graph shown to the
//!   extraction oracle for each round
//!
//! # Pipeline
//!
//! Rounds are processed strictly in order against an unreliable extraction
//! oracle; the finished graph is cleaned by embedding-based deduplication,
//! then collapsed into one total per side and a verdict.
//!
//! # Example
//!
//! ```
//! use rostrum::{DebateGraph, NodeId, UtteranceNode};
//!
//! let mut graph = DebateGraph::new();
//! graph.add_node(UtteranceNode::claim(NodeId::new(1), "Pro", "freedom needs options", 1.0, 1));
//! assert_eq!(graph.node_count(), 1);
//! ```

pub mod config;
pub mod dedup;
pub mod embedding;
mod graph;
pub mod judge;
pub mod oracle;
pub mod rounds;
pub mod score;
pub mod snapshot;

pub use config::{JudgeConfig, ModelConfig};
pub use dedup::{DedupReport, Deduplicator};
pub use embedding::{cosine_similarity, Embedder, EmbeddingError, HttpEmbedder, MockEmbedder};
pub use graph::{
    DebateGraph, NodeId, NodeKind, ParseNodeIdError, UtteranceNode, MAX_BASE_IMPORTANCE,
};
pub use judge::{DebateJudge, JudgementOutcome};
pub use oracle::{ExtractionOracle, HttpOracle, MockOracle, OracleError};
pub use rounds::{RoundProcessor, RoundSummary, Utterance};
pub use score::{claim_aggregate, Scorecard, Scorer, Verdict};
pub use snapshot::{read_snapshot, write_snapshot, SnapshotError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
