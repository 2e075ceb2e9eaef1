//! DebateJudge: the end-to-end evaluation pipeline
//!
//! Drives the three phases in order: sequential round processing, semantic
//! deduplication, scoring. No failure in a single round or in deduplication
//! is fatal; the pipeline always ends with a scorecard over the best graph
//! it could produce.

use crate::config::JudgeConfig;
use crate::dedup::{DedupReport, Deduplicator};
use crate::embedding::Embedder;
use crate::graph::DebateGraph;
use crate::oracle::{CommentaryBrief, ExtractionOracle};
use crate::rounds::{RoundProcessor, RoundSummary, Utterance};
use crate::score::{Scorecard, Scorer};
use std::sync::Arc;
use tracing::{info, warn};

/// Commentary used when the evaluation model is unreachable.
const FALLBACK_COMMENTARY: &str =
    "A hard-fought debate; both sides argued with real strength.";

/// Everything a run produces. The cleaned graph plus the scorecard is the
/// complete hand-off to rendering collaborators.
#[derive(Debug)]
pub struct JudgementOutcome {
    /// The graph as built, before semantic cleanup.
    pub construction_graph: DebateGraph,
    /// The cleaned graph scoring ran on. Identical to `construction_graph`
    /// when deduplication had to be skipped.
    pub graph: DebateGraph,
    /// Per-round summaries, in round order.
    pub rounds: Vec<RoundSummary>,
    /// `None` when the embedding provider failed and cleanup was skipped.
    pub dedup: Option<DedupReport>,
    pub scorecard: Scorecard,
}

/// Runs a whole debate through construction, cleanup, and scoring.
pub struct DebateJudge {
    config: JudgeConfig,
    oracle: Arc<dyn ExtractionOracle>,
    embedder: Arc<dyn Embedder>,
}

impl DebateJudge {
    pub fn new(
        config: JudgeConfig,
        oracle: Arc<dyn ExtractionOracle>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            oracle,
            embedder,
        }
    }

    /// Evaluate a debate. `rounds` is the ordered per-round utterance lists;
    /// round numbers are 1-based positions in the slice.
    pub async fn run(&self, rounds: &[Vec<Utterance>]) -> JudgementOutcome {
        let mut processor = RoundProcessor::new(&self.config, self.oracle.clone());
        let mut summaries = Vec::with_capacity(rounds.len());
        for (index, utterances) in rounds.iter().enumerate() {
            let round_number = index as u32 + 1;
            info!(round = round_number, utterances = utterances.len(), "processing round");
            summaries.push(processor.process_round(round_number, utterances).await);
        }
        let construction_graph = processor.into_graph();
        info!(nodes = construction_graph.node_count(), "construction complete");

        let mut graph = construction_graph.clone();
        let dedup = match Deduplicator::new(&self.config, self.embedder.clone())
            .dedupe(&mut graph)
            .await
        {
            Ok(report) => {
                info!(removed = report.removed, "semantic deduplication complete");
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, "deduplication aborted; scoring the unclean graph");
                None
            }
        };

        let scorecard = Scorer::new(&self.config).score(&graph);
        for (side, total) in &scorecard.totals {
            info!(side = %side, total = *total, "side total");
        }
        info!(verdict = %scorecard.verdict, "verdict");

        JudgementOutcome {
            construction_graph,
            graph,
            rounds: summaries,
            dedup,
            scorecard,
        }
    }

    /// Ask the evaluation model for a judge's summary of the outcome. Falls
    /// back to a fixed line when the oracle fails; commentary is decoration,
    /// never a reason to fail a run.
    pub async fn commentary(&self, outcome: &JudgementOutcome) -> String {
        let graph_json = serde_json::to_string_pretty(&outcome.graph.snapshot())
            .expect("node records serialize infallibly");
        let brief = CommentaryBrief {
            topic: self.config.topic.clone(),
            totals: outcome.scorecard.totals.clone(),
            verdict: outcome.scorecard.verdict.to_string(),
            graph_json,
        };
        match self.oracle.commentary(&brief).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "commentary generation failed; using fallback");
                FALLBACK_COMMENTARY.to_string()
            }
        }
    }
}
