//! Judge configuration
//!
//! Every tunable of the engine lives here and is passed explicitly to the
//! component that needs it, so the core stays testable without environment
//! setup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default similarity threshold for semantic deduplication.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Default sliding-window size for context snapshots.
pub const DEFAULT_WINDOW: u32 = 3;

/// Default batch size for embedding requests.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;

/// Character budget above which the long-input extraction model is used.
pub const DEFAULT_LONG_INPUT_THRESHOLD: usize = 16_000;

/// Configuration for a single debate evaluation run.
///
/// Constructed once and shared (by reference or clone) with the round
/// processor, deduplicator, scorer, and the external-service clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// The debate motion, verbatim. Included in extraction prompts.
    pub topic: String,
    /// Recognized side labels. A node authored by any other speaker is a
    /// data-integrity error surfaced at scoring time.
    pub sides: Vec<String>,
    /// Round numbers that are opening statements. These rounds see an empty
    /// context snapshot, and their nodes stay visible in every later window.
    pub opening_rounds: BTreeSet<u32>,
    /// Sliding-window size for context snapshots.
    pub window: u32,
    /// Cosine-similarity threshold above which two nodes are duplicates.
    pub similarity_threshold: f32,
    /// Maximum number of texts per embedding request.
    pub embedding_batch_size: usize,
    /// Models used by the extraction oracle and embedding provider.
    pub models: ModelConfig,
    /// Transcript + snapshot length (chars) above which the long-input
    /// extraction model is selected.
    pub long_input_threshold: usize,
}

/// Model names for the external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Extraction model for rounds that fit the short-input budget.
    pub extract_short: String,
    /// Extraction model for long rounds.
    pub extract_long: String,
    /// Model used for the prose commentary.
    pub evaluation: String,
    /// Embedding model.
    pub embedding: String,
    /// Requested embedding dimension.
    pub embedding_dimensions: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            extract_short: "glm-zero-preview".to_string(),
            extract_long: "glm-4-air".to_string(),
            evaluation: "glm-4-plus".to_string(),
            embedding: "embedding-3".to_string(),
            embedding_dimensions: 2048,
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            sides: vec!["Pro".to_string(), "Con".to_string()],
            opening_rounds: BTreeSet::from([1, 3]),
            window: DEFAULT_WINDOW,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            models: ModelConfig::default(),
            long_input_threshold: DEFAULT_LONG_INPUT_THRESHOLD,
        }
    }
}

impl JudgeConfig {
    /// Create a config for the given motion with default tuning.
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Set the opening rounds.
    pub fn with_opening_rounds(mut self, rounds: impl IntoIterator<Item = u32>) -> Self {
        self.opening_rounds = rounds.into_iter().collect();
        self
    }

    /// Set the sliding-window size.
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// Set the semantic-duplicate threshold.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Check whether a speaker label belongs to a recognized side.
    pub fn is_recognized_side(&self, speaker: &str) -> bool {
        self.sides.iter().any(|s| s == speaker)
    }
}
