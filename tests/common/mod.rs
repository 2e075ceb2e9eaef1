//! Common test utilities for pipeline integration tests
//!
//! Shared helpers for building transcripts and deterministic embedding
//! vectors.

use rostrum::Utterance;

/// Build one utterance.
pub fn utterance(speaker: &str, text: &str) -> Utterance {
    Utterance {
        speaker: speaker.to_string(),
        text: text.to_string(),
    }
}

/// Build one round from (speaker, text) pairs.
pub fn round(lines: &[(&str, &str)]) -> Vec<Utterance> {
    lines.iter().map(|(s, t)| utterance(s, t)).collect()
}

/// An 8-dimension vector from leading components, zero-padded.
pub fn unit8(components: &[f32]) -> Vec<f32> {
    let mut v = components.to_vec();
    v.resize(8, 0.0);
    v
}
