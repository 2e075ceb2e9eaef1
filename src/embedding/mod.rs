//! Embedding provider client
//!
//! Trait-based embedding backend so production code can call an HTTP
//! embeddings API while tests use deterministic mock embedders. Vectors are
//! used only by the deduplicator, for pairwise cosine similarity over node
//! texts.

mod http;

pub use http::HttpEmbedder;

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Errors from embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding request timed out")]
    Timeout,
    #[error("embedding count mismatch: sent {sent} texts, got {got} vectors")]
    Mismatch { sent: usize, got: usize },
}

/// Trait for embedding text into vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one batch of texts, returning one vector per text in input
    /// order. Callers are responsible for keeping batches within provider
    /// limits; see [`embed_all`].
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embed an arbitrary number of texts in `batch_size` chunks, merging the
/// results back in input order.
pub async fn embed_all(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let mut batch = embedder.embed_batch(chunk).await?;
        if batch.len() != chunk.len() {
            return Err(EmbeddingError::Mismatch {
                sent: chunk.len(),
                got: batch.len(),
            });
        }
        vectors.append(&mut batch);
    }
    Ok(vectors)
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Deterministic mock embedder for tests.
///
/// Texts registered via `with_vector` get exactly that vector; any other
/// text gets a hash-derived pseudo-vector, so unrelated texts land well
/// below any realistic similarity threshold while registered pairs can be
/// placed precisely.
pub struct MockEmbedder {
    presets: HashMap<String, Vec<f32>>,
    dimensions: usize,
    fail: bool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            presets: HashMap::new(),
            dimensions: 32,
            fail: false,
        }
    }

    /// Register an exact vector for a text.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.presets.insert(text.into(), vector);
        self
    }

    /// Make every call fail, for exercising the degradation path.
    pub fn failing() -> Self {
        Self {
            presets: HashMap::new(),
            dimensions: 32,
            fail: true,
        }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                (text, i).hash(&mut hasher);
                ((hasher.finish() % 2001) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Request(
                "mock embedder configured to fail".to_string(),
            ));
        }
        Ok(texts
            .iter()
            .map(|t| {
                self.presets
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| self.hash_vector(t))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_guards_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn mock_is_deterministic_and_order_preserving() {
        let embedder = MockEmbedder::new().with_vector("a", vec![1.0; 32]);
        let texts = vec!["a".to_string(), "b".to_string()];

        let first = embedder.embed_batch(&texts).await.unwrap();
        let second = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], vec![1.0; 32]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn unrelated_texts_stay_dissimilar() {
        let embedder = MockEmbedder::new();
        let texts = vec!["economic growth".to_string(), "personal liberty".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert!(cosine_similarity(&vectors[0], &vectors[1]) < 0.85);
    }

    #[tokio::test]
    async fn embed_all_merges_batches_in_order() {
        let embedder = MockEmbedder::new();
        let texts: Vec<String> = (0..10).map(|i| format!("text {i}")).collect();

        let chunked = embed_all(&embedder, &texts, 3).await.unwrap();
        let whole = embed_all(&embedder, &texts, 100).await.unwrap();

        assert_eq!(chunked, whole);
        assert_eq!(chunked.len(), 10);
    }

    #[tokio::test]
    async fn failing_embedder_propagates_error() {
        let embedder = MockEmbedder::failing();
        let result = embed_all(&embedder, &["x".to_string()], 4).await;
        assert!(matches!(result, Err(EmbeddingError::Request(_))));
    }
}
