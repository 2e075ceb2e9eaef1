//! HTTP embedding provider
//!
//! Client for an OpenAI-compatible embeddings endpoint. One request per
//! batch; the response is re-ordered by the provider's index field so the
//! returned vectors always line up with the input texts.

use super::{Embedder, EmbeddingError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default timeout for embedding requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Embeddings-endpoint client.
pub struct HttpEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("default reqwest client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the maximum number of attempts per request.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn request_batch(&self, texts: &[String]) -> Result<EmbeddingResponse, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let mut last_error = EmbeddingError::Request("no attempts made".to_string());

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt - 1))).await;
            }
            match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|e| {
                        EmbeddingError::Request(format!("malformed embedding body: {e}"))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    last_error = EmbeddingError::Request(format!("HTTP {status}: {text}"));
                    if status.is_client_error() {
                        return Err(last_error);
                    }
                    warn!(attempt, %status, "embedding request failed, retrying");
                }
                Err(e) if e.is_timeout() => {
                    last_error = EmbeddingError::Timeout;
                    warn!(attempt, "embedding request timed out, retrying");
                }
                Err(e) => {
                    last_error = EmbeddingError::Request(e.to_string());
                    warn!(attempt, error = %e, "embedding request failed, retrying");
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut response = self.request_batch(texts).await?;
        if response.data.len() != texts.len() {
            return Err(EmbeddingError::Mismatch {
                sent: texts.len(),
                got: response.data.len(),
            });
        }
        // Providers usually return vectors in order; sort by index so a
        // reordered response cannot silently misalign texts and vectors.
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
