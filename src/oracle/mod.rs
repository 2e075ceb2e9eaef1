//! Extraction oracle client
//!
//! Defines the client trait and update types for the text-extraction
//! service that turns a round transcript plus a graph snapshot into
//! proposed graph updates. Two implementations:
//! - `HttpOracle`: chat-completions API over HTTP (production)
//! - `MockOracle`: scripted responses (testing)
//!
//! The oracle is unreliable by contract: its raw output may wrap the update
//! list in prose, and individual fields may be missing or mistyped.
//! `parse_updates` recovers what it can; an empty update list is a valid
//! success outcome, not an error.

mod http;

pub use http::HttpOracle;

use crate::graph::NodeId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

/// Errors from oracle operations.
///
/// `Request` and `Timeout` cover network/timeout/non-2xx failures; `Parse`
/// covers output that cannot be recovered as an update list. The round
/// processor treats all three identically: the round contributes no nodes
/// and the debate continues.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle request timed out")]
    Timeout,
    #[error("unparseable oracle output: {0}")]
    Parse(String),
}

/// Client trait for the extraction oracle.
///
/// Abstracts over transport so the round processor does not depend on how
/// the service is reached.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Analyze one round. `context_snapshot` is the JSON record list the
    /// round processor chose to expose. Returns the oracle's raw text.
    async fn extract(
        &self,
        transcript: &str,
        context_snapshot: &str,
    ) -> Result<String, OracleError>;

    /// Produce a prose judgement over the finished debate.
    async fn commentary(&self, brief: &CommentaryBrief) -> Result<String, OracleError>;
}

/// Input for the commentary call: final scores, verdict, and the cleaned
/// graph, serialized by the caller.
#[derive(Debug, Clone)]
pub struct CommentaryBrief {
    pub topic: String,
    /// (side label, total) pairs in configuration order.
    pub totals: Vec<(String, f64)>,
    pub verdict: String,
    pub graph_json: String,
}

/// Action tag of a proposed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    Claim,
    Support,
    Attack,
    /// Anything else the oracle invented; discarded by the round processor.
    Other(String),
}

impl UpdateAction {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "claim" | "new_argument" => UpdateAction::Claim,
            "support" => UpdateAction::Support,
            "attack" => UpdateAction::Attack,
            other => UpdateAction::Other(other.to_string()),
        }
    }
}

/// One proposed update, as recovered from oracle output.
///
/// Numeric fields stay optional here; the round processor applies defaults
/// (importance 1.0, delta 0.0) and sign correction when it materializes
/// nodes. `target_id` is kept as raw text because it may name a node that
/// does not exist.
#[derive(Debug, Clone)]
pub struct ProposedUpdate {
    pub speaker: String,
    pub action: UpdateAction,
    pub text: String,
    pub importance: Option<f64>,
    pub target_id: Option<String>,
    pub delta: Option<f64>,
}

impl ProposedUpdate {
    /// Parse the raw target reference, if it looks like a node id at all.
    pub fn parsed_target(&self) -> Option<NodeId> {
        self.target_id.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Locate the JSON payload inside possibly prose-wrapped oracle output.
///
/// Takes the outermost `[...]` span when one exists; otherwise wraps the
/// outermost `{...}` span into a one-element list. Returns `None` when
/// neither bracket pair is present.
fn recover_payload(raw: &str) -> Option<String> {
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            return Some(raw[start..=end].to_string());
        }
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            return Some(format!("[{}]", &raw[start..=end]));
        }
    }
    None
}

/// Coerce a JSON value into a float. Accepts numbers and numeric strings.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a JSON value into a reference string. Accepts strings and bare
/// numbers (some models echo ids without the `node_` prefix).
fn coerce_reference(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Recover an ordered update list from raw oracle output.
///
/// Non-object list elements are dropped with a warning; a payload that is
/// not recoverable as a list at all is a `Parse` error.
pub fn parse_updates(raw: &str) -> Result<Vec<ProposedUpdate>, OracleError> {
    let payload = recover_payload(raw)
        .ok_or_else(|| OracleError::Parse(truncate_for_error(raw)))?;

    let values: Vec<Value> = serde_json::from_str(&payload)
        .map_err(|e| OracleError::Parse(format!("{e}: {}", truncate_for_error(raw))))?;

    let mut updates = Vec::with_capacity(values.len());
    for value in values {
        let Some(obj) = value.as_object() else {
            warn!("discarding non-object update element: {value}");
            continue;
        };
        let action = obj
            .get("action")
            .and_then(Value::as_str)
            .map(UpdateAction::from_tag)
            .unwrap_or_else(|| UpdateAction::Other("none".to_string()));
        updates.push(ProposedUpdate {
            speaker: obj
                .get("speaker")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            action,
            text: obj
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            importance: coerce_f64(obj.get("importance")),
            target_id: coerce_reference(obj.get("target_id")),
            delta: coerce_f64(obj.get("delta")),
        });
    }
    Ok(updates)
}

fn truncate_for_error(raw: &str) -> String {
    const LIMIT: usize = 200;
    if raw.len() <= LIMIT {
        raw.to_string()
    } else {
        let mut end = LIMIT;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    }
}

/// Mock oracle for testing — replays a script of extraction responses in
/// call order, then reports empty updates once the script is exhausted.
pub struct MockOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    commentary: Option<String>,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            commentary: None,
        }
    }

    /// Enqueue a raw extraction response for the next call.
    pub fn with_extraction(self, raw: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(raw.into()));
        self
    }

    /// Enqueue a failure for the next call.
    pub fn with_failure(self, error: OracleError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Set the commentary response.
    pub fn with_commentary(mut self, text: impl Into<String>) -> Self {
        self.commentary = Some(text.into());
        self
    }
}

#[async_trait]
impl ExtractionOracle for MockOracle {
    async fn extract(
        &self,
        _transcript: &str,
        _context_snapshot: &str,
    ) -> Result<String, OracleError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("[]".to_string()))
    }

    async fn commentary(&self, _brief: &CommentaryBrief) -> Result<String, OracleError> {
        match &self.commentary {
            Some(text) => Ok(text.clone()),
            None => Err(OracleError::Request(
                "mock oracle has no commentary configured".to_string(),
            )),
        }
    }
}
