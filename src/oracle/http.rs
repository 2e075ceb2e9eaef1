//! HTTP extraction oracle
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. Selects the
//! long-input extraction model when the combined prompt exceeds the
//! configured character budget, retries transient failures with exponential
//! backoff, and maps timeouts into the oracle error taxonomy.

use super::{CommentaryBrief, ExtractionOracle, OracleError};
use crate::config::JudgeConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for oracle requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Slack added to the measured prompt length when choosing between the
/// short- and long-input extraction models, covering the fixed prompt text.
const PROMPT_OVERHEAD_CHARS: usize = 800;

/// Chat-completions client for the extraction oracle.
pub struct HttpOracle {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    topic: String,
    extract_short: String,
    extract_long: String,
    evaluation: String,
    long_input_threshold: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpOracle {
    /// Create an oracle client against `base_url` (e.g.
    /// `https://open.bigmodel.cn/api/paas/v4`). Model names and the
    /// long-input threshold come from the config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        config: &JudgeConfig,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("default reqwest client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            topic: config.topic.clone(),
            extract_short: config.models.extract_short.clone(),
            extract_long: config.models.extract_long.clone(),
            evaluation: config.models.evaluation.clone(),
            long_input_threshold: config.long_input_threshold,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the maximum number of attempts per request.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Pick the extraction model for this round's prompt size.
    fn extraction_model(&self, transcript: &str, snapshot: &str) -> &str {
        if transcript.len() + snapshot.len() + PROMPT_OVERHEAD_CHARS > self.long_input_threshold {
            &self.extract_long
        } else {
            &self.extract_short
        }
    }

    fn extraction_system_prompt(&self) -> String {
        format!(
            "You are a debate analyst maintaining an argument graph. The current graph is a \
             JSON array of nodes with fields: id (unique identifier), speaker (side label, \
             e.g. 'Pro' or 'Con'), text (summarized content), node_type ('claim', 'support' \
             or 'attack'), base_importance (initial weight of a claim, 0 otherwise), \
             target_id (the claim a support/attack acts on, null otherwise), delta \
             (importance adjustment, positive for support, negative for attack), and \
             round_number. An empty graph means the debate has just begun.\n\
             \n\
             Analyze the round transcript and emit one instruction per update as a JSON \
             array. Each instruction is an object with:\n\
             - speaker: the side making the contribution\n\
             - action: 'claim', 'support' or 'attack'\n\
             - for 'claim': text and importance in [0, 1.5]\n\
             - for 'support'/'attack': target_id, text, and delta in [0, 0.5] or [-0.5, 0]\n\
             \n\
             Rules: output strictly the JSON array with no surrounding text; output [] when \
             there is nothing to add; summarize contributions into concise text rather than \
             quoting; prefer support/attack over claim when a contribution can be read as \
             either; never add a node whose text repeats or paraphrases an existing node; \
             ignore the moderator. Score boldly across the full range.\n\
             \n\
             The motion under debate: {topic}",
            topic = self.topic
        )
    }

    fn extraction_user_prompt(transcript: &str, snapshot: &str) -> String {
        format!(
            "Analyze this round and extract the claims, supports and attacks. Each line is \
             'Speaker: text'.\n{transcript}\n\nThe current argument graph:\n{snapshot}\n"
        )
    }

    fn commentary_prompt(brief: &CommentaryBrief) -> String {
        let totals = brief
            .totals
            .iter()
            .map(|(side, total)| format!("{side} total: {total:.2}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are a senior debate adjudicator. Using the data below, write the judge's \
             summary of this debate: walk through the exchanges, name which arguments stood \
             and which were dismantled, and justify the result so the audience is convinced. \
             Do not mention the data structures; speak as a judge who watched the rounds.\n\
             \n\
             Motion: {topic}\n{totals}\nResult: {verdict}\n\
             Argument graph (JSON array of nodes):\n{graph}\n",
            topic = brief.topic,
            totals = totals,
            verdict = brief.verdict,
            graph = brief.graph_json,
        )
    }

    /// POST a chat request, with retry on transport failures and 5xx.
    async fn chat(&self, request: &ChatRequest) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = OracleError::Request("no attempts made".to_string());

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }
            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await;
            match sent {
                Ok(response) if response.status().is_success() => {
                    let body: ChatResponse = response.json().await.map_err(|e| {
                        OracleError::Request(format!("malformed completion body: {e}"))
                    })?;
                    return body
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| {
                            OracleError::Request("completion had no choices".to_string())
                        });
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    last_error = OracleError::Request(format!("HTTP {status}: {text}"));
                    if status.is_client_error() {
                        // 4xx will not improve on retry.
                        return Err(last_error);
                    }
                    warn!(attempt, %status, "oracle request failed, retrying");
                }
                Err(e) if e.is_timeout() => {
                    last_error = OracleError::Timeout;
                    warn!(attempt, "oracle request timed out, retrying");
                }
                Err(e) => {
                    last_error = OracleError::Request(e.to_string());
                    warn!(attempt, error = %e, "oracle request failed, retrying");
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl ExtractionOracle for HttpOracle {
    async fn extract(
        &self,
        transcript: &str,
        context_snapshot: &str,
    ) -> Result<String, OracleError> {
        let model = self.extraction_model(transcript, context_snapshot);
        debug!(model, transcript_len = transcript.len(), "extraction request");
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.extraction_system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::extraction_user_prompt(transcript, context_snapshot),
                },
            ],
            temperature: 0.5,
            max_tokens: 4025,
        };
        self.chat(&request).await
    }

    async fn commentary(&self, brief: &CommentaryBrief) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: self.evaluation.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::commentary_prompt(brief),
            }],
            temperature: 0.7,
            max_tokens: 4025,
        };
        self.chat(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> HttpOracle {
        let config = JudgeConfig::for_topic("testing motions");
        HttpOracle::new("https://example.invalid/v4/", "key", &config)
    }

    #[test]
    fn base_url_is_normalized() {
        let oracle = oracle();
        assert_eq!(oracle.base_url, "https://example.invalid/v4");
    }

    #[test]
    fn model_selection_honors_length_budget() {
        let oracle = oracle();
        let short = "a".repeat(100);
        let long = "a".repeat(20_000);
        assert_eq!(oracle.extraction_model(&short, "[]"), "glm-zero-preview");
        assert_eq!(oracle.extraction_model(&long, "[]"), "glm-4-air");
    }

    #[test]
    fn prompts_mention_topic_and_transcript() {
        let oracle = oracle();
        assert!(oracle.extraction_system_prompt().contains("testing motions"));
        let user = HttpOracle::extraction_user_prompt("Pro: hello", "[]");
        assert!(user.contains("Pro: hello"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_request_error() {
        let config = JudgeConfig::for_topic("t");
        let oracle =
            HttpOracle::new("http://127.0.0.1:9", "key", &config).with_max_retries(1);
        let result = oracle.extract("Pro: hi", "[]").await;
        assert!(matches!(result, Err(OracleError::Request(_) | OracleError::Timeout)));
    }
}
