//! LLM judge over an OpenAI-compatible chat-completions API.
//!
//! The judge asks the model, for every evidence unit, whether the unit is
//! useful for answering the question, then reduces the verdicts with
//! [`crate::context_precision`]. Any endpoint that speaks the
//! chat-completions wire format works (OpenAI, Ollama's `/v1`, vLLM, ...).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{JudgeProviderKind, LlmJudgeConfig};
use crate::error::{ModelError, ModelResult};
use crate::{context_precision, JudgeModel};

/// Base delay between retry attempts; doubled on every retry.
const RETRY_BASE_DELAY_MS: u64 = 250;

const SYSTEM_PROMPT: &str = "You verify whether retrieved context passages are useful for \
answering a question. You never answer the question itself. Reply with JSON only.";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// The JSON object the model is asked to return.
#[derive(Debug, Deserialize)]
struct VerdictReply {
    verdicts: Vec<u8>,
}

// ============================================================================
// LlmJudge
// ============================================================================

/// Judge backed by a chat-completions model.
pub struct LlmJudge {
    config: LlmJudgeConfig,
    judge_id: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for LlmJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmJudge")
            .field("judge_id", &self.judge_id)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl LlmJudge {
    /// Create a judge with an explicit API key.
    pub fn new(config: LlmJudgeConfig, api_key: impl Into<String>) -> ModelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ModelError::request(&config.endpoint, e.to_string()))?;

        Ok(Self {
            judge_id: format!("llm:{}", config.model),
            api_key: api_key.into(),
            config,
            client,
        })
    }

    /// Create a judge reading the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingApiKey`] if the variable is unset or empty.
    pub fn from_env(config: LlmJudgeConfig) -> ModelResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })?;
        Self::new(config, api_key)
    }

    /// One request/response round trip, no retries.
    fn request_verdicts(&self, query: &str, evidence: &[String]) -> ModelResult<Vec<bool>> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(query, evidence),
                },
            ],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ModelError::request(&self.config.endpoint, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::Status {
                endpoint: self.config.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|e| ModelError::invalid_response(&self.judge_id, e.to_string()))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ModelError::invalid_response(&self.judge_id, "no choices returned"))?;

        parse_verdicts(&self.judge_id, &content, evidence.len())
    }
}

impl JudgeModel for LlmJudge {
    fn score(&self, query: &str, evidence: &[String]) -> ModelResult<f32> {
        if evidence.is_empty() {
            return Err(ModelError::invalid_input("no evidence to judge"));
        }

        let mut attempt = 0u32;
        loop {
            match self.request_verdicts(query, evidence) {
                Ok(verdicts) => {
                    let score = context_precision(&verdicts);
                    debug!(
                        "{}: verdicts {:?} -> score {:.3}",
                        self.judge_id, verdicts, score
                    );
                    return Ok(score);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = RETRY_BASE_DELAY_MS << (attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        self.judge_id,
                        attempt,
                        self.config.max_retries + 1,
                        delay,
                        e
                    );
                    std::thread::sleep(Duration::from_millis(delay));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn judge_id(&self) -> &str {
        &self.judge_id
    }

    fn provider(&self) -> JudgeProviderKind {
        JudgeProviderKind::Llm
    }
}

// ============================================================================
// Prompt + parsing
// ============================================================================

fn build_prompt(query: &str, evidence: &[String]) -> String {
    let mut prompt = format!("Question:\n{}\n\nContext passages:\n", query);
    for (i, text) in evidence.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, text));
    }
    prompt.push_str(&format!(
        "\nFor each of the {} passages, in order, output 1 if it is useful for answering \
         the question and 0 otherwise.\nRespond exactly as {{\"verdicts\": [..]}}.",
        evidence.len()
    ));
    prompt
}

/// Extract the verdict list from a model reply.
///
/// Tolerates prose or code fences around the JSON object; the verdict count
/// must match the evidence count.
fn parse_verdicts(judge_id: &str, content: &str, expected: usize) -> ModelResult<Vec<bool>> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &content[s..=e],
        _ => {
            return Err(ModelError::invalid_response(
                judge_id,
                "no JSON object in reply",
            ))
        }
    };

    let reply: VerdictReply = serde_json::from_str(json)?;
    if reply.verdicts.len() != expected {
        return Err(ModelError::invalid_response(
            judge_id,
            format!(
                "expected {} verdicts, got {}",
                expected,
                reply.verdicts.len()
            ),
        ));
    }

    Ok(reply.verdicts.into_iter().map(|v| v > 0).collect())
}
