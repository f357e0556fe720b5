//! Configuration types for crag-model.
//!
//! These are the canonical judge configuration types. `crag-core` embeds
//! [`JudgeConfig`] in its own configuration file rather than duplicating it.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};

// ============================================================================
// JudgeProviderKind
// ============================================================================

/// Judge provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JudgeProviderKind {
    /// Local term-overlap heuristic. Needs no network.
    #[default]
    Lexical,
    /// Remote LLM over an OpenAI-compatible chat-completions API.
    Llm,
}

impl std::fmt::Display for JudgeProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

impl std::str::FromStr for JudgeProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" | "heuristic" | "local" => Ok(Self::Lexical),
            "llm" | "openai" => Ok(Self::Llm),
            _ => Err(format!(
                "Unknown judge provider: '{}'. Use 'lexical' or 'llm'.",
                s
            )),
        }
    }
}

// ============================================================================
// LexicalJudgeConfig
// ============================================================================

/// Settings for the term-overlap judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalJudgeConfig {
    /// Minimum fraction of query terms a unit must contain to count as useful.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: f32,

    /// Apply English stemming before matching terms.
    #[serde(default = "default_stemming")]
    pub stemming: bool,
}

fn default_min_overlap() -> f32 {
    0.3
}

fn default_stemming() -> bool {
    true
}

impl Default for LexicalJudgeConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
            stemming: default_stemming(),
        }
    }
}

// ============================================================================
// LlmJudgeConfig
// ============================================================================

/// Settings for the LLM judge.
///
/// The judge owns its retry policy: `max_retries` extra attempts are made for
/// transient failures (transport errors, HTTP 429 and 5xx).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmJudgeConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name sent in the request body.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable that holds the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Extra attempts after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_llm_endpoint() -> String {
    DEFAULT_LLM_ENDPOINT.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

impl Default for LlmJudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            temperature: 0.0,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// ============================================================================
// JudgeConfig
// ============================================================================

/// Judge selection plus per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Which judge to build.
    #[serde(default)]
    pub provider: JudgeProviderKind,

    /// Lexical judge settings.
    #[serde(default)]
    pub lexical: LexicalJudgeConfig,

    /// LLM judge settings.
    #[serde(default)]
    pub llm: LlmJudgeConfig,
}
