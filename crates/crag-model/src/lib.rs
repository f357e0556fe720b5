//! # crag-model
//!
//! Judge layer for CRAG - reference-free relevance scoring of retrieved evidence.
//!
//! This crate is the **single source of truth** for judge implementations.
//! It provides:
//!
//! - **Lexical judge**: local term-overlap heuristic, no network
//! - **LLM judge**: asks a chat-completions model which evidence units are useful
//! - **Context precision**: the rank-weighted metric both judges reduce to
//!
//! ## Design Principles
//!
//! 1. **Production-only**: No mock implementations. Test doubles live in consuming crates.
//! 2. **Black-box contract**: a judge returns one scalar in `[0, 1]` or one error.
//! 3. **Own retry policy**: retries (if any) happen inside the judge, never in callers.
//!
//! ## Features
//!
//! - `llm` (default): remote LLM judge via blocking `reqwest`
//!
//! ## Usage
//!
//! ```ignore
//! use crag_model::{create_judge_model, JudgeConfig};
//!
//! let judge = create_judge_model(&JudgeConfig::default())?;
//! let score = judge.score("what is the claims phone number?", &evidence)?;
//! assert!((0.0..=1.0).contains(&score));
//! ```

pub mod config;
pub mod error;
pub mod lexical;

#[cfg(feature = "llm")]
mod llm;

// Re-export error types
pub use error::{ModelError, ModelResult};

// Re-export config types (canonical source of truth)
pub use config::{JudgeConfig, JudgeProviderKind, LexicalJudgeConfig, LlmJudgeConfig};

pub use lexical::LexicalOverlapJudge;

/// Default chat-completions endpoint for the LLM judge.
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name for the LLM judge.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// Judge Model Trait
// ============================================================================

/// Trait for judge models.
///
/// Estimates how well an ordered list of evidence texts would allow answering
/// a query, without reference to a gold answer.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one judge can serve concurrent
/// resolution cycles.
pub trait JudgeModel: Send + Sync + std::fmt::Debug {
    /// Score an ordered evidence list against a query.
    ///
    /// # Returns
    ///
    /// A scalar in `[0, 1]`; higher means the evidence is more useful.
    fn score(&self, query: &str, evidence: &[String]) -> ModelResult<f32>;

    /// Identifier used in logs and traces (e.g. `lexical`, `llm:gpt-4o-mini`).
    fn judge_id(&self) -> &str;

    /// The provider kind of this judge.
    fn provider(&self) -> JudgeProviderKind;
}

// ============================================================================
// Context Precision
// ============================================================================

/// Rank-weighted precision over per-unit usefulness verdicts.
///
/// For each useful unit at rank `k`, takes precision@k (useful units among the
/// first `k` divided by `k`), then averages over the useful units. Useful units
/// near the top of the list therefore weigh more than useful units at the
/// bottom. Returns `0.0` when no unit is useful or the list is empty.
///
/// # Example
///
/// ```
/// use crag_model::context_precision;
///
/// assert_eq!(context_precision(&[true, true]), 1.0);
/// assert_eq!(context_precision(&[false, true]), 0.5);
/// assert_eq!(context_precision(&[false, false]), 0.0);
/// ```
pub fn context_precision(verdicts: &[bool]) -> f32 {
    let mut useful_so_far = 0usize;
    let mut weighted = 0.0f32;

    for (rank, useful) in verdicts.iter().enumerate() {
        if *useful {
            useful_so_far += 1;
            weighted += useful_so_far as f32 / (rank + 1) as f32;
        }
    }

    if useful_so_far == 0 {
        return 0.0;
    }

    (weighted / useful_so_far as f32).clamp(0.0, 1.0)
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create a judge model from configuration.
///
/// # Features
///
/// - `lexical` is always available.
/// - `llm` requires the `llm` feature (enabled by default).
///
/// # Errors
///
/// Returns `ModelError` if the provider is unavailable or misconfigured
/// (e.g. missing API key).
pub fn create_judge_model(config: &JudgeConfig) -> ModelResult<Box<dyn JudgeModel>> {
    match config.provider {
        JudgeProviderKind::Lexical => {
            let judge = LexicalOverlapJudge::new(config.lexical.clone());
            Ok(Box::new(judge))
        }
        JudgeProviderKind::Llm => create_llm_judge(&config.llm),
    }
}

#[cfg(feature = "llm")]
fn create_llm_judge(config: &LlmJudgeConfig) -> ModelResult<Box<dyn JudgeModel>> {
    let judge = llm::LlmJudge::from_env(config.clone())?;
    Ok(Box::new(judge))
}

#[cfg(not(feature = "llm"))]
fn create_llm_judge(_config: &LlmJudgeConfig) -> ModelResult<Box<dyn JudgeModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "llm".to_string(),
        reason: "LLM judge not compiled in. Enable the 'llm' feature.".to_string(),
    })
}

#[cfg(feature = "llm")]
pub use llm::LlmJudge;
