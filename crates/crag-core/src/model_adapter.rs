//! Adapter layer for crag-model judges.
//!
//! This module bridges crag-model implementations with crag-core's domain
//! traits. It provides:
//!
//! - Error conversion from `ModelError` to `CragError`
//! - [`JudgeCapability`], which implements [`ScoringCapability`] on top of a
//!   `crag_model::JudgeModel`
//! - A factory that builds the configured judge
//!
//! ## Architecture
//!
//! ```text
//! crag-core controller / scorer
//!        ↓
//!   model_adapter (this module)
//!        ↓
//!     crag-model judges (lexical, LLM)
//! ```

use std::sync::Arc;

use crag_model::{create_judge_model, JudgeModel, ModelError};

use crate::config::JudgeSettings;
use crate::errors::CragError;
use crate::scorer::ScoringCapability;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a crag-model error to a crag-core error.
///
/// Setup failures become [`CragError::ProviderUnavailable`]; failures while
/// scoring become [`CragError::Scoring`].
pub fn from_model_error(err: ModelError) -> CragError {
    match err {
        ModelError::ProviderNotAvailable { provider, reason } => {
            CragError::ProviderUnavailable { provider, reason }
        }

        ModelError::MissingApiKey { env_var } => CragError::ProviderUnavailable {
            provider: "llm".to_string(),
            reason: format!("environment variable `{}` is not set", env_var),
        },

        ModelError::InvalidInput { message } => CragError::scoring("judge", message),

        ModelError::Request { endpoint, message } => {
            CragError::scoring(endpoint, format!("request failed: {}", message))
        }

        ModelError::Status {
            endpoint,
            status,
            body,
        } => CragError::scoring(endpoint, format!("HTTP {}: {}", status, body)),

        ModelError::InvalidResponse { judge_id, message } => {
            CragError::scoring(judge_id, message)
        }

        ModelError::Json(json_err) => CragError::scoring("judge", json_err.to_string()),
    }
}

/// Extension trait to convert crag-model Result to Result<T, CragError>.
pub trait IntoCragResult<T> {
    /// Convert a crag-model result to a CragError result.
    fn into_crag_result(self) -> Result<T, CragError>;
}

impl<T> IntoCragResult<T> for Result<T, ModelError> {
    fn into_crag_result(self) -> Result<T, CragError> {
        self.map_err(from_model_error)
    }
}

// ============================================================================
// JudgeCapability
// ============================================================================

/// A crag-model judge exposed as a [`ScoringCapability`].
#[derive(Debug)]
pub struct JudgeCapability {
    model: Box<dyn JudgeModel>,
}

impl JudgeCapability {
    pub fn new(model: Box<dyn JudgeModel>) -> Self {
        Self { model }
    }
}

impl ScoringCapability for JudgeCapability {
    fn score(&self, query: &str, evidence: &[String]) -> anyhow::Result<f32> {
        Ok(self.model.score(query, evidence)?)
    }

    fn judge_id(&self) -> &str {
        self.model.judge_id()
    }
}

/// Build the judge selected in `settings`.
///
/// # Errors
///
/// Returns [`CragError::ProviderUnavailable`] if the judge cannot be built
/// (feature disabled, missing API key).
pub fn create_scoring_capability(
    settings: &JudgeSettings,
) -> Result<Arc<dyn ScoringCapability>, CragError> {
    let model = create_judge_model(&settings.model_config()).into_crag_result()?;
    tracing::debug!(
        "Using judge `{}` ({})",
        model.judge_id(),
        model.provider()
    );
    Ok(Arc::new(JudgeCapability::new(model)))
}
