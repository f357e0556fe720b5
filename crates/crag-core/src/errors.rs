//! Error types for crag-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for CRAG operations.
///
/// Only [`CragError::Extraction`], [`CragError::GateMisconfiguration`] and
/// [`CragError::Cancelled`] abort a resolution cycle. Scoring and fallback
/// errors are recovered by the controller and recorded in the trace.
#[derive(Error, Debug)]
pub enum CragError {
    // -------------------------------------------------------------------------
    // Cycle Errors
    // -------------------------------------------------------------------------
    /// The primary retrieval output contained no well-formed evidence record.
    #[error("Extraction failed: {reason}")]
    Extraction {
        /// Why extraction failed.
        reason: String,
    },

    /// An evidence set was constructed from an empty list of units.
    #[error("Evidence set must contain at least one unit.")]
    EmptyEvidence,

    /// The judge failed, timed out or returned an unusable value.
    #[error("Scoring failed (judge `{judge}`): {reason}")]
    Scoring {
        /// Identifier of the judge that failed.
        judge: String,
        /// Underlying cause.
        reason: String,
    },

    /// The fallback search failed, timed out or returned nothing usable.
    #[error("Fallback retrieval failed (provider `{provider}`): {reason}")]
    FallbackRetrieval {
        /// Identifier of the search provider.
        provider: String,
        /// Underlying cause.
        reason: String,
    },

    /// The gate threshold is missing or outside `[0, 1]`.
    #[error("Gate misconfigured: {0}. Set `gate.minimum_relevance_score` to a value in [0, 1].")]
    GateMisconfiguration(String),

    /// The cycle was cancelled at a state boundary.
    #[error("Resolution cancelled before `{state}`.")]
    Cancelled {
        /// The state the cycle was about to enter.
        state: String,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    ///
    /// Used for validation errors detected at startup (e.g., top_k = 0).
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// A judge or search backend could not be constructed.
    #[error("Provider `{provider}` is unavailable: {reason}")]
    ProviderUnavailable {
        /// The provider that is unavailable.
        provider: String,
        /// Reason why the provider is unavailable.
        reason: String,
    },

    /// Invalid argument provided to a command.
    #[error("{0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// Failed to write to the resolution log.
    #[error("Resolution log I/O error at `{path}`: {reason}")]
    LogIoError {
        /// The path to the log file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CragError {
    /// Create an extraction error.
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction {
            reason: reason.into(),
        }
    }

    /// Create a scoring error.
    pub fn scoring(judge: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Scoring {
            judge: judge.into(),
            reason: reason.into(),
        }
    }

    /// Create a fallback retrieval error.
    pub fn fallback(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FallbackRetrieval {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error ends a resolution cycle in `Failed`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Scoring { .. } | Self::FallbackRetrieval { .. })
    }
}
