//! Error types for crag-model.
//!
//! Errors explain what the judge was doing when it failed and, where it
//! helps, how to fix the setup (missing API key, unreachable endpoint).

use thiserror::Error;

/// Result type alias for crag-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while a judge scores evidence.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Setup errors
    // ========================================================================
    /// Provider not available (feature disabled or unknown provider).
    #[error("Judge provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// The API key environment variable is not set.
    #[error("API key not found: environment variable `{env_var}` is not set.\n\nExport it before running, or switch `judge.provider` to `lexical` in ~/.crag/config.yaml.")]
    MissingApiKey { env_var: String },

    // ========================================================================
    // Scoring errors
    // ========================================================================
    /// The judge was given input it cannot score.
    #[error("Invalid judge input: {message}")]
    InvalidInput { message: String },

    /// The HTTP request to the judge endpoint failed.
    #[error("Judge request to '{endpoint}' failed: {message}")]
    Request { endpoint: String, message: String },

    /// The judge endpoint answered with a non-success status.
    #[error("Judge endpoint '{endpoint}' returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The judge answered but the answer could not be interpreted.
    #[error("Judge '{judge_id}' returned an unusable response: {message}")]
    InvalidResponse { judge_id: String, message: String },

    // ========================================================================
    // Serialization errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a request error.
    pub fn request(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(judge_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            judge_id: judge_id.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// bad input, missing keys and client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ModelError::request("http://x", "connection refused").is_transient());
        assert!(ModelError::Status {
            endpoint: "http://x".to_string(),
            status: 503,
            body: String::new(),
        }
        .is_transient());
        assert!(ModelError::Status {
            endpoint: "http://x".to_string(),
            status: 429,
            body: String::new(),
        }
        .is_transient());
        assert!(!ModelError::Status {
            endpoint: "http://x".to_string(),
            status: 401,
            body: String::new(),
        }
        .is_transient());
        assert!(!ModelError::invalid_input("empty").is_transient());
    }

    #[test]
    fn test_missing_api_key_message_names_variable() {
        let err = ModelError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
