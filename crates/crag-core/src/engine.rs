//! CRAG Engine – configured entry point for resolution cycles.
//!
//! The [`CragEngine`] builds the judge and the search source from
//! configuration, owns the [`DecisionController`], and appends every
//! outcome to the resolution log when one is configured.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::config::CragConfig;
use crate::controller::{DecisionController, ResolutionOutcome, ResolutionRequest};
use crate::errors::CragError;
use crate::fallback::SearchCapability;
use crate::log::{append_resolution_log, ResolutionLogEntry};
use crate::model_adapter::create_scoring_capability;
use crate::scorer::ScoringCapability;
use crate::search_adapter::create_search_capability;
use crate::types::Query;

// ============================================================================
// CragEngine
// ============================================================================

/// The main engine for CRAG operations.
///
/// # Construction
///
/// Use [`CragEngine::from_config`] for typical usage, or
/// [`CragEngine::with_capabilities`] to plug in custom judges and search
/// sources (tests, embedding applications).
///
/// # Example
///
/// ```ignore
/// use crag_core::{CragConfig, CragEngine, Query};
///
/// let engine = CragEngine::from_config(CragConfig::load_default()?)?;
/// let outcome = engine.resolve(Query::new("What is the claims number?"), &raw);
/// ```
#[derive(Debug)]
pub struct CragEngine {
    config: CragConfig,
    controller: DecisionController,
    log_path: Option<PathBuf>,
}

impl CragEngine {
    /// Build an engine with the judge and search source named in `config`.
    ///
    /// # Errors
    ///
    /// Fails on gate misconfiguration, invalid settings, or a provider that
    /// cannot be built.
    pub fn from_config(config: CragConfig) -> Result<Self, CragError> {
        let judge = create_scoring_capability(&config.judge)?;
        let search = create_search_capability(&config)?;
        Self::with_capabilities(config, judge, search)
    }

    /// Build an engine from the default config file.
    pub fn with_defaults() -> Result<Self, CragError> {
        Self::from_config(CragConfig::load_default()?)
    }

    /// Build an engine from a config file at `path`.
    pub fn with_config(path: &Path) -> Result<Self, CragError> {
        Self::from_config(CragConfig::from_path(path)?)
    }

    /// Build an engine around caller-provided capabilities.
    pub fn with_capabilities(
        config: CragConfig,
        judge: Arc<dyn ScoringCapability>,
        search: Arc<dyn SearchCapability>,
    ) -> Result<Self, CragError> {
        let controller_config = config.controller_config()?;
        let log_path = config.resolution_log_path();

        Ok(Self {
            controller: DecisionController::new(controller_config, judge, search),
            log_path,
            config,
        })
    }

    pub fn config(&self) -> &CragConfig {
        &self.config
    }

    pub fn controller(&self) -> &DecisionController {
        &self.controller
    }

    /// Resolve one query and log the outcome.
    pub fn resolve(&self, query: Query, raw: &str) -> ResolutionOutcome {
        self.resolve_with_cancel(query, raw, &CancellationToken::new())
    }

    /// [`Self::resolve`] with cancellation.
    pub fn resolve_with_cancel(
        &self,
        query: Query,
        raw: &str,
        cancel: &CancellationToken,
    ) -> ResolutionOutcome {
        let outcome = self.controller.resolve_with_cancel(query, raw, cancel);
        self.log_outcome(&outcome);
        outcome
    }

    /// Resolve many queries in parallel and log every outcome in input order.
    pub fn resolve_batch(&self, requests: &[ResolutionRequest]) -> Vec<ResolutionOutcome> {
        let outcomes = self.controller.resolve_batch(requests);
        for outcome in &outcomes {
            self.log_outcome(outcome);
        }
        outcomes
    }

    fn log_outcome(&self, outcome: &ResolutionOutcome) {
        let Some(path) = &self.log_path else {
            return;
        };

        // A log failure never fails the resolution
        let entry = ResolutionLogEntry::from_outcome(outcome);
        if let Err(e) = append_resolution_log(path, &entry) {
            tracing::warn!("Failed to persist resolution log entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchProviderKind;
    use crate::log::load_resolution_log;
    use crate::test_doubles::{FixedJudge, RecordingSearch};
    use tempfile::TempDir;

    #[test]
    fn test_from_config_with_lexical_judge_and_no_search() {
        let mut config = CragConfig::default();
        config.search.provider = SearchProviderKind::None;
        let engine = CragEngine::from_config(config).unwrap();

        let outcome = engine.resolve(
            Query::new("What is the Allstate claims phone number?"),
            "Score: 0.9\nContent: The Allstate claims phone number is 1-800-255-7828.",
        );
        let resolution = outcome.into_result().unwrap();
        assert_eq!(resolution.evidence.len(), 1);
        assert!(!resolution.trace.fallback_failed());
    }

    #[test]
    fn test_gate_misconfiguration_surfaces_at_construction() {
        let mut config = CragConfig::default();
        config.search.provider = SearchProviderKind::None;
        config.gate.minimum_relevance_score = None;

        let err = CragEngine::from_config(config).unwrap_err();
        assert!(matches!(err, CragError::GateMisconfiguration(_)));
    }

    #[test]
    fn test_outcomes_are_logged() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("resolutions.jsonl");
        let mut config = CragConfig::default();
        config.log.resolution_log = Some(log_path.to_string_lossy().into_owned());

        let engine = CragEngine::with_capabilities(
            config,
            Arc::new(FixedJudge::new(0.9)),
            Arc::new(RecordingSearch::new(Vec::new())),
        )
        .unwrap();

        engine.resolve(Query::new("one"), "Content: a");
        engine.resolve_batch(&[
            ResolutionRequest::new("two", "Content: b"),
            ResolutionRequest::new("three", ""),
        ]);

        let entries = load_resolution_log(&log_path).unwrap();
        let queries: Vec<_> = entries.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["one", "two", "three"]);
    }
}
