//! Relevance scoring through a pluggable judge.
//!
//! The scorer treats the judge as a black box: one call per evidence set,
//! no retries here (a judge that wants retries owns them), and no
//! synthesized score when the judge fails.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::deadline::call_with_timeout;
use crate::errors::CragError;
use crate::types::{EvidenceSet, Query};

// ============================================================================
// ScoringCapability
// ============================================================================

/// A reference-free relevance judge.
///
/// Given a query and evidence texts in rank order, returns a scalar in
/// `[0, 1]` estimating how well the evidence would let someone answer the
/// query. Any failure is reported as a single error.
pub trait ScoringCapability: Send + Sync {
    /// Score `evidence` against `query`.
    fn score(&self, query: &str, evidence: &[String]) -> anyhow::Result<f32>;

    /// Identifier used in traces and errors.
    fn judge_id(&self) -> &str {
        "judge"
    }
}

// ============================================================================
// RelevanceScore
// ============================================================================

/// A judge's verdict together with what it was computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceScore {
    value: f32,
    evidence: EvidenceSet,
    query: Query,
}

impl RelevanceScore {
    /// Build a score, clamping `value` into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::InvalidArgument`] if `value` is NaN.
    pub fn new(value: f32, evidence: EvidenceSet, query: Query) -> Result<Self, CragError> {
        if value.is_nan() {
            return Err(CragError::InvalidArgument(
                "relevance score must be a number".to_string(),
            ));
        }
        Ok(Self {
            value: value.clamp(0.0, 1.0),
            evidence,
            query,
        })
    }

    /// The score, always in `[0, 1]`.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn evidence(&self) -> &EvidenceSet {
        &self.evidence
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Give the scored evidence back to the caller.
    pub fn into_evidence(self) -> EvidenceSet {
        self.evidence
    }
}

// ============================================================================
// ScoringFailure
// ============================================================================

/// A failed scoring attempt.
///
/// Carries the evidence that was being scored so the caller can continue
/// with it (the controller falls through to fallback retrieval).
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ScoringFailure {
    /// Always [`CragError::Scoring`].
    pub error: CragError,
    /// The evidence set handed to [`score`], unchanged.
    pub evidence: EvidenceSet,
}

// ============================================================================
// score
// ============================================================================

/// Score `evidence` against `query` with `judge`, waiting at most `timeout`.
///
/// A judge value outside `[0, 1]` is clamped. A NaN value, a judge error and
/// a timeout all produce a [`ScoringFailure`].
pub fn score(
    query: &Query,
    evidence: EvidenceSet,
    judge: &Arc<dyn ScoringCapability>,
    timeout: Duration,
) -> Result<RelevanceScore, ScoringFailure> {
    let judge_id = judge.judge_id().to_string();
    let texts = evidence.texts();
    let question = query.as_str().to_owned();
    let worker = Arc::clone(judge);

    let raw = match call_with_timeout("judge", timeout, move || worker.score(&question, &texts)) {
        Ok(value) => value,
        Err(e) => {
            return Err(ScoringFailure {
                error: CragError::scoring(judge_id, e.to_string()),
                evidence,
            })
        }
    };

    if raw.is_nan() {
        return Err(ScoringFailure {
            error: CragError::scoring(judge_id, "judge returned NaN"),
            evidence,
        });
    }

    if !(0.0..=1.0).contains(&raw) {
        warn!("Judge `{}` returned {} outside [0, 1], clamping", judge_id, raw);
    }

    let value = raw.clamp(0.0, 1.0);
    debug!(
        "Judge `{}` scored {} units: {:.3}",
        judge_id,
        evidence.len(),
        value
    );

    Ok(RelevanceScore {
        value,
        evidence,
        query: query.clone(),
    })
}
