//! Threshold gate.
//!
//! `Sufficient` iff `score > threshold`. A score equal to the threshold is
//! `Insufficient`, so boundary scores trigger fallback retrieval.
//!
//! The gate holds no default threshold; it comes from configuration.

use serde::{Deserialize, Serialize};

use crate::errors::CragError;
use crate::scorer::RelevanceScore;

// ============================================================================
// Threshold
// ============================================================================

/// A validated gate threshold in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f32);

impl Threshold {
    /// # Errors
    ///
    /// Returns [`CragError::GateMisconfiguration`] if `value` is not a finite
    /// number in `[0, 1]`.
    pub fn new(value: f32) -> Result<Self, CragError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(CragError::GateMisconfiguration(format!(
                "threshold {} is outside [0, 1]",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Validate an optional configured threshold.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::GateMisconfiguration`] if `value` is `None` or
    /// invalid.
    pub fn from_config(value: Option<f32>) -> Result<Self, CragError> {
        match value {
            Some(v) => Self::new(v),
            None => Err(CragError::GateMisconfiguration(
                "minimum_relevance_score is not set".to_string(),
            )),
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Threshold {
    type Error = CragError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f32::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// GateDecisionKind / GateCause
// ============================================================================

/// Outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecisionKind {
    /// Primary evidence is enough to answer.
    Sufficient,
    /// Fallback retrieval is needed.
    Insufficient,
}

impl std::fmt::Display for GateDecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sufficient => write!(f, "sufficient"),
            Self::Insufficient => write!(f, "insufficient"),
        }
    }
}

/// Why the gate decided the way it did.
///
/// A scoring failure yields `Insufficient` like a low score does; the cause
/// keeps the two apart in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCause {
    /// Score strictly above the threshold.
    AboveThreshold,
    /// Score at or below the threshold.
    AtOrBelowThreshold,
    /// The judge failed; no score exists.
    ScoringFailed,
}

impl std::fmt::Display for GateCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AboveThreshold => write!(f, "above threshold"),
            Self::AtOrBelowThreshold => write!(f, "at or below threshold"),
            Self::ScoringFailed => write!(f, "scoring failed"),
        }
    }
}

// ============================================================================
// GateDecision
// ============================================================================

/// The gate's verdict with the score and threshold that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    kind: GateDecisionKind,
    score: RelevanceScore,
    threshold: Threshold,
}

impl GateDecision {
    pub fn kind(&self) -> GateDecisionKind {
        self.kind
    }

    pub fn is_sufficient(&self) -> bool {
        self.kind == GateDecisionKind::Sufficient
    }

    pub fn score(&self) -> &RelevanceScore {
        &self.score
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn cause(&self) -> GateCause {
        match self.kind {
            GateDecisionKind::Sufficient => GateCause::AboveThreshold,
            GateDecisionKind::Insufficient => GateCause::AtOrBelowThreshold,
        }
    }

    /// Release the score (and with it the evidence).
    pub fn into_score(self) -> RelevanceScore {
        self.score
    }
}

/// Compare `score` against `threshold`.
pub fn decide(score: RelevanceScore, threshold: Threshold) -> GateDecision {
    let kind = if score.value() > threshold.value() {
        GateDecisionKind::Sufficient
    } else {
        GateDecisionKind::Insufficient
    };

    GateDecision {
        kind,
        score,
        threshold,
    }
}
