//! Decision controller: one resolution cycle as an explicit state machine.
//!
//! ```text
//! Start ─▶ Extracted ─▶ Scored ─▶ Gated ─┬─(sufficient)──────────────────────▶ Done
//!   │          │          │        │      └─(insufficient)─▶ Augmenting ─▶ Augmented ─▶ Done
//!   └──────────┴──────────┴────────┴──────────────────────────────────────────▶ Failed
//! ```
//!
//! Policy:
//! - extraction errors and cancellation end the cycle in `Failed`
//! - a judge failure is treated as `insufficient` and flagged in the trace
//! - a fallback failure keeps primary evidence only and is flagged in the trace
//!
//! The controller holds configuration and shared capabilities only. Every
//! call builds a fresh trace, so cycles may run concurrently.

use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::constants::{DEFAULT_JUDGE_TIMEOUT_MS, DEFAULT_SEARCH_TIMEOUT_MS};
use crate::errors::CragError;
use crate::evidence;
use crate::fallback::{self, SearchCapability};
use crate::gate::{self, GateCause, GateDecisionKind, Threshold};
use crate::scorer::{self, ScoringCapability};
use crate::trace::{CycleState, ResolutionTrace, TraceStep};
use crate::types::{EvidenceSet, Query};

// ============================================================================
// ControllerConfig
// ============================================================================

/// Immutable settings for a [`DecisionController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    threshold: Threshold,
    top_k_fallback_results: usize,
    judge_timeout: Duration,
    search_timeout: Duration,
}

impl ControllerConfig {
    /// Settings with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::InvalidConfiguration`] if `top_k_fallback_results`
    /// is 0.
    pub fn new(threshold: Threshold, top_k_fallback_results: usize) -> Result<Self, CragError> {
        if top_k_fallback_results == 0 {
            return Err(CragError::InvalidConfiguration {
                message: "fallback.top_k_fallback_results cannot be 0".to_string(),
                hint: "Request at least 1 fallback result (recommended: 3-5)".to_string(),
            });
        }

        Ok(Self {
            threshold,
            top_k_fallback_results,
            judge_timeout: Duration::from_millis(DEFAULT_JUDGE_TIMEOUT_MS),
            search_timeout: Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
        })
    }

    pub fn with_judge_timeout(mut self, timeout: Duration) -> Self {
        self.judge_timeout = timeout;
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn top_k_fallback_results(&self) -> usize {
        self.top_k_fallback_results
    }

    pub fn judge_timeout(&self) -> Duration {
        self.judge_timeout
    }

    pub fn search_timeout(&self) -> Duration {
        self.search_timeout
    }
}

// ============================================================================
// ResolutionOutcome
// ============================================================================

/// A cycle that reached `Done`.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Final evidence: primary, or primary followed by fallback.
    pub evidence: EvidenceSet,
    pub decision: GateDecisionKind,
    pub trace: ResolutionTrace,
}

impl Resolution {
    /// Fallback evidence was requested and merged.
    pub fn augmented(&self) -> bool {
        self.decision == GateDecisionKind::Insufficient && !self.trace.fallback_failed()
    }
}

/// A cycle that reached `Failed`. It carries no evidence.
#[derive(Debug)]
pub struct ResolutionFailure {
    pub error: CragError,
    pub trace: ResolutionTrace,
}

/// Result of one resolution cycle.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Done(Resolution),
    Failed(ResolutionFailure),
}

impl ResolutionOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn trace(&self) -> &ResolutionTrace {
        match self {
            Self::Done(r) => &r.trace,
            Self::Failed(f) => &f.trace,
        }
    }

    /// Final evidence, `None` for failed cycles.
    pub fn evidence(&self) -> Option<&EvidenceSet> {
        match self {
            Self::Done(r) => Some(&r.evidence),
            Self::Failed(_) => None,
        }
    }

    pub fn decision(&self) -> Option<GateDecisionKind> {
        match self {
            Self::Done(r) => Some(r.decision),
            Self::Failed(f) => f.trace.gate_decision(),
        }
    }

    pub fn error(&self) -> Option<&CragError> {
        match self {
            Self::Done(_) => None,
            Self::Failed(f) => Some(&f.error),
        }
    }

    /// Convert into a `Result`, dropping the failed cycle's trace.
    pub fn into_result(self) -> Result<Resolution, CragError> {
        match self {
            Self::Done(r) => Ok(r),
            Self::Failed(f) => Err(f.error),
        }
    }
}

// ============================================================================
// ResolutionRequest
// ============================================================================

/// One query with its primary retrieval output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub query: Query,
    /// Primary retrieval output (`Score: ...\nContent: ...` records).
    pub retrieval: String,
}

impl ResolutionRequest {
    pub fn new(query: impl Into<Query>, retrieval: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            retrieval: retrieval.into(),
        }
    }
}

// ============================================================================
// DecisionController
// ============================================================================

/// Orchestrates extract → score → gate → fallback for one query at a time.
#[derive(Clone)]
pub struct DecisionController {
    config: ControllerConfig,
    judge: Arc<dyn ScoringCapability>,
    search: Arc<dyn SearchCapability>,
}

impl std::fmt::Debug for DecisionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionController")
            .field("config", &self.config)
            .field("judge", &self.judge.judge_id())
            .field("search", &self.search.source_id())
            .finish()
    }
}

impl DecisionController {
    pub fn new(
        config: ControllerConfig,
        judge: Arc<dyn ScoringCapability>,
        search: Arc<dyn SearchCapability>,
    ) -> Self {
        Self {
            config,
            judge,
            search,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run one cycle for `query` over the primary retrieval output `raw`.
    pub fn resolve(&self, query: Query, raw: &str) -> ResolutionOutcome {
        self.resolve_with_cancel(query, raw, &CancellationToken::new())
    }

    /// Run one cycle, checking `cancel` before entering each state.
    pub fn resolve_with_cancel(
        &self,
        query: Query,
        raw: &str,
        cancel: &CancellationToken,
    ) -> ResolutionOutcome {
        let mut trace = ResolutionTrace::begin(query.clone(), raw.len());
        debug!("Cycle {} started", trace.cycle_id());

        match self.run_cycle(&query, raw, cancel, &mut trace) {
            Ok((evidence, decision)) => {
                trace.push(TraceStep::new(CycleState::Done, evidence.len()));
                info!(
                    "Cycle {} done: {} ({} units, scoring_failed={}, fallback_failed={})",
                    trace.cycle_id(),
                    decision,
                    evidence.len(),
                    trace.scoring_failed(),
                    trace.fallback_failed()
                );
                ResolutionOutcome::Done(Resolution {
                    evidence,
                    decision,
                    trace,
                })
            }
            Err(error) => {
                trace.push(TraceStep::new(CycleState::Failed, 0).with_note(error.to_string()));
                warn!("Cycle {} failed: {}", trace.cycle_id(), error);
                ResolutionOutcome::Failed(ResolutionFailure { error, trace })
            }
        }
    }

    /// Resolve independent requests in parallel. Output order matches input.
    pub fn resolve_batch(&self, requests: &[ResolutionRequest]) -> Vec<ResolutionOutcome> {
        self.resolve_batch_with_cancel(requests, &CancellationToken::new())
    }

    /// [`Self::resolve_batch`] with a shared cancellation token.
    pub fn resolve_batch_with_cancel(
        &self,
        requests: &[ResolutionRequest],
        cancel: &CancellationToken,
    ) -> Vec<ResolutionOutcome> {
        requests
            .par_iter()
            .map(|req| self.resolve_with_cancel(req.query.clone(), &req.retrieval, cancel))
            .collect()
    }

    /// The states between `Start` and `Done`. Returns final evidence and the
    /// gate decision, or the error that ends the cycle in `Failed`.
    fn run_cycle(
        &self,
        query: &Query,
        raw: &str,
        cancel: &CancellationToken,
        trace: &mut ResolutionTrace,
    ) -> Result<(EvidenceSet, GateDecisionKind), CragError> {
        // Start → Extracted
        check_cancel(cancel, CycleState::Extracted)?;
        let primary = evidence::extract(raw)?;
        trace.push(TraceStep::new(CycleState::Extracted, primary.len()));

        // Extracted → Scored → Gated
        check_cancel(cancel, CycleState::Scored)?;
        let input_size = primary.len();
        let (primary, decision) = match scorer::score(
            query,
            primary,
            &self.judge,
            self.config.judge_timeout,
        ) {
            Ok(score) => {
                let value = score.value();
                trace.push(TraceStep::new(CycleState::Scored, input_size).with_score(value));

                check_cancel(cancel, CycleState::Gated)?;
                let decision = gate::decide(score, self.config.threshold);
                trace.push(
                    TraceStep::new(CycleState::Gated, input_size)
                        .with_score(value)
                        .with_decision(decision.kind(), decision.cause())
                        .with_note(format!("threshold {}", decision.threshold())),
                );
                debug!(
                    "Gate: score {:.3} vs threshold {} -> {}",
                    value,
                    decision.threshold(),
                    decision.kind()
                );
                let kind = decision.kind();
                (decision.into_score().into_evidence(), kind)
            }
            Err(failure) => {
                warn!("{}; treating evidence as insufficient", failure.error);
                trace.mark_scoring_failed();
                trace.push(
                    TraceStep::new(CycleState::Scored, input_size)
                        .with_note(failure.error.to_string()),
                );

                check_cancel(cancel, CycleState::Gated)?;
                trace.push(TraceStep::new(CycleState::Gated, input_size).with_decision(
                    GateDecisionKind::Insufficient,
                    GateCause::ScoringFailed,
                ));
                (failure.evidence, GateDecisionKind::Insufficient)
            }
        };

        if decision == GateDecisionKind::Sufficient {
            check_cancel(cancel, CycleState::Done)?;
            return Ok((primary, decision));
        }

        // Gated → Augmenting → Augmented
        check_cancel(cancel, CycleState::Augmenting)?;
        trace.push(
            TraceStep::new(CycleState::Augmenting, primary.len())
                .with_note(format!("top_k {}", self.config.top_k_fallback_results)),
        );

        let fallback = fallback::retrieve(
            query,
            &self.search,
            self.config.top_k_fallback_results,
            self.config.search_timeout,
        );

        check_cancel(cancel, CycleState::Augmented)?;
        let final_evidence = match fallback {
            Ok(extra) => {
                trace.push(TraceStep::new(CycleState::Augmented, extra.len()));
                EvidenceSet::concat(primary, extra)
            }
            Err(e) => {
                warn!("{}; continuing with primary evidence only", e);
                trace.mark_fallback_failed();
                trace.push(
                    TraceStep::new(CycleState::Augmented, 0)
                        .with_note(format!("fallback failed: {}", e)),
                );
                primary
            }
        };

        check_cancel(cancel, CycleState::Done)?;
        Ok((final_evidence, decision))
    }
}

fn check_cancel(cancel: &CancellationToken, next: CycleState) -> Result<(), CragError> {
    if cancel.is_cancelled() {
        return Err(CragError::Cancelled {
            state: next.to_string(),
        });
    }
    Ok(())
}
