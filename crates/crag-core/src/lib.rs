//! # crag-core
//!
//! **Corrective Retrieval Gate** – decision engine library.
//!
//! Decides, per query, whether locally retrieved evidence is good enough to
//! answer from, or whether an external fallback search must supplement it
//! first. It does not generate answers or run retrieval itself; judges and
//! search sources are plugged in through [`ScoringCapability`] and
//! [`SearchCapability`].
//!
//! ## Main Types
//!
//! - [`CragEngine`] – configured entry point (judge + search from config, logging)
//! - [`DecisionController`] – the resolution state machine
//! - [`ResolutionOutcome`] – `Done` with evidence, or `Failed` without
//! - [`ResolutionTrace`] – audit trail, exportable as a [`TraceNode`] tree
//! - [`CragError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`evidence`] – parse primary retrieval output into evidence units
//! - [`scorer`] – score evidence with a judge
//! - [`gate`] – compare a score with the threshold
//! - [`fallback`] – fetch supplementary evidence
//! - [`controller`] – orchestrate one cycle
//! - [`trace`] – trace entries and exports
//! - [`config`] – `~/.crag/config.yaml`
//!
//! ## Example
//!
//! ```ignore
//! use crag_core::{CragEngine, Query, ResolutionOutcome};
//!
//! let engine = CragEngine::with_defaults()?;
//! let raw = "Score: 0.9\nContent: Allstate's claims line is 1-800-255-7828.";
//!
//! match engine.resolve(Query::new("What is Allstate's claims number?"), raw) {
//!     ResolutionOutcome::Done(r) => println!("{} units ({})", r.evidence.len(), r.decision),
//!     ResolutionOutcome::Failed(f) => eprintln!("no evidence: {}", f.error),
//! }
//! ```

// Modules
pub mod cancel;
pub mod config;
pub mod constants;
pub mod controller;
pub mod deadline;
pub mod engine;
pub mod errors;
pub mod evidence;
pub mod fallback;
pub mod gate;
pub mod log;
pub mod model_adapter;
pub mod scorer;
pub mod search_adapter;
pub mod trace;
pub mod types;

#[cfg(test)]
pub(crate) mod test_doubles;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use config::{
    CragConfig, FallbackConfig, GateConfig, JudgeSettings, LogConfig, SearchConfig,
    SearchProviderKind,
};
pub use constants::{
    CONFIG_FILENAME, CRAG_HOME_DIR, DEFAULT_JUDGE_TIMEOUT_MS, DEFAULT_MINIMUM_RELEVANCE_SCORE,
    DEFAULT_SEARCH_TIMEOUT_MS, DEFAULT_TOP_K_FALLBACK_RESULTS, RESOLUTION_LOG_FILENAME,
};
pub use controller::{
    ControllerConfig, DecisionController, Resolution, ResolutionFailure, ResolutionOutcome,
    ResolutionRequest,
};
pub use engine::CragEngine;
pub use errors::CragError;
pub use evidence::extract;
pub use fallback::{retrieve, SearchCapability, SearchHit};
pub use gate::{decide, GateCause, GateDecision, GateDecisionKind, Threshold};
pub use log::{
    append_resolution_log, load_resolution_log, OutcomeStatus, ResolutionLogEntry,
};
pub use model_adapter::{create_scoring_capability, JudgeCapability};
pub use scorer::{score, RelevanceScore, ScoringCapability, ScoringFailure};
pub use search_adapter::{create_search_capability, NoSearch, WebSearch};
pub use trace::{CycleState, ResolutionTrace, TraceNode, TraceStep};
pub use types::{EvidenceSet, EvidenceSource, EvidenceUnit, Query};

// Judge configuration types are canonical in crag-model
pub use crag_model::{JudgeConfig, JudgeProviderKind, LexicalJudgeConfig, LlmJudgeConfig};
