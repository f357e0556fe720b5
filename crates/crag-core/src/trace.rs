//! Resolution trace: the audit record of one cycle.
//!
//! The controller appends one [`TraceStep`] per state it enters. Once the
//! cycle reaches `Done` or `Failed` the trace is handed out read-only.
//!
//! Export formats:
//! - [`TraceNode`] tree (`label`, `is_current`, `is_terminal`, `children`)
//!   for visualization surfaces
//! - Mermaid flowchart text for Markdown documents

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gate::{GateCause, GateDecisionKind};
use crate::types::Query;

// ============================================================================
// CycleState
// ============================================================================

/// States of one resolution cycle.
///
/// `Start → Extracted → Scored → Gated → Done` when primary evidence is
/// sufficient, `Gated → Augmenting → Augmented → Done` otherwise. `Failed`
/// is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Start,
    Extracted,
    Scored,
    Gated,
    Augmenting,
    Augmented,
    Done,
    Failed,
}

impl CycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Extracted => "extracted",
            Self::Scored => "scored",
            Self::Gated => "gated",
            Self::Augmenting => "augmenting",
            Self::Augmented => "augmented",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TraceStep
// ============================================================================

/// One entry of the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// The state entered.
    pub state: CycleState,
    /// Size of the stage's input: bytes for `start`, evidence units otherwise.
    pub input_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<GateDecisionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<GateCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Milliseconds since the cycle started.
    #[serde(default)]
    pub at_ms: u64,
}

impl TraceStep {
    pub fn new(state: CycleState, input_size: usize) -> Self {
        Self {
            state,
            input_size,
            score: None,
            decision: None,
            cause: None,
            note: None,
            at_ms: 0,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_decision(mut self, decision: GateDecisionKind, cause: GateCause) -> Self {
        self.decision = Some(decision);
        self.cause = Some(cause);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Short human-readable label used by the tree and Mermaid exports.
    pub fn label(&self) -> String {
        match self.state {
            CycleState::Start => "Start".to_string(),
            CycleState::Extracted => format!("Extracted: {} unit(s)", self.input_size),
            CycleState::Scored => match self.score {
                Some(score) => format!("Scored: {:.2}", score),
                None => "Scored: judge failed".to_string(),
            },
            CycleState::Gated => match (self.decision, self.cause) {
                (Some(decision), Some(cause)) => format!("Gated: {} ({})", decision, cause),
                (Some(decision), None) => format!("Gated: {}", decision),
                _ => "Gated".to_string(),
            },
            CycleState::Augmenting => "Augmenting: fallback search".to_string(),
            CycleState::Augmented => match &self.note {
                Some(note) => format!("Augmented: {}", note),
                None => format!("Augmented: +{} fallback unit(s)", self.input_size),
            },
            CycleState::Done => format!("Done: {} unit(s)", self.input_size),
            CycleState::Failed => match &self.note {
                Some(note) => format!("Failed: {}", note),
                None => "Failed".to_string(),
            },
        }
    }
}

// ============================================================================
// ResolutionTrace
// ============================================================================

/// Ordered record of the states one cycle went through.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTrace {
    cycle_id: Uuid,
    query: Query,
    started_at: DateTime<Utc>,
    steps: Vec<TraceStep>,
    scoring_failed: bool,
    fallback_failed: bool,
    #[serde(skip)]
    clock: Instant,
}

impl ResolutionTrace {
    /// Open a trace with its `start` step.
    pub(crate) fn begin(query: Query, input_bytes: usize) -> Self {
        let mut trace = Self {
            cycle_id: Uuid::new_v4(),
            query,
            started_at: Utc::now(),
            steps: Vec::new(),
            scoring_failed: false,
            fallback_failed: false,
            clock: Instant::now(),
        };
        trace.push(TraceStep::new(CycleState::Start, input_bytes));
        trace
    }

    pub(crate) fn push(&mut self, mut step: TraceStep) {
        step.at_ms = self.clock.elapsed().as_millis() as u64;
        self.steps.push(step);
    }

    pub(crate) fn mark_scoring_failed(&mut self) {
        self.scoring_failed = true;
    }

    pub(crate) fn mark_fallback_failed(&mut self) {
        self.fallback_failed = true;
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// The judge failed and the gate fell through to `insufficient`.
    pub fn scoring_failed(&self) -> bool {
        self.scoring_failed
    }

    /// Fallback retrieval failed; final evidence is primary only.
    pub fn fallback_failed(&self) -> bool {
        self.fallback_failed
    }

    /// The last state entered.
    pub fn current_state(&self) -> CycleState {
        self.steps
            .last()
            .map(|s| s.state)
            .unwrap_or(CycleState::Start)
    }

    /// `Some(Done | Failed)` once the cycle ended.
    pub fn terminal_state(&self) -> Option<CycleState> {
        Some(self.current_state()).filter(|s| s.is_terminal())
    }

    /// Visited states in order.
    pub fn states(&self) -> Vec<CycleState> {
        self.steps.iter().map(|s| s.state).collect()
    }

    pub fn visited(&self, state: CycleState) -> bool {
        self.steps.iter().any(|s| s.state == state)
    }

    fn gated_step(&self) -> Option<&TraceStep> {
        self.steps.iter().find(|s| s.state == CycleState::Gated)
    }

    pub fn gate_decision(&self) -> Option<GateDecisionKind> {
        self.gated_step().and_then(|s| s.decision)
    }

    pub fn gate_cause(&self) -> Option<GateCause> {
        self.gated_step().and_then(|s| s.cause)
    }

    /// The judge's score, if scoring succeeded.
    pub fn score(&self) -> Option<f32> {
        self.steps
            .iter()
            .find(|s| s.state == CycleState::Scored)
            .and_then(|s| s.score)
    }

    /// Milliseconds from start to the last recorded step.
    pub fn elapsed_ms(&self) -> u64 {
        self.steps.last().map(|s| s.at_ms).unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Export as a tree: each visited state is the only child of the one
    /// before it. The last visited node is marked current.
    pub fn to_tree(&self) -> TraceNode {
        let last = self.steps.len().saturating_sub(1);
        let mut node: Option<TraceNode> = None;

        for (i, step) in self.steps.iter().enumerate().rev() {
            node = Some(TraceNode {
                label: step.label(),
                is_current: i == last,
                is_terminal: step.state.is_terminal(),
                children: node.take().into_iter().collect(),
            });
        }

        node.unwrap_or_else(|| TraceNode {
            label: "Start".to_string(),
            is_current: true,
            is_terminal: false,
            children: Vec::new(),
        })
    }

    /// Export as a Mermaid flowchart, fenced for Markdown.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["```mermaid".to_string(), "flowchart TD".to_string()];

        for (i, step) in self.steps.iter().enumerate() {
            let label = escape_mermaid_string(&step.label());
            if step.state.is_terminal() {
                lines.push(format!("  s{}([\"{}\"])", i, label));
            } else {
                lines.push(format!("  s{}[\"{}\"]", i, label));
            }
        }

        for (i, pair) in self.steps.windows(2).enumerate() {
            match pair[0].decision {
                Some(decision) if pair[0].state == CycleState::Gated => {
                    lines.push(format!("  s{} -->|{}| s{}", i, decision, i + 1));
                }
                _ => lines.push(format!("  s{} --> s{}", i, i + 1)),
            }
        }

        if !self.steps.is_empty() {
            lines.push("  classDef current stroke-width:3px".to_string());
            lines.push(format!("  class s{} current", self.steps.len() - 1));
        }

        lines.push("```".to_string());
        lines.join("\n")
    }
}

// ============================================================================
// TraceNode
// ============================================================================

/// Rendering-agnostic tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceNode {
    pub label: String,
    /// Last visited node of the trace.
    pub is_current: bool,
    /// `done` or `failed`.
    pub is_terminal: bool,
    #[serde(default)]
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// The node marked current, if any.
    pub fn current(&self) -> Option<&TraceNode> {
        if self.is_current {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.current())
    }
}

/// Make text safe inside a quoted node label: one line, no bare quotes.
fn escape_mermaid_string(s: &str) -> String {
    s.split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sufficient_trace() -> ResolutionTrace {
        let mut trace = ResolutionTrace::begin(Query::new("q"), 40);
        trace.push(TraceStep::new(CycleState::Extracted, 1));
        trace.push(TraceStep::new(CycleState::Scored, 1).with_score(0.8));
        trace.push(
            TraceStep::new(CycleState::Gated, 1)
                .with_score(0.8)
                .with_decision(GateDecisionKind::Sufficient, GateCause::AboveThreshold),
        );
        trace.push(TraceStep::new(CycleState::Done, 1));
        trace
    }

    #[test]
    fn test_accessors() {
        let trace = sufficient_trace();
        assert_eq!(
            trace.states(),
            vec![
                CycleState::Start,
                CycleState::Extracted,
                CycleState::Scored,
                CycleState::Gated,
                CycleState::Done
            ]
        );
        assert_eq!(trace.terminal_state(), Some(CycleState::Done));
        assert_eq!(trace.gate_decision(), Some(GateDecisionKind::Sufficient));
        assert_eq!(trace.gate_cause(), Some(GateCause::AboveThreshold));
        assert_eq!(trace.score(), Some(0.8));
        assert!(!trace.visited(CycleState::Augmenting));
        assert!(!trace.scoring_failed());
    }

    #[test]
    fn test_open_trace_has_no_terminal_state() {
        let trace = ResolutionTrace::begin(Query::new("q"), 0);
        assert_eq!(trace.current_state(), CycleState::Start);
        assert_eq!(trace.terminal_state(), None);
    }

    #[test]
    fn test_tree_is_a_chain_with_current_leaf() {
        let tree = sufficient_trace().to_tree();
        assert_eq!(tree.label, "Start");
        assert_eq!(tree.depth(), 5);
        assert!(!tree.is_current);

        let current = tree.current().unwrap();
        assert_eq!(current.label, "Done: 1 unit(s)");
        assert!(current.is_terminal);
        assert!(current.children.is_empty());
    }

    #[test]
    fn test_tree_serializes_expected_fields() {
        let json = serde_json::to_value(sufficient_trace().to_tree()).unwrap();
        assert_eq!(json["label"], "Start");
        assert_eq!(json["is_current"], false);
        assert_eq!(json["is_terminal"], false);
        assert_eq!(json["children"][0]["label"], "Extracted: 1 unit(s)");
    }

    #[test]
    fn test_scoring_failure_label() {
        let step = TraceStep::new(CycleState::Gated, 1)
            .with_decision(GateDecisionKind::Insufficient, GateCause::ScoringFailed);
        assert_eq!(step.label(), "Gated: insufficient (scoring failed)");
        assert_eq!(
            TraceStep::new(CycleState::Scored, 1).label(),
            "Scored: judge failed"
        );
    }

    #[test]
    fn test_mermaid_export() {
        let mermaid = sufficient_trace().to_mermaid();
        assert!(mermaid.starts_with("```mermaid\nflowchart TD"));
        assert!(mermaid.contains("  s0[\"Start\"]"));
        assert!(mermaid.contains("  s3 -->|sufficient| s4"));
        assert!(mermaid.contains("  s4([\"Done: 1 unit(s)\"])"));
        assert!(mermaid.contains("class s4 current"));
        assert!(mermaid.ends_with("```"));
    }

    #[test]
    fn test_escape_mermaid_string() {
        assert_eq!(escape_mermaid_string("a|b [x] {y}"), "a|b [x] {y}");
        assert_eq!(escape_mermaid_string("\"q\""), "#quot;q#quot;");
        assert_eq!(escape_mermaid_string("line1\r\nline2 <b>"), "line1 line2 #lt;b#gt;");
    }

    #[test]
    fn test_mermaid_keeps_multiline_notes_on_one_node_line() {
        let mut trace = ResolutionTrace::begin(Query::new("q"), 40);
        trace.push(TraceStep::new(CycleState::Extracted, 1));
        trace.push(TraceStep::new(CycleState::Augmenting, 1));
        trace.push(
            TraceStep::new(CycleState::Augmented, 1)
                .with_note("fallback failed: HTTP 500: line1\nline2 {\"x\"}"),
        );

        let mermaid = trace.to_mermaid();
        let node = mermaid
            .lines()
            .find(|l| l.starts_with("  s3["))
            .expect("augmented node");
        assert!(node.ends_with("\"]"), "node split across lines: {}", node);
        assert!(node.contains("line1 line2 {#quot;x#quot;}"));
        assert!(!mermaid.lines().any(|l| l.starts_with("line2")));
    }
}
