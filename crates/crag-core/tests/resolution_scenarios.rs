//! End-to-end resolution cycles through the public crag-core API.

use std::sync::{Arc, Mutex};

use crag_core::{
    extract, ControllerConfig, CragError, CycleState, DecisionController, EvidenceSource,
    GateCause, GateDecisionKind, Query, ResolutionOutcome, ScoringCapability, SearchCapability,
    SearchHit, Threshold,
};

// ============================================================================
// Doubles
// ============================================================================

struct ScriptedJudge {
    value: Option<f32>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedJudge {
    fn returning(value: f32) -> Arc<Self> {
        Arc::new(Self {
            value: Some(value),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            value: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ScoringCapability for ScriptedJudge {
    fn score(&self, query: &str, evidence: &[String]) -> anyhow::Result<f32> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), evidence.to_vec()));
        self.value
            .ok_or_else(|| anyhow::anyhow!("judge endpoint unreachable"))
    }
}

struct ScriptedSearch {
    hits: Option<Vec<SearchHit>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    fn returning(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits: Some(hits),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SearchCapability for ScriptedSearch {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        self.calls.lock().unwrap().push((query.to_string(), top_k));
        self.hits
            .clone()
            .ok_or_else(|| anyhow::anyhow!("search quota exhausted"))
    }
}

fn controller(
    threshold: f32,
    judge: &Arc<ScriptedJudge>,
    search: &Arc<ScriptedSearch>,
) -> DecisionController {
    DecisionController::new(
        ControllerConfig::new(Threshold::new(threshold).unwrap(), 3).unwrap(),
        judge.clone(),
        search.clone(),
    )
}

fn web_hits() -> Vec<SearchHit> {
    vec![
        SearchHit::new("Allstate claims line: 1-800-255-7828")
            .with_url("https://www.allstate.com/claims"),
        SearchHit::new("Allstate customer service: 1-800-726-6033"),
    ]
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn sufficient_primary_evidence_skips_fallback() {
    let judge = ScriptedJudge::returning(0.8);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.2, &judge, &search).resolve(
        Query::new("What is Allstate's phone number?"),
        "Score: 0.9\nContent: Allstate phone is 555-1234",
    );

    let resolution = outcome.into_result().unwrap();
    assert_eq!(resolution.decision, GateDecisionKind::Sufficient);
    assert_eq!(resolution.evidence.len(), 1);
    assert_eq!(
        resolution.evidence.units()[0].text(),
        "Allstate phone is 555-1234"
    );
    assert!(search.calls().is_empty());
    assert!(!resolution.trace.visited(CycleState::Augmenting));
}

#[test]
fn insufficient_primary_evidence_is_augmented() {
    let judge = ScriptedJudge::returning(0.1);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.5, &judge, &search).resolve(
        Query::new("What is Allstate's phone number?"),
        "Score: 0.1\nContent: unrelated text",
    );

    let resolution = outcome.into_result().unwrap();
    assert_eq!(resolution.decision, GateDecisionKind::Insufficient);
    assert!(resolution.augmented());

    let units = resolution.evidence.units();
    assert_eq!(units.len(), 3);
    assert_eq!(units[0].source(), EvidenceSource::Primary);
    assert_eq!(units[0].text(), "unrelated text");
    assert_eq!(units[1].source(), EvidenceSource::Fallback);
    assert_eq!(units[1].url(), Some("https://www.allstate.com/claims"));
    assert_eq!(units[2].source(), EvidenceSource::Fallback);

    assert_eq!(
        search.calls(),
        vec![("What is Allstate's phone number?".to_string(), 3)]
    );
}

#[test]
fn empty_retrieval_fails_without_judge_or_search_calls() {
    let judge = ScriptedJudge::returning(0.9);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.5, &judge, &search).resolve(Query::new("anything"), "");

    assert!(!outcome.is_done());
    assert!(outcome.evidence().is_none());
    assert!(matches!(outcome.error(), Some(CragError::Extraction { .. })));
    assert_eq!(outcome.trace().terminal_state(), Some(CycleState::Failed));
    assert!(judge.calls().is_empty());
    assert!(search.calls().is_empty());
}

#[test]
fn score_equal_to_threshold_is_insufficient() {
    let judge = ScriptedJudge::returning(0.5);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.5, &judge, &search).resolve(Query::new("q"), "Content: local");

    assert_eq!(outcome.decision(), Some(GateDecisionKind::Insufficient));
    assert_eq!(
        outcome.trace().gate_cause(),
        Some(GateCause::AtOrBelowThreshold)
    );
    assert_eq!(search.calls().len(), 1);
}

#[test]
fn judge_failure_is_treated_as_insufficient() {
    let judge = ScriptedJudge::failing();
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.2, &judge, &search).resolve(Query::new("q"), "Content: local");

    let resolution = outcome.into_result().unwrap();
    assert_eq!(resolution.decision, GateDecisionKind::Insufficient);
    assert!(resolution.trace.scoring_failed());
    assert_eq!(resolution.trace.gate_cause(), Some(GateCause::ScoringFailed));
    assert_eq!(resolution.trace.score(), None);
    assert_eq!(resolution.evidence.len(), 3);
}

#[test]
fn fallback_failure_keeps_primary_evidence() {
    let judge = ScriptedJudge::returning(0.1);
    let search = ScriptedSearch::failing();

    let outcome = controller(0.5, &judge, &search).resolve(
        Query::new("q"),
        "Score: 0.2\nContent: first\nScore: 0.1\nContent: second",
    );

    let resolution = outcome.into_result().unwrap();
    assert!(resolution.trace.fallback_failed());
    assert!(!resolution.augmented());
    assert_eq!(resolution.evidence.texts(), vec!["first", "second"]);
    assert_eq!(resolution.trace.terminal_state(), Some(CycleState::Done));
}

#[test]
fn query_reaches_judge_and_search_unchanged() {
    let query = "  Allstate  phone? \u{00e9}\t";
    let judge = ScriptedJudge::returning(0.0);
    let search = ScriptedSearch::returning(web_hits());

    controller(0.5, &judge, &search).resolve(Query::new(query), "Content: local");

    assert_eq!(judge.calls()[0].0, query);
    assert_eq!(judge.calls()[0].1, vec!["local".to_string()]);
    assert_eq!(search.calls()[0].0, query);
}

#[test]
fn extraction_keeps_record_order() {
    let set = extract("Score: 0.7\nContent: alpha\nScore: n/a\nContent: beta\nScore: 0.3\nContent: gamma")
        .unwrap();

    assert_eq!(set.texts(), vec!["alpha", "beta", "gamma"]);
    assert_eq!(set.units()[0].retrieval_score(), Some(0.7));
    assert_eq!(set.units()[1].retrieval_score(), None);
    assert_eq!(set.units()[2].retrieval_score(), Some(0.3));
}

#[test]
fn trace_tree_follows_visited_states() {
    let judge = ScriptedJudge::returning(0.1);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.5, &judge, &search).resolve(Query::new("q"), "Content: local");
    let tree = outcome.trace().to_tree();

    assert_eq!(tree.label, "Start");
    assert!(!tree.is_current);
    assert_eq!(tree.depth(), outcome.trace().steps().len());

    let current = tree.current().unwrap();
    assert!(current.is_terminal);
    assert!(current.children.is_empty());
    assert!(current.label.starts_with("Done"));

    let json = serde_json::to_value(&tree).unwrap();
    assert!(json.get("is_current").is_some());
    assert!(json.get("is_terminal").is_some());
    assert!(json.get("children").is_some());
}

#[test]
fn mermaid_export_marks_current_state() {
    let judge = ScriptedJudge::returning(0.9);
    let search = ScriptedSearch::returning(web_hits());

    let outcome = controller(0.5, &judge, &search).resolve(Query::new("q"), "Content: local");
    let mermaid = outcome.trace().to_mermaid();

    assert!(mermaid.starts_with("```mermaid\nflowchart TD"));
    assert!(mermaid.contains("-->|sufficient|"));
    assert!(mermaid.contains("class s"));
    assert!(mermaid.trim_end().ends_with("```"));
}

#[test]
fn batch_outcomes_keep_input_order() {
    let judge = ScriptedJudge::returning(0.9);
    let search = ScriptedSearch::returning(web_hits());
    let requests: Vec<_> = (0..8)
        .map(|i| crag_core::ResolutionRequest::new(format!("query {}", i), "Content: x"))
        .collect();

    let outcomes = controller(0.5, &judge, &search).resolve_batch(&requests);

    let queries: Vec<_> = outcomes
        .iter()
        .map(|o| o.trace().query().as_str().to_string())
        .collect();
    let expected: Vec<_> = (0..8).map(|i| format!("query {}", i)).collect();
    assert_eq!(queries, expected);
    assert!(outcomes.iter().all(ResolutionOutcome::is_done));
}
