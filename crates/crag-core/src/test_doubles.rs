//! Judge and search doubles shared by unit tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::fallback::{SearchCapability, SearchHit};
use crate::scorer::ScoringCapability;

/// Judge returning a fixed value and recording its inputs.
pub struct FixedJudge {
    value: f32,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FixedJudge {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ScoringCapability for FixedJudge {
    fn score(&self, query: &str, evidence: &[String]) -> anyhow::Result<f32> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), evidence.to_vec()));
        Ok(self.value)
    }

    fn judge_id(&self) -> &str {
        "fixed"
    }
}

/// Judge that always errors.
pub struct FailingJudge {
    message: String,
}

impl FailingJudge {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl ScoringCapability for FailingJudge {
    fn score(&self, _query: &str, _evidence: &[String]) -> anyhow::Result<f32> {
        anyhow::bail!("{}", self.message)
    }

    fn judge_id(&self) -> &str {
        "failing"
    }
}

/// Judge that sleeps before answering.
pub struct SlowJudge {
    delay: Duration,
    value: f32,
}

impl SlowJudge {
    pub fn new(delay: Duration, value: f32) -> Self {
        Self { delay, value }
    }
}

impl ScoringCapability for SlowJudge {
    fn score(&self, _query: &str, _evidence: &[String]) -> anyhow::Result<f32> {
        std::thread::sleep(self.delay);
        Ok(self.value)
    }
}

/// Search returning canned hits and recording `(query, top_k)` per call.
pub struct RecordingSearch {
    hits: Vec<SearchHit>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl RecordingSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SearchCapability for RecordingSearch {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        self.calls.lock().unwrap().push((query.to_string(), top_k));
        Ok(self.hits.clone())
    }

    fn source_id(&self) -> &str {
        "recording"
    }
}

/// Search that always errors.
pub struct FailingSearch {
    message: String,
}

impl FailingSearch {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl SearchCapability for FailingSearch {
    fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        anyhow::bail!("{}", self.message)
    }
}

/// Search that sleeps, then returns one hit.
pub struct SlowSearch {
    delay: Duration,
}

impl SlowSearch {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl SearchCapability for SlowSearch {
    fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        std::thread::sleep(self.delay);
        Ok(vec![SearchHit::new("late")])
    }
}

/// Judge that cancels `token` while scoring, as a user hitting Ctrl-C mid-call.
pub struct CancellingJudge {
    token: CancellationToken,
    value: f32,
}

impl CancellingJudge {
    pub fn new(token: CancellationToken, value: f32) -> Self {
        Self { token, value }
    }
}

impl ScoringCapability for CancellingJudge {
    fn score(&self, _query: &str, _evidence: &[String]) -> anyhow::Result<f32> {
        self.token.cancel();
        Ok(self.value)
    }
}

/// Search that cancels `token` before returning its hits.
pub struct CancellingSearch {
    token: CancellationToken,
    inner: RecordingSearch,
}

impl CancellingSearch {
    pub fn new(token: CancellationToken, hits: Vec<SearchHit>) -> Self {
        Self {
            token,
            inner: RecordingSearch::new(hits),
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.inner.calls()
    }
}

impl SearchCapability for CancellingSearch {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        let hits = self.inner.search(query, top_k)?;
        self.token.cancel();
        Ok(hits)
    }
}
