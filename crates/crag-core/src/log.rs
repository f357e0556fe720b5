//! Resolution log for CRAG.
//!
//! Every resolved query can be appended as one JSON line to a log file
//! (`log.resolution_log` in the config). The same entry shape is used for
//! `--json` output, so the log and the CLI agree on field names.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::controller::ResolutionOutcome;
use crate::errors::CragError;
use crate::gate::{GateCause, GateDecisionKind};
use crate::trace::TraceStep;
use crate::types::{EvidenceSource, EvidenceUnit};

// ============================================================================
// OutcomeStatus
// ============================================================================

/// Terminal status of a logged cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Done,
    Failed,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// ResolutionLogEntry
// ============================================================================

/// An entry in the resolution log (stored format in the JSONL file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionLogEntry {
    /// Cycle identifier, shared with the trace.
    pub cycle_id: Uuid,
    /// When the cycle started.
    pub timestamp: DateTime<Utc>,
    /// The query, unmodified.
    pub query: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<GateDecisionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<GateCause>,
    /// Judge score, absent when scoring failed or never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub scoring_failed: bool,
    pub fallback_failed: bool,
    pub primary_units: usize,
    pub fallback_units: usize,
    /// Final evidence; empty for failed cycles.
    #[serde(default)]
    pub evidence: Vec<EvidenceUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub steps: Vec<TraceStep>,
    pub elapsed_ms: u64,
}

impl ResolutionLogEntry {
    /// Summarize a finished cycle.
    pub fn from_outcome(outcome: &ResolutionOutcome) -> Self {
        let trace = outcome.trace();
        let evidence: Vec<EvidenceUnit> = outcome
            .evidence()
            .map(|set| set.units().to_vec())
            .unwrap_or_default();
        let count = |source| evidence.iter().filter(|u| u.source() == source).count();

        Self {
            cycle_id: trace.cycle_id(),
            timestamp: trace.started_at(),
            query: trace.query().as_str().to_string(),
            status: if outcome.is_done() {
                OutcomeStatus::Done
            } else {
                OutcomeStatus::Failed
            },
            decision: outcome.decision(),
            cause: trace.gate_cause(),
            score: trace.score(),
            scoring_failed: trace.scoring_failed(),
            fallback_failed: trace.fallback_failed(),
            primary_units: count(EvidenceSource::Primary),
            fallback_units: count(EvidenceSource::Fallback),
            error: outcome.error().map(|e| e.to_string()),
            steps: trace.steps().to_vec(),
            elapsed_ms: trace.elapsed_ms(),
            evidence,
        }
    }
}

// ============================================================================
// Read / Write
// ============================================================================

/// Append one entry to the JSONL log at `path`, creating parent directories.
pub fn append_resolution_log(path: &Path, entry: &ResolutionLogEntry) -> Result<(), CragError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CragError::LogIoError {
            path: parent.to_path_buf(),
            reason: format!("Failed to create log directory: {}", e),
        })?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CragError::LogIoError {
            path: path.to_path_buf(),
            reason: format!("Failed to open resolution log: {}", e),
        })?;

    let mut line = serde_json::to_string(entry).map_err(|e| CragError::LogIoError {
        path: path.to_path_buf(),
        reason: format!("Failed to serialize resolution log entry: {}", e),
    })?;
    line.push('\n');

    // One write per entry so concurrent appenders never split a line
    file.write_all(line.as_bytes()).map_err(|e| CragError::LogIoError {
        path: path.to_path_buf(),
        reason: format!("Failed to write resolution log entry: {}", e),
    })?;

    Ok(())
}

/// Read every entry of the JSONL log at `path`. Blank lines are skipped.
pub fn load_resolution_log(path: &Path) -> Result<Vec<ResolutionLogEntry>, CragError> {
    let file = File::open(path).map_err(|e| CragError::LogIoError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| CragError::LogIoError {
            path: path.to_path_buf(),
            reason: format!("Failed to read line {}: {}", line_num + 1, e),
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let entry: ResolutionLogEntry =
            serde_json::from_str(&line).map_err(|e| CragError::LogIoError {
                path: path.to_path_buf(),
                reason: format!("Failed to parse line {}: {}", line_num + 1, e),
            })?;

        entries.push(entry);
    }

    Ok(entries)
}
