//! Fallback retrieval from an external search source.
//!
//! The query goes to the search capability byte-for-byte as the user asked
//! it. Results are normalized into fallback evidence units in the order the
//! source returned them.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deadline::call_with_timeout;
use crate::errors::CragError;
use crate::types::{EvidenceSet, EvidenceUnit, Query};

// ============================================================================
// SearchCapability
// ============================================================================

/// One item returned by an external search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchHit {
    /// A hit with content only.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: None,
            title: None,
            score: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// An external search source (web search, secondary index, ...).
pub trait SearchCapability: Send + Sync {
    /// Search for `query`, returning at most `top_k` hits.
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>>;

    /// Identifier used in traces and errors.
    fn source_id(&self) -> &str {
        "search"
    }
}

// ============================================================================
// retrieve
// ============================================================================

/// Fetch supplementary evidence for `query` from `source`.
///
/// # Errors
///
/// Returns [`CragError::FallbackRetrieval`] if the source fails, exceeds
/// `timeout`, or yields no hit with non-blank content.
pub fn retrieve(
    query: &Query,
    source: &Arc<dyn SearchCapability>,
    top_k: usize,
    timeout: Duration,
) -> Result<EvidenceSet, CragError> {
    let source_id = source.source_id().to_string();
    let question = query.as_str().to_owned();
    let worker = Arc::clone(source);

    let hits = call_with_timeout("search", timeout, move || worker.search(&question, top_k))
        .map_err(|e| CragError::fallback(&source_id, e.to_string()))?;

    let returned = hits.len();
    let units: Vec<EvidenceUnit> = hits
        .into_iter()
        .take(top_k)
        .filter(|hit| !hit.content.trim().is_empty())
        .map(|hit| EvidenceUnit::fallback(hit.content.trim(), hit.url, hit.title, hit.score))
        .collect();

    debug!(
        "Search `{}` returned {} hits, {} usable",
        source_id,
        returned,
        units.len()
    );

    if units.is_empty() {
        return Err(CragError::fallback(source_id, "no usable results"));
    }

    EvidenceSet::new(units)
}
