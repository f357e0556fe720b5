//! Core domain types: queries and evidence.
//!
//! Evidence units are immutable once created. An [`EvidenceSet`] is never
//! empty; building one from an empty list is an error rather than a
//! zero-length set.

use serde::{Deserialize, Serialize};

use crate::errors::CragError;

// ============================================================================
// Query
// ============================================================================

/// The user's question, exactly as received.
///
/// A `Query` is never rewritten, trimmed or decomposed. Its bytes reach the
/// judge and the fallback search unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Wrap a question.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The question text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// EvidenceSource
// ============================================================================

/// Where an evidence unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    /// The local knowledge base (primary retrieval).
    Primary,
    /// The external fallback search.
    Fallback,
}

impl std::fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

// ============================================================================
// EvidenceUnit
// ============================================================================

/// One retrieved passage plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceUnit {
    text: String,
    source: EvidenceSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retrieval_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

impl EvidenceUnit {
    /// A unit parsed from primary retrieval output.
    pub fn primary(text: impl Into<String>, retrieval_score: Option<f32>) -> Self {
        Self {
            text: text.into(),
            source: EvidenceSource::Primary,
            retrieval_score,
            url: None,
            title: None,
        }
    }

    /// A unit normalized from a fallback search result.
    pub fn fallback(
        text: impl Into<String>,
        url: Option<String>,
        title: Option<String>,
        retrieval_score: Option<f32>,
    ) -> Self {
        Self {
            text: text.into(),
            source: EvidenceSource::Fallback,
            retrieval_score,
            url,
            title,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> EvidenceSource {
        self.source
    }

    /// Confidence reported by the upstream retriever, if any.
    pub fn retrieval_score(&self) -> Option<f32> {
        self.retrieval_score
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

// ============================================================================
// EvidenceSet
// ============================================================================

/// Non-empty, rank-ordered sequence of evidence units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EvidenceUnit>", into = "Vec<EvidenceUnit>")]
pub struct EvidenceSet {
    units: Vec<EvidenceUnit>,
}

impl EvidenceSet {
    /// Build a set from units in rank order.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::EmptyEvidence`] if `units` is empty.
    pub fn new(units: Vec<EvidenceUnit>) -> Result<Self, CragError> {
        if units.is_empty() {
            return Err(CragError::EmptyEvidence);
        }
        Ok(Self { units })
    }

    /// Primary units first, then fallback units, each in their own rank order.
    pub fn concat(primary: EvidenceSet, fallback: EvidenceSet) -> EvidenceSet {
        let mut units = primary.units;
        units.extend(fallback.units);
        EvidenceSet { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[EvidenceUnit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceUnit> {
        self.units.iter()
    }

    /// Unit texts in rank order, as handed to a judge.
    pub fn texts(&self) -> Vec<String> {
        self.units.iter().map(|u| u.text.clone()).collect()
    }

    /// Number of units from `source`.
    pub fn count_from(&self, source: EvidenceSource) -> usize {
        self.units.iter().filter(|u| u.source == source).count()
    }
}

impl TryFrom<Vec<EvidenceUnit>> for EvidenceSet {
    type Error = CragError;

    fn try_from(units: Vec<EvidenceUnit>) -> Result<Self, Self::Error> {
        Self::new(units)
    }
}

impl From<EvidenceSet> for Vec<EvidenceUnit> {
    fn from(set: EvidenceSet) -> Self {
        set.units
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a EvidenceUnit;
    type IntoIter = std::slice::Iter<'a, EvidenceUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
