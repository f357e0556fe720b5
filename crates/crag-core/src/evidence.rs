//! Evidence extraction from primary retrieval output.
//!
//! The upstream retriever emits a text blob of repeated records:
//!
//! ```text
//! Score: 0.83
//! Content: Allstate's claims line is 1-800-255-7828.
//! Score: 0.41
//! Content: Allstate was founded in 1931.
//! ```
//!
//! Each `Content:` marker starts a record whose text runs up to the next
//! `Score:` marker or the end of input. A `Content:` marker seen before the
//! next `Score:` belongs to the current record's text. The `Score:` line is
//! optional; when present and numeric it becomes the unit's retrieval score.
//! Parsing is purely structural.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::errors::CragError;
use crate::types::{EvidenceSet, EvidenceUnit};

/// Marker that introduces a retriever score.
pub const SCORE_MARKER: &str = "Score:";

/// Marker that introduces record content.
pub const CONTENT_MARKER: &str = "Content:";

fn marker_regex() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| Regex::new(r"Score:|Content:").expect("Invalid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Score,
    Content,
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    kind: MarkerKind,
    start: usize,
    end: usize,
}

/// Parse primary retrieval output into an evidence set.
///
/// # Errors
///
/// Returns [`CragError::Extraction`] when the input holds no record with
/// non-blank content.
pub fn extract(raw: &str) -> Result<EvidenceSet, CragError> {
    let markers: Vec<Marker> = marker_regex()
        .find_iter(raw)
        .map(|m| Marker {
            kind: if m.as_str() == SCORE_MARKER {
                MarkerKind::Score
            } else {
                MarkerKind::Content
            },
            start: m.start(),
            end: m.end(),
        })
        .collect();

    let mut units = Vec::new();
    let mut pending_score: Option<Marker> = None;
    let mut i = 0;

    while i < markers.len() {
        let marker = markers[i];
        if marker.kind == MarkerKind::Score {
            pending_score = Some(marker);
            i += 1;
            continue;
        }

        let next_score = markers[i + 1..]
            .iter()
            .position(|m| m.kind == MarkerKind::Score)
            .map(|offset| i + 1 + offset);
        let text_end = next_score.map_or(raw.len(), |j| markers[j].start);
        let text = raw[marker.end..text_end].trim();

        let retrieval_score = pending_score
            .take()
            .and_then(|s| parse_score(&raw[s.end..marker.start]));

        if text.is_empty() {
            debug!("Skipping evidence record with empty content at byte {}", marker.start);
        } else {
            units.push(EvidenceUnit::primary(text, retrieval_score));
        }

        i = next_score.unwrap_or(markers.len());
    }

    if units.is_empty() {
        return Err(CragError::extraction("no parsable evidence found"));
    }

    debug!("Extracted {} evidence units", units.len());
    EvidenceSet::new(units)
}

fn parse_score(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceSource;

    #[test]
    fn test_single_record() {
        let set = extract("Score: 0.9\nContent: Allstate phone is 555-1234").unwrap();
        assert_eq!(set.len(), 1);
        let unit = &set.units()[0];
        assert_eq!(unit.text(), "Allstate phone is 555-1234");
        assert_eq!(unit.retrieval_score(), Some(0.9));
        assert_eq!(unit.source(), EvidenceSource::Primary);
    }

    #[test]
    fn test_multiple_records_keep_order() {
        let raw = "Score: 0.8\nContent: first\nScore: 0.5\nContent: second\nScore: 0.2\nContent: third\n";
        let set = extract(raw).unwrap();
        assert_eq!(set.texts(), vec!["first", "second", "third"]);
        let scores: Vec<_> = set.iter().map(|u| u.retrieval_score()).collect();
        assert_eq!(scores, vec![Some(0.8), Some(0.5), Some(0.2)]);
    }

    #[test]
    fn test_score_marker_is_optional() {
        let set = extract("Content: no score here").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.units()[0].retrieval_score(), None);
    }

    #[test]
    fn test_non_numeric_score_is_ignored() {
        let set = extract("Score: high\nContent: text").unwrap();
        assert_eq!(set.units()[0].retrieval_score(), None);
        assert_eq!(set.units()[0].text(), "text");
    }

    #[test]
    fn test_multiline_content() {
        let raw = "Score: 0.7\nContent: line one\nline two\n\nline three\nScore: 0.1\nContent: next";
        let set = extract(raw).unwrap();
        assert_eq!(set.units()[0].text(), "line one\nline two\n\nline three");
        assert_eq!(set.units()[1].text(), "next");
    }

    #[test]
    fn test_second_content_marker_is_absorbed() {
        let raw = "Content: alpha Content: beta\nScore: 0.3\nContent: gamma";
        let set = extract(raw).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.units()[0].text(), "alpha Content: beta");
        assert_eq!(set.units()[1].text(), "gamma");
        assert_eq!(set.units()[1].retrieval_score(), Some(0.3));
    }

    #[test]
    fn test_blank_records_are_skipped() {
        let raw = "Score: 0.9\nContent:   \nScore: 0.4\nContent: kept";
        let set = extract(raw).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.units()[0].text(), "kept");
        assert_eq!(set.units()[0].retrieval_score(), Some(0.4));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = extract("").unwrap_err();
        assert!(matches!(err, CragError::Extraction { .. }));
        assert!(err.to_string().contains("no parsable evidence found"));
    }

    #[test]
    fn test_input_without_content_marker_fails() {
        for raw in ["Score: 0.9", "just some prose", "Score: 0.1\nScore: 0.2\n"] {
            let result = extract(raw);
            assert!(
                matches!(result, Err(CragError::Extraction { .. })),
                "expected extraction error for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_text_before_first_marker_is_ignored() {
        let set = extract("preamble\nScore: 0.6\nContent: body").unwrap();
        assert_eq!(set.texts(), vec!["body"]);
    }
}
