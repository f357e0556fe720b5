//! Term-overlap judge.
//!
//! A local, deterministic stand-in for an LLM judge. Each evidence unit is
//! marked useful when it contains enough of the query's content terms, and
//! the verdicts are reduced with [`crate::context_precision`].
//!
//! Text preprocessing:
//! - Unicode word segmentation
//! - Case folding (lowercasing)
//! - Stop word removal
//! - Porter stemming (English, optional)

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{JudgeProviderKind, LexicalJudgeConfig};
use crate::error::{ModelError, ModelResult};
use crate::{context_precision, JudgeModel};

/// Minimum token length kept by the tokenizer.
const MIN_TOKEN_LENGTH: usize = 2;

/// English stop words. Question words are included: they carry no evidence.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "in", "on", "at", "to", "of", "with", "by", "from", "as", "into", "for",
    "and", "or", "but", "nor", "so", "yet", "i", "you", "he", "she", "it", "we", "they", "me",
    "him", "her", "us", "them", "my", "your", "his", "its", "our", "their", "this", "that",
    "these", "those", "which", "who", "whom", "whose", "what", "where", "when", "how", "why",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "can", "may", "might", "must", "there", "here", "about",
    "any", "some", "please", "tell",
];

/// Judge that scores evidence by query-term overlap.
pub struct LexicalOverlapJudge {
    config: LexicalJudgeConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<&'static str>,
}

impl std::fmt::Debug for LexicalOverlapJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalOverlapJudge")
            .field("config", &self.config)
            .finish()
    }
}

impl LexicalOverlapJudge {
    /// Create a new lexical judge.
    pub fn new(config: LexicalJudgeConfig) -> Self {
        let stemmer = if config.stemming {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        Self {
            config,
            stemmer,
            stopwords: STOPWORDS.iter().copied().collect(),
        }
    }

    /// Tokenize text into a set of processed terms.
    pub fn terms(&self, text: &str) -> HashSet<String> {
        text.unicode_words()
            .filter_map(|word| self.process_token(word))
            .collect()
    }

    /// Fraction of `query_terms` present in `text`.
    fn overlap(&self, query_terms: &HashSet<String>, text: &str) -> f32 {
        let doc_terms = self.terms(text);
        let shared = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
        shared as f32 / query_terms.len() as f32
    }

    fn process_token(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();

        // Keep alphanumeric tokens, drop pure punctuation
        if !lower.chars().any(|c| c.is_alphanumeric()) {
            return None;
        }

        if lower.chars().count() < MIN_TOKEN_LENGTH && !lower.chars().all(|c| c.is_numeric()) {
            return None;
        }

        if self.stopwords.contains(lower.as_str()) {
            return None;
        }

        let token = match self.stemmer {
            Some(ref stemmer) => stemmer.stem(&lower).to_string(),
            None => lower,
        };

        Some(token)
    }
}

impl JudgeModel for LexicalOverlapJudge {
    fn score(&self, query: &str, evidence: &[String]) -> ModelResult<f32> {
        let query_terms = self.terms(query);
        if query_terms.is_empty() {
            return Err(ModelError::invalid_input(
                "query has no content terms to match",
            ));
        }

        let verdicts: Vec<bool> = evidence
            .iter()
            .map(|text| self.overlap(&query_terms, text) >= self.config.min_overlap)
            .collect();

        let score = context_precision(&verdicts);
        debug!(
            "Lexical judge: {} of {} units useful, score {:.3}",
            verdicts.iter().filter(|v| **v).count(),
            verdicts.len(),
            score
        );

        Ok(score)
    }

    fn judge_id(&self) -> &str {
        "lexical"
    }

    fn provider(&self) -> JudgeProviderKind {
        JudgeProviderKind::Lexical
    }
}
