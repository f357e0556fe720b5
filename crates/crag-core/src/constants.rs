//! Common constants used throughout crag-core.
//!
//! This module centralizes paths and configuration defaults so the config
//! layer, the controller and the CLI agree on them.

// ============================================================================
// Directory Names
// ============================================================================

/// The name of the global CRAG configuration directory.
///
/// Located at `~/.crag/` on Unix-like systems.
pub const CRAG_HOME_DIR: &str = ".crag";

/// The global configuration file inside [`CRAG_HOME_DIR`].
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Suggested resolution log file inside [`CRAG_HOME_DIR`]. Logging is off until
/// `log.resolution_log` is set.
pub const RESOLUTION_LOG_FILENAME: &str = "resolutions.jsonl";

// ============================================================================
// Gate Defaults
// ============================================================================

/// Default `gate.minimum_relevance_score`.
pub const DEFAULT_MINIMUM_RELEVANCE_SCORE: f32 = 0.5;

// ============================================================================
// Fallback Defaults
// ============================================================================

/// Default `fallback.top_k_fallback_results`.
pub const DEFAULT_TOP_K_FALLBACK_RESULTS: usize = 3;

/// Default `fallback.search_timeout_ms`.
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 10_000;

/// Above this many fallback results, config validation warns.
pub const MAX_RECOMMENDED_TOP_K: usize = 20;

// ============================================================================
// Judge Defaults
// ============================================================================

/// Default `judge.timeout_ms`.
///
/// Covers the judge's own retries, so it should exceed the LLM judge's
/// per-request timeout.
pub const DEFAULT_JUDGE_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Search Defaults
// ============================================================================

/// Default environment variable holding the search API key.
pub const DEFAULT_SEARCH_API_KEY_ENV: &str = "TAVILY_API_KEY";
