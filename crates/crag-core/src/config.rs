//! Configuration for CRAG.
//!
//! Settings live in `~/.crag/config.yaml`. A missing file means defaults;
//! every section and every key is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! gate:
//!   minimum_relevance_score: 0.5
//! fallback:
//!   top_k_fallback_results: 3
//!   search_timeout_ms: 10000
//! judge:
//!   provider: llm
//!   timeout_ms: 30000
//!   llm:
//!     model: gpt-4o-mini
//!     api_key_env: OPENAI_API_KEY
//! search:
//!   provider: tavily
//!   api_key_env: TAVILY_API_KEY
//! log:
//!   resolution_log: ~/.crag/resolutions.jsonl
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crag_model::{JudgeConfig, JudgeProviderKind, LexicalJudgeConfig, LlmJudgeConfig};
use crag_search::DEFAULT_TAVILY_ENDPOINT;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILENAME, CRAG_HOME_DIR, DEFAULT_JUDGE_TIMEOUT_MS, DEFAULT_MINIMUM_RELEVANCE_SCORE,
    DEFAULT_SEARCH_API_KEY_ENV, DEFAULT_SEARCH_TIMEOUT_MS, DEFAULT_TOP_K_FALLBACK_RESULTS,
    MAX_RECOMMENDED_TOP_K,
};
use crate::controller::ControllerConfig;
use crate::errors::CragError;
use crate::gate::Threshold;

// ============================================================================
// CragConfig
// ============================================================================

/// Global (user-level) configuration for CRAG.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CragConfig {
    /// Relevance gate settings.
    #[serde(default)]
    pub gate: GateConfig,

    /// Fallback retrieval settings.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Judge selection and settings.
    #[serde(default)]
    pub judge: JudgeSettings,

    /// External search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Resolution log settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl CragConfig {
    /// Load the configuration from the default location (`~/.crag/config.yaml`).
    ///
    /// If the file does not exist, returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, CragError> {
        Self::read_default()?.validated()
    }

    /// Load the configuration from a specific path.
    ///
    /// If the file does not exist, returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CragError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    /// Returns [`CragError::GateMisconfiguration`] or [`CragError::InvalidConfiguration`]
    /// if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, CragError> {
        Self::read_path(path)?.validated()
    }

    /// Parse the default config file without validating it.
    ///
    /// Callers that apply overrides (CLI flags) validate afterwards.
    pub fn read_default() -> Result<Self, CragError> {
        match Self::default_path() {
            Some(path) => Self::read_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Parse the config file at `path` without validating it.
    pub fn read_path(path: &Path) -> Result<Self, CragError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CragError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            CragError::Yaml(e) => {
                CragError::InvalidGlobalConfig(format!("Failed to parse {}: {}", path.display(), e))
            }
            other => other,
        })
    }

    /// Validate, log any warnings, and hand the config back.
    pub fn validated(self) -> Result<Self, CragError> {
        for warning in self.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(self)
    }

    /// Parse configuration from YAML text without validating it.
    pub fn from_yaml(content: &str) -> Result<Self, CragError> {
        // An empty file parses as unit, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get the default config directory (`~/.crag`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CRAG_HOME_DIR))
    }

    /// Get the default config file path (`~/.crag/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(CONFIG_FILENAME))
    }

    /// Validate every section.
    ///
    /// Fatal problems are returned as errors; questionable values come back
    /// as warnings for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>, CragError> {
        let mut warnings = Vec::new();
        warnings.extend(self.gate.validate()?);
        warnings.extend(self.fallback.validate()?);
        warnings.extend(self.judge.validate()?);
        warnings.extend(self.search.validate()?);
        Ok(warnings)
    }

    /// The validated gate threshold.
    pub fn threshold(&self) -> Result<Threshold, CragError> {
        Threshold::from_config(self.gate.minimum_relevance_score)
    }

    /// Build the controller settings.
    ///
    /// This is where gate misconfiguration surfaces: before any query runs.
    pub fn controller_config(&self) -> Result<ControllerConfig, CragError> {
        if self.judge.timeout_ms == 0 || self.fallback.search_timeout_ms == 0 {
            return Err(zero_timeout_error());
        }

        Ok(
            ControllerConfig::new(self.threshold()?, self.fallback.top_k_fallback_results)?
                .with_judge_timeout(Duration::from_millis(self.judge.timeout_ms))
                .with_search_timeout(Duration::from_millis(self.fallback.search_timeout_ms)),
        )
    }

    /// Override the gate threshold (e.g. from a CLI flag).
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.gate.minimum_relevance_score = Some(threshold);
        self
    }

    /// Override the number of fallback results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.fallback.top_k_fallback_results = top_k;
        self
    }

    /// Resolved path of the resolution log, if logging is enabled.
    pub fn resolution_log_path(&self) -> Option<PathBuf> {
        self.log.resolution_log.as_deref().map(expand_home)
    }
}

fn zero_timeout_error() -> CragError {
    CragError::InvalidConfiguration {
        message: "judge.timeout_ms and fallback.search_timeout_ms must be greater than 0"
            .to_string(),
        hint: "Use a timeout of a few seconds (defaults: 30000 for the judge, 10000 for search)"
            .to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

// ============================================================================
// GateConfig
// ============================================================================

/// Relevance gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Threshold the judge's score must exceed. `null` is a misconfiguration.
    #[serde(default = "default_minimum_relevance_score")]
    pub minimum_relevance_score: Option<f32>,
}

fn default_minimum_relevance_score() -> Option<f32> {
    Some(DEFAULT_MINIMUM_RELEVANCE_SCORE)
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            minimum_relevance_score: default_minimum_relevance_score(),
        }
    }
}

impl GateConfig {
    /// # Errors
    /// Returns [`CragError::GateMisconfiguration`] if the threshold is missing or
    /// outside `[0, 1]`.
    ///
    /// # Warnings
    /// - threshold `0.0`: nearly every query is sufficient, fallback almost never runs
    /// - threshold `1.0`: no score can exceed it, fallback always runs
    pub fn validate(&self) -> Result<Vec<String>, CragError> {
        let threshold = Threshold::from_config(self.minimum_relevance_score)?;
        let mut warnings = Vec::new();

        if threshold.value() == 0.0 {
            warnings.push(
                "gate.minimum_relevance_score=0 accepts any non-zero score; fallback will rarely run"
                    .to_string(),
            );
        }
        if threshold.value() == 1.0 {
            warnings.push(
                "gate.minimum_relevance_score=1 can never be exceeded; fallback will always run"
                    .to_string(),
            );
        }

        Ok(warnings)
    }
}

// ============================================================================
// FallbackConfig
// ============================================================================

/// Fallback retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// How many results to request from the search source.
    #[serde(default = "default_top_k_fallback_results")]
    pub top_k_fallback_results: usize,

    /// Caller-side timeout for one search call.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

fn default_top_k_fallback_results() -> usize {
    DEFAULT_TOP_K_FALLBACK_RESULTS
}
fn default_search_timeout_ms() -> u64 {
    DEFAULT_SEARCH_TIMEOUT_MS
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            top_k_fallback_results: DEFAULT_TOP_K_FALLBACK_RESULTS,
            search_timeout_ms: DEFAULT_SEARCH_TIMEOUT_MS,
        }
    }
}

impl FallbackConfig {
    /// # Errors
    /// Returns an error if `top_k_fallback_results` or `search_timeout_ms` is 0.
    ///
    /// # Warnings
    /// - `top_k_fallback_results > 20`: large prompts downstream, slow searches
    pub fn validate(&self) -> Result<Vec<String>, CragError> {
        let mut warnings = Vec::new();

        if self.top_k_fallback_results == 0 {
            return Err(CragError::InvalidConfiguration {
                message: "fallback.top_k_fallback_results cannot be 0".to_string(),
                hint: "Request at least 1 fallback result (recommended: 3-5)".to_string(),
            });
        }

        if self.search_timeout_ms == 0 {
            return Err(zero_timeout_error());
        }

        if self.top_k_fallback_results > MAX_RECOMMENDED_TOP_K {
            warnings.push(format!(
                "fallback.top_k_fallback_results={} is large; answers may be built from noisy evidence (recommended: 3-5)",
                self.top_k_fallback_results
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// JudgeSettings
// ============================================================================

/// Judge selection plus the caller-side timeout.
///
/// Provider settings are the canonical `crag-model` types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeSettings {
    /// Which judge to build.
    #[serde(default)]
    pub provider: JudgeProviderKind,

    /// Caller-side timeout for one scoring call, judge retries included.
    #[serde(default = "default_judge_timeout_ms")]
    pub timeout_ms: u64,

    /// Lexical judge settings.
    #[serde(default)]
    pub lexical: LexicalJudgeConfig,

    /// LLM judge settings.
    #[serde(default)]
    pub llm: LlmJudgeConfig,
}

fn default_judge_timeout_ms() -> u64 {
    DEFAULT_JUDGE_TIMEOUT_MS
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            provider: JudgeProviderKind::default(),
            timeout_ms: DEFAULT_JUDGE_TIMEOUT_MS,
            lexical: LexicalJudgeConfig::default(),
            llm: LlmJudgeConfig::default(),
        }
    }
}

impl JudgeSettings {
    /// The `crag-model` view of these settings.
    pub fn model_config(&self) -> JudgeConfig {
        JudgeConfig {
            provider: self.provider,
            lexical: self.lexical.clone(),
            llm: self.llm.clone(),
        }
    }

    /// # Errors
    /// Returns an error if `timeout_ms` is 0.
    ///
    /// # Warnings
    /// - LLM judge whose caller timeout is shorter than one HTTP request
    /// - lexical `min_overlap` outside `(0, 1]`
    pub fn validate(&self) -> Result<Vec<String>, CragError> {
        let mut warnings = Vec::new();

        if self.timeout_ms == 0 {
            return Err(zero_timeout_error());
        }

        match self.provider {
            JudgeProviderKind::Llm => {
                if self.timeout_ms < self.llm.request_timeout_ms {
                    warnings.push(format!(
                        "judge.timeout_ms={} is shorter than judge.llm.request_timeout_ms={}; retries will never complete",
                        self.timeout_ms, self.llm.request_timeout_ms
                    ));
                }
            }
            JudgeProviderKind::Lexical => {
                let overlap = self.lexical.min_overlap;
                if !(overlap > 0.0 && overlap <= 1.0) {
                    warnings.push(format!(
                        "judge.lexical.min_overlap={} should be in (0, 1]",
                        overlap
                    ));
                }
            }
        }

        Ok(warnings)
    }
}

// ============================================================================
// SearchConfig
// ============================================================================

/// External search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    /// Tavily web search API.
    #[default]
    Tavily,
    /// No fallback source; every fallback attempt fails and primary evidence is kept.
    None,
}

impl std::fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tavily => write!(f, "tavily"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for SearchProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tavily" | "web" => Ok(Self::Tavily),
            "none" | "off" | "disabled" => Ok(Self::None),
            other => Err(format!(
                "Unknown search provider: '{}'. Use 'tavily' or 'none'.",
                other
            )),
        }
    }
}

/// External search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProviderKind,

    /// Search API endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
}

fn default_search_endpoint() -> String {
    DEFAULT_TAVILY_ENDPOINT.to_string()
}
fn default_search_api_key_env() -> String {
    DEFAULT_SEARCH_API_KEY_ENV.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
        }
    }
}

impl SearchConfig {
    /// # Errors
    /// Returns an error if the Tavily provider has an empty endpoint.
    ///
    /// # Warnings
    /// - provider `none`: insufficient evidence is never supplemented
    pub fn validate(&self) -> Result<Vec<String>, CragError> {
        let mut warnings = Vec::new();

        match self.provider {
            SearchProviderKind::Tavily => {
                if self.endpoint.trim().is_empty() {
                    return Err(CragError::InvalidConfiguration {
                        message: "search.endpoint cannot be empty".to_string(),
                        hint: format!("Use the Tavily endpoint `{}`", DEFAULT_TAVILY_ENDPOINT),
                    });
                }
            }
            SearchProviderKind::None => warnings.push(
                "search.provider=none; insufficient evidence will never be supplemented"
                    .to_string(),
            ),
        }

        Ok(warnings)
    }
}

// ============================================================================
// LogConfig
// ============================================================================

/// Resolution log settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// JSONL file that receives one entry per resolved query. `~/` is expanded.
    #[serde(default)]
    pub resolution_log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = CragConfig::default();
        assert_eq!(config.gate.minimum_relevance_score, Some(0.5));
        assert_eq!(config.fallback.top_k_fallback_results, 3);
        assert_eq!(config.judge.provider, JudgeProviderKind::Lexical);
        assert_eq!(config.search.provider, SearchProviderKind::Tavily);
        assert!(config.validate().unwrap().is_empty());

        let controller = config.controller_config().unwrap();
        assert_eq!(controller.threshold().value(), 0.5);
        assert_eq!(controller.judge_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
gate:
  minimum_relevance_score: 0.2
judge:
  provider: llm
  llm:
    model: llama3
"#;
        let config = CragConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.threshold().unwrap().value(), 0.2);
        assert_eq!(config.fallback.search_timeout_ms, 10_000);
        assert_eq!(config.judge.provider, JudgeProviderKind::Llm);
        assert_eq!(config.judge.llm.model, "llama3");
        assert_eq!(config.judge.timeout_ms, 30_000);
        assert_eq!(config.judge.model_config().llm.model, "llama3");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = CragConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.gate.minimum_relevance_score, Some(0.5));
    }

    #[test]
    fn test_null_threshold_is_misconfiguration() {
        let config = CragConfig::from_yaml("gate:\n  minimum_relevance_score: null\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(CragError::GateMisconfiguration(_))
        ));
        assert!(matches!(
            config.controller_config(),
            Err(CragError::GateMisconfiguration(_))
        ));
    }

    #[test]
    fn test_out_of_range_threshold_is_misconfiguration() {
        let config = CragConfig::default().with_threshold(1.5);
        assert!(matches!(
            config.controller_config(),
            Err(CragError::GateMisconfiguration(_))
        ));
    }

    #[test]
    fn test_zero_top_k_is_invalid() {
        let config = CragConfig::default().with_top_k(0);
        assert!(matches!(
            config.validate(),
            Err(CragError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_zero_timeouts_are_invalid() {
        let mut config = CragConfig::default();
        config.judge.timeout_ms = 0;
        assert!(config.validate().is_err());
        assert!(config.controller_config().is_err());

        let mut config = CragConfig::default();
        config.fallback.search_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_warnings() {
        let mut config = CragConfig::default().with_threshold(1.0).with_top_k(50);
        config.search.provider = SearchProviderKind::None;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_from_path_missing_file_is_default() {
        let config = CragConfig::from_path(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(config.fallback.top_k_fallback_results, 3);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gate: [unclosed").unwrap();
        let err = CragConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, CragError::InvalidGlobalConfig(_)));
    }

    #[test]
    fn test_from_path_validates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gate:\n  minimum_relevance_score: -1").unwrap();
        let err = CragConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, CragError::GateMisconfiguration(_)));
    }

    #[test]
    fn test_read_path_defers_validation_to_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gate:\n  minimum_relevance_score: 1.5").unwrap();

        let config = CragConfig::read_path(file.path()).unwrap();
        assert!(matches!(
            config.clone().validated(),
            Err(CragError::GateMisconfiguration(_))
        ));

        let config = config.with_threshold(0.3).validated().unwrap();
        assert_eq!(config.gate.minimum_relevance_score, Some(0.3));
    }

    #[test]
    fn test_search_provider_parsing() {
        assert_eq!(
            "Tavily".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::Tavily
        );
        assert_eq!(
            "off".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::None
        );
        assert!("bing".parse::<SearchProviderKind>().is_err());
    }

    #[test]
    fn test_resolution_log_path() {
        let mut config = CragConfig::default();
        assert_eq!(config.resolution_log_path(), None);

        config.log.resolution_log = Some("/tmp/crag.jsonl".to_string());
        assert_eq!(
            config.resolution_log_path(),
            Some(PathBuf::from("/tmp/crag.jsonl"))
        );
    }
}
