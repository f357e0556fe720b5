//! Adapter layer for crag-search.
//!
//! Wraps the web search client as a [`SearchCapability`] and converts its
//! errors into `CragError`.

use std::sync::Arc;
use std::time::Duration;

use crag_search::{SearchError, TavilyClient, WebResult};

use crate::config::{CragConfig, SearchProviderKind};
use crate::errors::CragError;
use crate::fallback::{SearchCapability, SearchHit};

/// Convert a crag-search error to a crag-core error.
pub fn from_search_error(err: SearchError) -> CragError {
    match err {
        SearchError::MissingApiKey(env_var) => CragError::ProviderUnavailable {
            provider: "tavily".to_string(),
            reason: format!("environment variable `{}` is not set", env_var),
        },
        other => CragError::fallback("tavily", other.to_string()),
    }
}

impl From<WebResult> for SearchHit {
    fn from(result: WebResult) -> Self {
        Self {
            content: result.content,
            url: Some(result.url).filter(|u| !u.is_empty()),
            title: result.title,
            score: result.score,
        }
    }
}

// ============================================================================
// WebSearch
// ============================================================================

/// Tavily web search as a fallback source.
#[derive(Debug)]
pub struct WebSearch {
    client: TavilyClient,
}

impl WebSearch {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

impl SearchCapability for WebSearch {
    fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        let results = self.client.search(query, top_k)?;
        Ok(results.into_iter().map(SearchHit::from).collect())
    }

    fn source_id(&self) -> &str {
        "tavily"
    }
}

// ============================================================================
// NoSearch
// ============================================================================

/// Fallback source used when search is disabled. Every call fails, so the
/// controller keeps primary evidence and flags `fallback_failed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSearch;

impl SearchCapability for NoSearch {
    fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        anyhow::bail!("fallback search is disabled (search.provider = none)")
    }

    fn source_id(&self) -> &str {
        "none"
    }
}

/// Build the search source selected in `config`.
///
/// # Errors
///
/// Returns [`CragError::ProviderUnavailable`] if the Tavily API key is missing.
pub fn create_search_capability(
    config: &CragConfig,
) -> Result<Arc<dyn SearchCapability>, CragError> {
    match config.search.provider {
        SearchProviderKind::Tavily => {
            let client = TavilyClient::from_env(
                config.search.endpoint.clone(),
                &config.search.api_key_env,
                Duration::from_millis(config.fallback.search_timeout_ms),
            )
            .map_err(from_search_error)?;
            tracing::debug!("Using Tavily search at {}", client.endpoint());
            Ok(Arc::new(WebSearch::new(client)))
        }
        SearchProviderKind::None => Ok(Arc::new(NoSearch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_result_conversion() {
        let hit = SearchHit::from(WebResult {
            title: Some("Contact".to_string()),
            url: "https://example.com".to_string(),
            content: "Call 555-1234".to_string(),
            score: Some(0.7),
        });
        assert_eq!(hit.content, "Call 555-1234");
        assert_eq!(hit.url.as_deref(), Some("https://example.com"));
        assert_eq!(hit.title.as_deref(), Some("Contact"));

        let hit = SearchHit::from(WebResult {
            title: None,
            url: String::new(),
            content: "x".to_string(),
            score: None,
        });
        assert_eq!(hit.url, None);
    }

    #[test]
    fn test_no_search_always_fails() {
        let err = NoSearch.search("q", 3).unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_create_none_provider() {
        let mut config = CragConfig::default();
        config.search.provider = SearchProviderKind::None;
        let search = create_search_capability(&config).unwrap();
        assert_eq!(search.source_id(), "none");
    }

    #[test]
    fn test_create_tavily_without_key_is_unavailable() {
        let mut config = CragConfig::default();
        config.search.api_key_env = "CRAG_CORE_SEARCH_KEY_NEVER_SET".to_string();
        let err = create_search_capability(&config).err().unwrap();
        assert!(matches!(err, CragError::ProviderUnavailable { .. }));
    }

    #[test]
    fn test_search_error_conversion() {
        let err = from_search_error(SearchError::Status {
            status: 429,
            body: "slow down".to_string(),
        });
        assert!(matches!(err, CragError::FallbackRetrieval { .. }));
        assert!(err.to_string().contains("429"));
    }
}
