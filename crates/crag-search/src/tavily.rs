//! Tavily search API client (blocking).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::normalize_content;
use crate::SearchError;

/// Default Tavily search endpoint.
pub const DEFAULT_TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// A single web search result, content already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: Option<String>,
    pub url: String,
    pub content: String,
    pub score: Option<f32>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f32>,
}

/// Blocking client for the Tavily search API.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl TavilyClient {
    /// Create a client with an explicit API key and request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a client reading the API key from `api_key_env`.
    pub fn from_env(
        endpoint: impl Into<String>,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SearchError::MissingApiKey(api_key_env.to_string()))?;
        Self::new(endpoint, api_key, timeout)
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Search the web for `query`, returning at most `max_results` results
    /// in provider order.
    ///
    /// The query is sent exactly as given.
    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, SearchError> {
        let body = SearchRequest {
            query,
            max_results,
            search_depth: "basic",
            include_answer: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .map_err(|e| SearchError::Request(e.to_string()))?;
        let results = parse_response(&text, max_results)?;

        debug!("Search returned {} results from {}", results.len(), self.endpoint);
        Ok(results)
    }
}

/// Decode a Tavily response body into normalized results.
fn parse_response(body: &str, max_results: usize) -> Result<Vec<WebResult>, SearchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;

    response
        .results
        .into_iter()
        .take(max_results)
        .map(|raw| {
            Ok(WebResult {
                title: raw.title.filter(|t| !t.trim().is_empty()),
                url: raw.url,
                content: normalize_content(&raw.content)?,
                score: raw.score,
            })
        })
        .collect()
}
