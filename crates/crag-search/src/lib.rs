//! Web search client for CRAG
//!
//! This crate talks to the external web search API used for fallback
//! retrieval. It isolates the HTTP stack (reqwest) and HTML cleanup (htmd)
//! from the decision core.

use thiserror::Error;

pub mod content;
pub mod tavily;

pub use content::normalize_content;
pub use tavily::{TavilyClient, WebResult, DEFAULT_TAVILY_ENDPOINT};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search API key not found: environment variable `{0}` is not set")]
    MissingApiKey(String),

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode search response: {0}")]
    Decode(String),
}
