//! Optional web research for the prompt.
//!
//! Before a prompt is built the pipeline may ask a search API for a handful of results
//! related to the chosen category and purpose. Their titles and snippets are handed to
//! the template as background. The lookup is best effort: any failure is logged and
//! contributes nothing, so it can never fail a generation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One organic search hit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
}

/// Something that can look up background material for a query.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Return at most `limit` results for `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, String>;
}

/// Serper.dev (Google results) client.
pub struct SerperSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SerperSearch {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl WebSearch for SerperSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, String> {
        debug!("Searching '{}' at {}", query, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query })
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("search returned status {status}"));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid search response: {e}"))?;

        Ok(body.organic.into_iter().take(limit).collect())
    }
}

/// Query used for a category/purpose pair.
pub fn research_query(category: &str, purpose: &str) -> String {
    format!("{} {}", category.trim(), purpose.trim())
        .trim()
        .to_string()
}

/// Render results as `- {title}: {snippet}` lines.
pub fn format_research(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("- {}: {}", r.title.trim(), r.snippet.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the lookup and format it, degrading to an empty string on any failure.
pub async fn gather_research(
    search: &dyn WebSearch,
    category: &str,
    purpose: &str,
    limit: usize,
) -> String {
    let query = research_query(category, purpose);
    if query.is_empty() || limit == 0 {
        return String::new();
    }

    match search.search(&query, limit).await {
        Ok(results) => {
            info!("Web research returned {} results", results.len());
            format_research(&results)
        }
        Err(e) => {
            warn!("Web research failed, continuing without it: {}", e);
            String::new()
        }
    }
}
