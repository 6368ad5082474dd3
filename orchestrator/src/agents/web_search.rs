// Web Search: live search fallback when local retrieval keeps missing

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SearchWeb;
use crate::config::Config;
use crate::models::Document;

pub struct WebSearchAgent {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    max_results: usize,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: String,
}

impl WebSearchAgent {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.web_search_url.clone(),
            api_key: config.tavily_api_key.clone(),
            max_results: config.web_search_results,
        }
    }
}

/// Folds search snippets into a single document, newline separated. No snippets gives
/// an empty document.
pub fn snippets_to_document(snippets: &[String]) -> Document {
    Document::new(snippets.join("\n")).with_metadata("source", "web_search")
}

#[async_trait]
impl SearchWeb for WebSearchAgent {
    async fn web_search(&self, question: &str) -> Result<Vec<String>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("web search is not configured (TAVILY_API_KEY)"))?;

        let request = SearchRequest {
            api_key,
            query: question,
            max_results: self.max_results,
        };
        let response: SearchResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!("Web search: {} results for '{}'", response.results.len(), question);
        Ok(response.results.into_iter().map(|result| result.content).collect())
    }
}
