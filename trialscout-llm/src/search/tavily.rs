//! Tavily search client
//!
//! API docs: https://docs.tavily.com/documentation/api-reference/endpoint/search

use super::{query_schema, SearchTool};
use crate::provider::ToolDefinition;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trialscout_error::{Error, ErrorKind, Result};

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Tavily client configuration
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_results: usize,
    /// "general" or "news"
    pub topic: String,
    pub timeout_secs: u64,
}

impl Default for TavilyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: TAVILY_BASE_URL.to_string(),
            max_results: 3,
            topic: "general".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Web search through the Tavily API
pub struct TavilySearch {
    client: Client,
    config: TavilyConfig,
}

impl TavilySearch {
    pub const NAME: &'static str = "tavily_search";

    pub fn new(config: TavilyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                Error::new(ErrorKind::Unexpected, "failed to create HTTP client")
                    .with_operation("tavily::new")
                    .set_source(e)
            })?;

        Ok(Self { client, config })
    }
}

impl SearchTool for TavilySearch {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Useful for finding official API documentation, pricing and trial pages. \
             Input should be a search query.",
        )
        .with_parameters(query_schema())
    }

    async fn search(&self, query: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::search_failed(query, "TAVILY_API_KEY is not configured")
                    .with_operation("tavily::search")
                    .permanent()
            })?;

        let body = TavilyRequest {
            query,
            topic: &self.config.topic,
            max_results: self.config.max_results,
        };

        debug!(query, "tavily search");

        let response = self
            .client
            .post(format!("{}/search", self.config.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::search_failed(query, format!("HTTP request failed: {}", e))
                    .with_operation("tavily::search")
                    .set_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::search_failed(query, format!("Tavily returned {}: {}", status, text))
                .with_operation("tavily::search")
                .with_context("status", status.as_u16().to_string()));
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            Error::search_failed(query, format!("failed to decode response: {}", e))
                .with_operation("tavily::search")
                .set_source(e)
        })?;

        info!(query, results = parsed.results.len(), "tavily search finished");
        render_results(query, &parsed)
    }
}

/// Render results as compact JSON for the model
fn render_results(query: &str, response: &TavilyResponse) -> Result<String> {
    let rendered = RenderedResults {
        query,
        answer: response.answer.as_deref(),
        results: response
            .results
            .iter()
            .map(|hit| RenderedHit {
                title: &hit.title,
                url: &hit.url,
                content: &hit.content,
            })
            .collect(),
    };

    serde_json::to_string(&rendered).map_err(|e| {
        Error::new(ErrorKind::SerializationFailed, "failed to render search results")
            .with_operation("tavily::render_results")
            .set_source(e)
    })
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    topic: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct RenderedResults<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<&'a str>,
    results: Vec<RenderedHit<'a>>,
}

#[derive(Serialize)]
struct RenderedHit<'a> {
    title: &'a str,
    url: &'a str,
    content: &'a str,
}
