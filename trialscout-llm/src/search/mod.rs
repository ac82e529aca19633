//! # Web search tools
//!
//! The agent offers one search tool to the model. A tool exposes its
//! definition (name, description, JSON schema) and runs a query, returning
//! text that is fed back to the model verbatim.

pub mod tavily;

pub use tavily::{TavilyConfig, TavilySearch};

use crate::provider::ToolDefinition;
use serde::Deserialize;
use trialscout_error::Result;

/// Arguments the model passes when calling a search tool
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

/// A search backend the agent can call
#[allow(async_fn_in_trait)]
pub trait SearchTool: Send + Sync {
    /// Tool definition advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run a query and render the results as model-readable text
    async fn search(&self, query: &str) -> Result<String>;
}

/// JSON schema shared by search tools taking a single `query` string
pub fn query_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query to look up"
            }
        },
        "required": ["query"]
    })
}
