//! # LLM Provider Interface
//!
//! A trait-based abstraction for talking to chat-completion backends.
//!
//! ## Design
//! - `LlmProvider` trait defines the core interface
//! - `OpenAIProvider` speaks the OpenAI wire format (pointed at OpenRouter)
//! - Tool/function calling support
//! - Usage tracking

pub mod openai;

pub use openai::OpenAIProvider;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trialscout_error::{Error, ErrorKind};

// ============================================================================
// Core Types
// ============================================================================

/// A chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant turn that requested tools. Content is usually empty here.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool/function that the model can call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as JSON
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Request parameters for a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Unknown,
}

impl FinishReason {
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Invalid request
    InvalidRequest(String),
    /// Model not found
    ModelNotFound(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Self::ModelNotFound(m) => write!(f, "Model not found: {}", m),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Convert into the crate-wide error, tagging the provider that failed.
    pub fn into_error(self, provider: &str) -> Error {
        let message = self.to_string();
        let err = match &self {
            Self::Network(_) => Error::new(ErrorKind::NetworkFailed, message),
            Self::Api { status, .. } if *status >= 500 => {
                Error::new(ErrorKind::ProviderUnavailable, message)
                    .with_context("status", status.to_string())
            }
            Self::Api { status, .. } => Error::new(ErrorKind::InferenceFailed, message)
                .with_context("status", status.to_string())
                .permanent(),
            Self::RateLimited { retry_after } => {
                let err = Error::new(ErrorKind::RateLimited, message);
                match retry_after {
                    Some(secs) => err.with_context("retry_after", secs.to_string()),
                    None => err,
                }
            }
            Self::AuthenticationFailed => Error::new(ErrorKind::AuthenticationFailed, message),
            Self::InvalidRequest(_) | Self::ModelNotFound(_) => {
                Error::new(ErrorKind::InferenceFailed, message).permanent()
            }
            Self::Parse(_) | Self::Other(_) => Error::new(ErrorKind::InferenceFailed, message),
        };
        err.with_operation("provider::complete")
            .with_context("provider", provider)
            .set_source(self)
    }
}

/// The main LLM provider trait
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "openrouter")
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Send a completion request and get a full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

// ============================================================================
// Provider Configuration
// ============================================================================

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Reported by `LlmProvider::name` and attached to errors
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// OpenRouter speaks the OpenAI wire format. A missing key is allowed here;
    /// the first request then fails with `AuthenticationFailed`.
    pub fn openrouter(api_key: Option<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("X-Title".into(), "trialscout".into());

        Self {
            name: "openrouter".into(),
            api_key,
            base_url: Some(OPENROUTER_BASE_URL.into()),
            default_model: Some("openai/gpt-4o-mini".into()),
            headers,
            timeout_secs: Some(180),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

// ============================================================================
// Usage Tracking
// ============================================================================

/// Tracks token usage across multiple calls
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub by_model: HashMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.total_calls += 1;
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    /// Fold another tracker into this one
    pub fn merge(&mut self, other: &UsageTracker) {
        self.total_calls += other.total_calls;
        self.total_prompt_tokens += other.total_prompt_tokens;
        self.total_completion_tokens += other.total_completion_tokens;
        for (model, usage) in &other.by_model {
            let entry = self.by_model.entry(model.clone()).or_default();
            entry.prompt_tokens += usage.prompt_tokens;
            entry.completion_tokens += usage.completion_tokens;
            entry.total_tokens += usage.total_tokens;
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let user = ChatMessage::user("Hello");
        assert_eq!(user.role, Role::User);
        assert!(user.tool_calls.is_none());

        let call = ToolCall {
            id: "call_1".into(),
            name: "tavily_search".into(),
            arguments: r#"{"query":"close api"}"#.into(),
        };
        let asst = ChatMessage::assistant_tool_calls(None, vec![call]);
        assert_eq!(asst.role, Role::Assistant);
        assert_eq!(asst.tool_calls.as_ref().map(Vec::len), Some(1));

        let tool = ChatMessage::tool_result("call_1", "[]");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_tool_call_arguments() {
        #[derive(Deserialize)]
        struct Args {
            query: String,
        }

        let call = ToolCall {
            id: "call_1".into(),
            name: "tavily_search".into(),
            arguments: r#"{"query":"pipedrive users api"}"#.into(),
        };
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.query, "pipedrive users api");
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new(vec![ChatMessage::user("Hello")])
            .with_model("openai/gpt-4o-mini")
            .with_temperature(0.2)
            .with_tools(vec![ToolDefinition::new("tavily_search", "Search the web")]);

        assert_eq!(request.model, Some("openai/gpt-4o-mini".into()));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::openrouter(None);
        assert_eq!(config.name, "openrouter");
        assert_eq!(config.base_url.as_deref(), Some(OPENROUTER_BASE_URL));
        assert_eq!(config.headers["X-Title"], "trialscout");
        assert!(config.api_key.is_none());

        let config = ProviderConfig::openrouter(Some("sk-or".into()))
            .with_model("openai/gpt-4o")
            .with_base_url("http://localhost:8080/v1");
        assert_eq!(config.default_model, Some("openai/gpt-4o".into()));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn test_provider_error_conversion() {
        let err = ProviderError::AuthenticationFailed.into_error("openrouter");
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert_eq!(err.context_value("provider"), Some("openrouter"));

        let err = ProviderError::Api { status: 503, message: "down".into() }.into_error("openai");
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.is_retryable());

        let err = ProviderError::Api { status: 400, message: "bad".into() }.into_error("openai");
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(!err.is_retryable());

        let err = ProviderError::RateLimited { retry_after: Some(30) }.into_error("openai");
        assert_eq!(err.context_value("retry_after"), Some("30"));
        assert!(err.kind().is_transport());
    }

    #[test]
    fn test_usage_tracker() {
        let mut tracker = UsageTracker::new();

        tracker.track("openai/gpt-4o-mini", &Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        });

        let mut other = UsageTracker::new();
        other.track("openai/gpt-4o-mini", &Usage {
            prompt_tokens: 200,
            completion_tokens: 100,
            total_tokens: 300,
        });
        tracker.merge(&other);

        assert_eq!(tracker.total_calls, 2);
        assert_eq!(tracker.total_prompt_tokens, 300);
        assert_eq!(tracker.total_completion_tokens, 150);
        assert_eq!(tracker.total_tokens(), 450);
        assert_eq!(tracker.by_model["openai/gpt-4o-mini"].total_tokens, 450);
    }
}
