//! # trialscout-llm
//!
//! Clients for the two external services the research agent talks to.
//!
//! ## Core Concepts
//! - **Provider**: Trait-based chat completion (OpenAI wire format, used for OpenRouter)
//! - **Search**: Trait-based web search tools offered to the model (Tavily)
//! - **Usage**: Token accounting across calls

pub mod provider;
pub mod search;

pub use trialscout_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    LlmProvider, ProviderConfig, ProviderError,
    ChatMessage, Role, CompletionRequest, CompletionResponse,
    ToolDefinition, ToolCall,
    FinishReason, Usage, UsageTracker,
    OpenAIProvider, OPENROUTER_BASE_URL,
};
pub use search::{SearchArgs, SearchTool, TavilyConfig, TavilySearch};
