//! Agent implementation - model <-> search tool loop

use tracing::{debug, info, warn};
use trialscout_error::{Error, ErrorKind, Result};
use trialscout_llm::{
    ChatMessage, CompletionRequest, LlmProvider, Role, SearchArgs, SearchTool, ToolCall,
    UsageTracker,
};

/// Final answer of one agent invocation
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    /// Content of the last model turn
    pub text: String,
    /// Tool names in the order they were called
    pub tools_used: Vec<String>,
    /// Model calls made
    pub steps: usize,
    pub usage: UsageTracker,
}

/// Anything that turns a research request into final answer text
#[allow(async_fn_in_trait)]
pub trait ResearchAgent {
    async fn research(&self, request: &str) -> Result<AgentAnswer>;
}

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model override; the provider's default when unset
    pub model: Option<String>,
    /// Messages kept before each model call (0 keeps everything)
    pub history_window: usize,
    /// Maximum model calls per request
    pub max_steps: usize,
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            history_window: 6,
            max_steps: 25,
            temperature: None,
        }
    }
}

/// A chat model bound to one search tool.
///
/// Each request starts a fresh conversation. The model is called with the
/// most recent messages; while it asks for tools, the calls are executed and
/// their results appended. The first turn without tool calls is the answer.
pub struct ToolAgent<P, S> {
    provider: P,
    search: S,
    config: AgentConfig,
}

impl<P: LlmProvider, S: SearchTool> ToolAgent<P, S> {
    pub fn new(provider: P, search: S) -> Self {
        Self::with_config(provider, search, AgentConfig::default())
    }

    pub fn with_config(provider: P, search: S, config: AgentConfig) -> Self {
        Self {
            provider,
            search,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Run one tool call. Failures become the tool message so the model can react.
    async fn run_tool_call(&self, call: &ToolCall) -> String {
        let definition = self.search.definition();
        if call.name != definition.name {
            warn!(tool = %call.name, "model requested unknown tool");
            return format!("Error: unknown tool '{}'", call.name);
        }

        let args: SearchArgs = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => return format!("Error: invalid arguments for {}: {}", call.name, e),
        };

        match self.search.search(&args.query).await {
            Ok(results) => results,
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool call failed");
                format!("Error: {}", err.message())
            }
        }
    }
}

impl<P: LlmProvider, S: SearchTool> ResearchAgent for ToolAgent<P, S> {
    async fn research(&self, request: &str) -> Result<AgentAnswer> {
        let model = self.model().to_string();
        let tools = vec![self.search.definition()];
        let mut messages = vec![ChatMessage::user(request)];
        let mut tools_used = Vec::new();
        let mut usage = UsageTracker::new();

        for step in 1..=self.config.max_steps {
            let window = recent_window(&messages, self.config.history_window);
            let mut completion = CompletionRequest::new(window)
                .with_model(model.clone())
                .with_tools(tools.clone());
            if let Some(temp) = self.config.temperature {
                completion = completion.with_temperature(temp);
            }

            let response = self
                .provider
                .complete(completion)
                .await
                .map_err(|e| {
                    e.into_error(self.provider.name())
                        .with_operation("agent::research")
                        .with_context("model", model.clone())
                        .with_context("step", step.to_string())
                })?;
            usage.track(&model, &response.usage);

            if response.tool_calls.is_empty() {
                let text = response.content.unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(Error::inference_failed("model returned an empty answer")
                        .with_operation("agent::research")
                        .with_context("model", model)
                        .with_context("step", step.to_string()));
                }
                info!(steps = step, tools = tools_used.len(), "agent answered");
                return Ok(AgentAnswer {
                    text,
                    tools_used,
                    steps: step,
                    usage,
                });
            }

            debug!(step, calls = response.tool_calls.len(), "model requested tools");
            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.run_tool_call(call).await;
                tools_used.push(call.name.clone());
                messages.push(ChatMessage::tool_result(&call.id, result));
            }
        }

        Err(Error::new(
            ErrorKind::ToolLoopExceeded,
            format!("no final answer after {} model calls", self.config.max_steps),
        )
        .with_operation("agent::research")
        .with_context("model", model)
        .with_context("tools_called", tools_used.len().to_string()))
    }
}

/// The last `window` messages, never starting on a tool result whose
/// requesting assistant turn was cut off.
pub fn recent_window(messages: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let start = if window == 0 {
        0
    } else {
        messages.len().saturating_sub(window)
    };

    messages[start..]
        .iter()
        .skip_while(|m| m.role == Role::Tool)
        .cloned()
        .collect()
}
