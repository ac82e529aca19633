//! Example: one model turn with the web search tool offered
//!
//! Run with:
//!   # Let the model decide whether to search:
//!   OPENROUTER_API_KEY=sk-xxx TAVILY_API_KEY=tvly-xxx \
//!     cargo run -p trialscout-llm --example search_turn -- "Close CRM user API"
//!
//!   # Only run the search and print the rendered tool result:
//!   TAVILY_API_KEY=tvly-xxx cargo run -p trialscout-llm --example search_turn -- --search-only "Close CRM"

use std::env;
use trialscout_llm::{
    ChatMessage, CompletionRequest, LlmProvider, OpenAIProvider, ProviderConfig, SearchTool,
    TavilyConfig, TavilySearch,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let search_only = args.iter().any(|arg| arg == "--search-only");
    let query: Vec<&str> = args
        .iter()
        .filter(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .collect();
    let query = if query.is_empty() {
        "Close CRM user management API free trial".to_string()
    } else {
        query.join(" ")
    };

    let search = TavilySearch::new(TavilyConfig {
        api_key: env::var("TAVILY_API_KEY").ok(),
        ..TavilyConfig::default()
    })?;

    if search_only {
        println!("{}", search.search(&query).await?);
        return Ok(());
    }

    let provider = OpenAIProvider::new(ProviderConfig::openrouter(env::var("OPENROUTER_API_KEY").ok()))?;
    println!("Using {} ({})...", provider.name(), provider.default_model());

    let request = CompletionRequest::new(vec![ChatMessage::user(format!(
        "Use web search if needed: {}",
        query
    ))])
    .with_tools(vec![search.definition()]);

    let response = provider.complete(request).await?;

    if response.tool_calls.is_empty() {
        println!("{}", response.content.unwrap_or_default());
    } else {
        for call in &response.tool_calls {
            println!("model called {} with {}", call.name, call.arguments);
            let args = call.parse_arguments::<trialscout_llm::SearchArgs>()?;
            println!("{}", search.search(&args.query).await?);
        }
    }
    println!(
        "\ntokens: {} prompt / {} completion",
        response.usage.prompt_tokens, response.usage.completion_tokens
    );
    Ok(())
}
