//! # Trialscout Agent
//!
//! Researches SaaS systems in small batches through a search-capable agent:
//! 1. Names are split into fixed-size batches
//! 2. Each batch becomes one research request
//! 3. The agent searches the web and answers with a JSON array
//! 4. Replies are fence-stripped, parsed and accumulated
//! 5. Failed agent calls ask the operator whether to keep going
//! 6. Completed records are reported and exported as a sheet

pub mod agent;
pub mod batch;
pub mod config;
pub mod export;
pub mod ledger;
pub mod normalize;
pub mod policy;
pub mod prompt;
pub mod scanner;

pub use agent::{AgentAnswer, AgentConfig, ResearchAgent, ToolAgent};
pub use batch::{clean_names, split_batches, Batch};
pub use config::ScoutConfig;
pub use export::{export_records, write_skip_report, ExportFormat};
pub use ledger::{Accumulation, Missing, Rejected, ResultRecord, ScanLedger, SkipReason, Skipped};
pub use normalize::{parse_records, strip_fences};
pub use policy::{parse_answer, AlwaysContinue, ContinuePolicy, Continuation};
pub use prompt::{ResearchPrompt, SchemaField};
pub use scanner::{ScanEvent, ScanOptions, ScanReport, ScanState, Scanner};
