//! # Trialscout CLI
//!
//! Command-line interface for the batch research agent.
//!
//! Usage:
//!   trialscout scan <NAMES>...
//!   trialscout scan --file <systems.txt>
//!   trialscout ask
//!   trialscout prompt <NAMES>...
//!
//! Examples:
//!   trialscout scan Close PipeDrive "SmartBear SwaggerHub"
//!   trialscout scan -f systems.txt -b 2 --delay-secs 10 -o trials.csv
//!   trialscout scan -f systems.txt --yes --skipped-out skipped.json
//!   trialscout prompt Avalara
//!
//! Settings come from the environment (a `.env` file is loaded first);
//! flags override them.

use clap::{Args, Parser, Subcommand};
use console::Term;
use dialoguer::Input;
use std::io::{self, BufRead, BufReader, Stdin, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trialscout_agent::{
    clean_names, export_records, parse_answer, write_skip_report, AlwaysContinue, Batch,
    ContinuePolicy, Continuation, ResearchAgent, ResearchPrompt, ScanEvent, ScanOptions,
    ScanReport, Scanner, ScoutConfig, ToolAgent,
};
use trialscout_error::{Error, ErrorKind, Result};
use trialscout_llm::{OpenAIProvider, TavilySearch};

#[derive(Parser)]
#[command(name = "trialscout")]
#[command(author, version, about = "trialscout - user-management APIs and free trials of SaaS systems")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - no per-record dumps
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research systems in batches and export the results
    Scan(ScanArgs),
    /// Research one system at a time until `.exit`
    Ask {
        /// Model to use instead of TRIALSCOUT_MODEL
        #[arg(long)]
        model: Option<String>,
    },
    /// Print the request that would be sent for these names
    Prompt {
        #[arg(required = true)]
        names: Vec<String>,

        /// JSON object of output fields and example values
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// System names to research
    names: Vec<String>,

    /// Read names from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Systems per agent request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Seconds to wait between batches (0 disables)
    #[arg(long)]
    delay_secs: Option<u64>,

    /// Export path; `.json` writes JSON, anything else a CSV sheet
    #[arg(short, long, default_value = "saas_trials.csv")]
    output: PathBuf,

    /// Don't write the export file
    #[arg(long)]
    no_export: bool,

    /// Also write skipped and missing names as JSON
    #[arg(long)]
    skipped_out: Option<PathBuf>,

    /// JSON object of output fields and example values
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Model to use instead of TRIALSCOUT_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Keep going after failed batches without asking
    #[arg(short, long)]
    yes: bool,

    /// Don't report names missing from replies
    #[arg(long)]
    no_coverage: bool,
}

const CONTINUE_PROMPT: &str = "continue scanning further batches? y/n";

/// Asks the operator after each failed batch.
///
/// On a terminal the question goes through dialoguer; otherwise (or if the
/// terminal prompt fails) one line is read from `input`.
struct InteractivePolicy<R> {
    terminal: bool,
    input: R,
}

impl InteractivePolicy<BufReader<Stdin>> {
    fn stdin() -> Self {
        Self {
            terminal: Term::stderr().is_term(),
            input: BufReader::new(io::stdin()),
        }
    }
}

impl<R: BufRead> InteractivePolicy<R> {
    fn ask(&mut self) -> Result<String> {
        if self.terminal {
            match Input::<String>::new()
                .with_prompt(CONTINUE_PROMPT)
                .allow_empty(true)
                .interact_text()
            {
                Ok(answer) => return Ok(answer),
                Err(e) => debug!(error = %e, "terminal prompt unavailable, reading a line instead"),
            }
        }
        eprint!("{}: ", CONTINUE_PROMPT);
        let _ = io::stderr().flush();
        read_answer(&mut self.input)
    }
}

impl<R: BufRead> ContinuePolicy for InteractivePolicy<R> {
    fn decide(&mut self, _batch: &Batch, _error: &Error) -> Continuation {
        match self.ask() {
            Ok(answer) => parse_answer(&answer),
            Err(e) => {
                warn!(error = %e, "could not read the operator's answer, continuing");
                Continuation::Continue
            }
        }
    }
}

/// One line of operator input; EOF reads as an empty answer
fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).map_err(|e| {
        Error::new(ErrorKind::PromptFailed, format!("failed to read answer: {}", e))
            .with_operation("cli::read_answer")
            .set_source(e)
    })?;
    Ok(line)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "trialscout=debug"
    } else if quiet {
        "trialscout=warn"
    } else {
        "trialscout=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn build_agent(config: &ScoutConfig) -> Result<ToolAgent<OpenAIProvider, TavilySearch>> {
    let provider = OpenAIProvider::new(config.provider_config())
        .map_err(|e| e.into_error("openrouter"))?;
    let search = TavilySearch::new(config.tavily_config())?;
    Ok(ToolAgent::with_config(provider, search, config.agent_config()))
}

fn load_prompt(schema: Option<&Path>) -> Result<ResearchPrompt> {
    let Some(path) = schema else {
        return Ok(ResearchPrompt::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
    ResearchPrompt::from_schema_json(&text)
}

/// Names from the command line followed by names from `file`
fn read_names(args: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut names = clean_names(args);
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        names.extend(clean_names(text.lines()));
    }
    if names.is_empty() {
        return Err(Error::invalid_argument("no system names given; pass names or --file"));
    }
    Ok(names)
}

fn print_event(event: &ScanEvent<'_>, quiet: bool) {
    match event {
        ScanEvent::BatchStarted { batch, total } => {
            println!("Processing batch {}/{}: {}", batch.index + 1, total, batch.label());
        }
        ScanEvent::Answered { answer, .. } => {
            if !quiet && !answer.tools_used.is_empty() {
                println!("  tools used: {}", answer.tools_used.join(", "));
            }
        }
        ScanEvent::RecordAccepted { record } => {
            if !quiet {
                println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
            }
        }
        ScanEvent::ShapeFailed { batch, error } => {
            println!("Could not use the reply for {}: {}", batch.label(), error.message());
            if let Some(raw) = error.context_value("raw") {
                println!("Raw response:\n{}", raw);
            }
        }
        ScanEvent::TransportFailed { batch, error } => {
            eprintln!("Error processing batch {}: {}", batch.label(), error);
        }
        ScanEvent::Waiting { delay } => {
            if !quiet {
                println!("Waiting {}s before the next batch...\n", delay.as_secs());
            }
        }
    }
}

async fn scan_with<P: ContinuePolicy>(
    agent: ToolAgent<OpenAIProvider, TavilySearch>,
    policy: P,
    prompt: ResearchPrompt,
    options: ScanOptions,
    names: &[String],
    quiet: bool,
) -> Result<ScanReport> {
    let mut scanner = Scanner::new(agent, policy, prompt, options)
        .with_event_callback(move |event| print_event(event, quiet));
    scanner.run(names).await
}

async fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut config = ScoutConfig::from_env()?;
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(secs) = args.delay_secs {
        config.delay_secs = secs;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    config.validate()?;

    let names = read_names(&args.names, args.file.as_deref())?;
    let prompt = load_prompt(args.schema.as_deref())?;
    let agent = build_agent(&config)?;
    let options = ScanOptions {
        batch_size: config.batch_size,
        delay: config.delay(),
        check_coverage: !args.no_coverage,
    };

    info!(model = %config.model, names = names.len(), batch_size = config.batch_size, "scan configured");
    println!("Researching {} systems in batches of {}\n", names.len(), config.batch_size);

    let report = if args.yes {
        scan_with(agent, AlwaysContinue, prompt, options, &names, quiet).await?
    } else {
        scan_with(agent, InteractivePolicy::stdin(), prompt, options, &names, quiet).await?
    };

    println!("\n{}", report.summary());

    let output = (!args.no_export).then_some(args.output.as_path());
    if write_outputs(&report, output, args.skipped_out.as_deref()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Export records, then the skip report. Each failure is reported and the
/// other file is still attempted. Returns whether everything was written.
fn write_outputs(report: &ScanReport, output: Option<&Path>, skipped_out: Option<&Path>) -> bool {
    let mut ok = true;

    if let Some(path) = output {
        match export_records(report.ledger.completed(), path) {
            Ok(rows) => println!("Exported {} records to {}", rows, path.display()),
            Err(e) => {
                eprintln!("Export failed: {}", e);
                ok = false;
            }
        }
    }

    if let Some(path) = skipped_out {
        match write_skip_report(report.ledger.skipped(), report.ledger.missing(), path) {
            Ok(()) => println!("Skipped systems written to {}", path.display()),
            Err(e) => {
                eprintln!("Skip report failed: {}", e);
                ok = false;
            }
        }
    }

    ok
}

async fn run_ask(model: Option<String>) -> Result<ExitCode> {
    let mut config = ScoutConfig::from_env()?;
    if let Some(model) = model {
        config.model = model;
    }
    let agent = build_agent(&config)?;
    let prompt = ResearchPrompt::default();

    println!("Type a system name to research, or .exit to quit.\n");
    loop {
        let Ok(line) = Input::<String>::new().with_prompt("target system").interact_text() else {
            break;
        };
        let name = line.trim();
        if name == ".exit" {
            break;
        }
        if name.is_empty() {
            continue;
        }

        match agent.research(&prompt.render(&[name.to_string()])).await {
            Ok(answer) => {
                println!("\n--- Final AI Response ---\n");
                println!("{}\n", answer.text);
                if answer.tools_used.is_empty() {
                    println!("Tools used: none\n");
                } else {
                    println!("Tools used: {}\n", answer.tools_used.join(", "));
                }
            }
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn show_prompt(names: &[String], schema: Option<&Path>) -> Result<ExitCode> {
    let prompt = load_prompt(schema)?;
    println!("{}", prompt.render(&clean_names(names)));
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env");
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let outcome = match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet).await,
        Commands::Ask { model } => run_ask(model).await,
        Commands::Prompt { names, schema } => show_prompt(&names, schema.as_deref()),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
