//! The batch loop: split, research, normalize, accumulate, report

use crate::agent::{AgentAnswer, ResearchAgent};
use crate::batch::{split_batches, Batch};
use crate::ledger::{Accumulation, ResultRecord, ScanLedger};
use crate::normalize::parse_records;
use crate::policy::{ContinuePolicy, Continuation};
use crate::prompt::ResearchPrompt;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use trialscout_error::{Error, Result};
use trialscout_llm::UsageTracker;

/// Knobs for one scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub batch_size: usize,
    /// Pause between batches to stay under the provider's request rate
    pub delay: Duration,
    /// Report requested names that come back without a record
    pub check_coverage: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            delay: Duration::from_secs(5),
            check_coverage: true,
        }
    }
}

/// Where a run is. Batch numbers are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    ProcessingBatch(usize),
    Accumulated(usize),
    SkippedTransport(usize),
    SkippedParse(usize),
    /// Operator stopped the run after a failure
    Halted,
    /// Every batch was attempted
    Done,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::ProcessingBatch(i) => write!(f, "processing batch {}", i + 1),
            ScanState::Accumulated(i) => write!(f, "accumulated batch {}", i + 1),
            ScanState::SkippedTransport(i) => write!(f, "skipped batch {} (agent failure)", i + 1),
            ScanState::SkippedParse(i) => write!(f, "skipped batch {} (unusable reply)", i + 1),
            ScanState::Halted => write!(f, "halted"),
            ScanState::Done => write!(f, "done"),
        }
    }
}

/// Progress notifications for the console
#[derive(Debug)]
pub enum ScanEvent<'a> {
    BatchStarted { batch: &'a Batch, total: usize },
    Answered { batch: &'a Batch, answer: &'a AgentAnswer },
    RecordAccepted { record: &'a ResultRecord },
    ShapeFailed { batch: &'a Batch, error: &'a Error },
    TransportFailed { batch: &'a Batch, error: &'a Error },
    Waiting { delay: Duration },
}

/// Everything a finished (or halted) run produced
#[derive(Debug)]
pub struct ScanReport {
    pub ledger: ScanLedger,
    pub final_state: ScanState,
    /// Every state the run passed through, starting at `Idle`
    pub trace: Vec<ScanState>,
    pub batches_total: usize,
    pub batches_attempted: usize,
    pub usage: UsageTracker,
}

impl ScanReport {
    pub fn halted(&self) -> bool {
        self.final_state == ScanState::Halted
    }

    /// Human-readable end-of-run summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Scan {}: {} of {} batches attempted",
            self.final_state, self.batches_attempted, self.batches_total
        )];
        lines.push(format!(
            "  completed: {}  skipped: {}  rejected: {}  missing: {}",
            self.ledger.completed().len(),
            self.ledger.skipped().len(),
            self.ledger.rejected().len(),
            self.ledger.missing().len(),
        ));
        if !self.ledger.skipped().is_empty() {
            lines.push(format!("  skipped: {}", self.ledger.skipped_labels().join(" | ")));
        }
        if !self.ledger.missing().is_empty() {
            let names: Vec<&str> = self.ledger.missing().iter().map(|m| m.name.as_str()).collect();
            lines.push(format!("  missing: {}", names.join(", ")));
        }
        if self.usage.total_calls > 0 {
            lines.push(format!(
                "  model calls: {}  tokens: {}",
                self.usage.total_calls,
                self.usage.total_tokens()
            ));
        }
        lines.join("\n")
    }
}

type EventCallback = Box<dyn FnMut(&ScanEvent<'_>) + Send>;

/// Drives batches through the agent strictly one after another.
pub struct Scanner<A, P> {
    agent: A,
    policy: P,
    prompt: ResearchPrompt,
    options: ScanOptions,
    on_event: Option<EventCallback>,
}

impl<A: ResearchAgent, P: ContinuePolicy> Scanner<A, P> {
    pub fn new(agent: A, policy: P, prompt: ResearchPrompt, options: ScanOptions) -> Self {
        Self {
            agent,
            policy,
            prompt,
            options,
            on_event: None,
        }
    }

    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ScanEvent<'_>) + Send + 'static,
    {
        self.on_event = Some(Box::new(callback));
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn emit(&mut self, event: ScanEvent<'_>) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(&event);
        }
    }

    /// Process every name. Only an invalid batch size fails the run itself;
    /// per-batch problems end up in the report.
    pub async fn run(&mut self, names: &[String]) -> Result<ScanReport> {
        let batches = split_batches(names, self.options.batch_size)
            .map_err(|e| e.with_operation("scanner::run"))?;
        let total = batches.len();
        let coverage_key = self
            .options
            .check_coverage
            .then(|| self.prompt.name_key().to_string());

        let mut ledger = ScanLedger::new();
        let mut usage = UsageTracker::new();
        let mut trace = vec![ScanState::Idle];
        let mut attempted = 0;
        let mut halted = false;

        info!(names = names.len(), batches = total, "starting scan");

        for batch in &batches {
            trace.push(ScanState::ProcessingBatch(batch.index));
            attempted += 1;
            self.emit(ScanEvent::BatchStarted { batch, total });
            info!(batch = batch.index + 1, total, names = %batch.label(), "researching batch");

            let request = self.prompt.render(&batch.names);
            match self.agent.research(&request).await {
                Ok(answer) => {
                    usage.merge(&answer.usage);
                    self.emit(ScanEvent::Answered { batch, answer: &answer });

                    let normalized = parse_records(&answer.text);
                    let before = ledger.completed().len();
                    match ledger.accumulate(batch, &normalized, coverage_key.as_deref()) {
                        Accumulation::Accumulated { accepted, rejected, missing } => {
                            info!(batch = batch.index + 1, accepted, rejected, missing, "batch accumulated");
                            for record in &ledger.completed()[before..] {
                                self.emit(ScanEvent::RecordAccepted { record });
                            }
                            trace.push(ScanState::Accumulated(batch.index));
                        }
                        Accumulation::Skipped => {
                            if let Err(error) = &normalized {
                                warn!(batch = batch.index + 1, error = %error, "unusable reply, skipping batch");
                                debug!(raw = error.context_value("raw").unwrap_or_default(), "raw reply");
                                self.emit(ScanEvent::ShapeFailed { batch, error });
                            }
                            trace.push(ScanState::SkippedParse(batch.index));
                        }
                    }
                }
                Err(error) => {
                    let error = error.with_context("batch", batch.label());
                    warn!(
                        batch = batch.index + 1,
                        transport = error.kind().is_transport(),
                        retryable = error.is_retryable(),
                        error = %error,
                        "agent call failed, skipping batch"
                    );
                    ledger.skip_transport(batch, &error);
                    trace.push(ScanState::SkippedTransport(batch.index));
                    self.emit(ScanEvent::TransportFailed { batch, error: &error });

                    if self.policy.decide(batch, &error) == Continuation::Halt {
                        info!(batch = batch.index + 1, "operator halted the scan");
                        halted = true;
                        break;
                    }
                }
            }

            let is_last = batch.index + 1 == total;
            if !is_last && !self.options.delay.is_zero() {
                self.emit(ScanEvent::Waiting { delay: self.options.delay });
                tokio::time::sleep(self.options.delay).await;
            }
        }

        let final_state = if halted { ScanState::Halted } else { ScanState::Done };
        trace.push(final_state);

        if let Some(shortfall) = ledger.shortfall() {
            warn!(error = %shortfall, "some requested systems were not answered");
        }
        info!(
            completed = ledger.completed().len(),
            skipped = ledger.skipped().len(),
            state = %final_state,
            "scan finished"
        );

        Ok(ScanReport {
            ledger,
            final_state,
            trace,
            batches_total: total,
            batches_attempted: attempted,
            usage,
        })
    }
}
