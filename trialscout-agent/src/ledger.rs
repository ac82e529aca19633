//! Run-scoped accumulation of completed and skipped results

use crate::batch::Batch;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use trialscout_error::{Error, ErrorKind, Result};

/// One system's findings, as returned by the agent. Key order is preserved.
pub type ResultRecord = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The agent call itself failed
    Transport,
    /// The agent answered, but not with a JSON array
    Shape,
}

/// A name (transport failure) or batch label (shape failure) that produced no records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub label: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// An array element that was not a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub batch: String,
    pub position: usize,
    pub value: Value,
}

/// A requested name that no accepted record answered for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Missing {
    pub name: String,
    pub batch: String,
}

/// Acknowledgement returned for every accumulated batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    Accumulated {
        accepted: usize,
        rejected: usize,
        missing: usize,
    },
    Skipped,
}

/// Outcome buckets for one run.
///
/// Records are appended as-is: accumulating the same reply twice yields the
/// records twice.
#[derive(Debug, Clone, Default)]
pub struct ScanLedger {
    completed: Vec<ResultRecord>,
    skipped: Vec<Skipped>,
    rejected: Vec<Rejected>,
    missing: Vec<Missing>,
}

impl ScanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a normalized reply into the ledger. Never fails.
    pub fn accumulate(
        &mut self,
        batch: &Batch,
        normalized: &Result<Vec<Value>>,
        coverage_key: Option<&str>,
    ) -> Accumulation {
        match normalized {
            Ok(elements) => self.accept(batch, elements, coverage_key),
            Err(err) => {
                self.skip_shape(batch, err);
                Accumulation::Skipped
            }
        }
    }

    /// Append every object element in order. With a `coverage_key`, names the
    /// batch asked for but no record answered are recorded as missing.
    pub fn accept(
        &mut self,
        batch: &Batch,
        elements: &[Value],
        coverage_key: Option<&str>,
    ) -> Accumulation {
        let label = batch.label();
        let start = self.completed.len();
        let mut rejected = 0;

        for (position, element) in elements.iter().enumerate() {
            match element {
                Value::Object(record) => self.completed.push(record.clone()),
                other => {
                    warn!(batch = %label, position, "rejecting non-object element");
                    self.rejected.push(Rejected {
                        batch: label.clone(),
                        position,
                        value: other.clone(),
                    });
                    rejected += 1;
                }
            }
        }

        let mut missing = 0;
        if let Some(key) = coverage_key {
            let answered: Vec<String> = self.completed[start..]
                .iter()
                .filter_map(|record| record.get(key).and_then(Value::as_str))
                .map(normalize_name)
                .collect();

            for name in &batch.names {
                if !answered.contains(&normalize_name(name)) {
                    debug!(batch = %label, name = %name, "no record for requested name");
                    self.missing.push(Missing {
                        name: name.clone(),
                        batch: label.clone(),
                    });
                    missing += 1;
                }
            }
        }

        Accumulation::Accumulated {
            accepted: self.completed.len() - start,
            rejected,
            missing,
        }
    }

    /// Record the whole batch under its label
    pub fn skip_shape(&mut self, batch: &Batch, error: &Error) {
        self.skipped.push(Skipped {
            label: batch.label(),
            reason: SkipReason::Shape,
            detail: error.message().to_string(),
        });
    }

    /// Record every name of the batch individually
    pub fn skip_transport(&mut self, batch: &Batch, error: &Error) {
        for name in &batch.names {
            self.skipped.push(Skipped {
                label: name.clone(),
                reason: SkipReason::Transport,
                detail: error.to_string(),
            });
        }
    }

    pub fn completed(&self) -> &[ResultRecord] {
        &self.completed
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn skipped_labels(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn rejected(&self) -> &[Rejected] {
        &self.rejected
    }

    pub fn missing(&self) -> &[Missing] {
        &self.missing
    }

    /// Summarize missing names as a `Shortfall` error, if there are any
    pub fn shortfall(&self) -> Option<Error> {
        if self.missing.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.missing.iter().map(|m| m.name.as_str()).collect();
        Some(
            Error::new(
                ErrorKind::Shortfall,
                format!("{} requested system(s) missing from replies", names.len()),
            )
            .with_operation("ledger::shortfall")
            .with_context("names", names.join(", ")),
        )
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(names: &[&str]) -> Batch {
        Batch::new(0, names.iter().map(|s| s.to_string()).collect())
    }

    fn records(value: Value) -> Result<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_accumulate_appends_in_order() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close", "PipeDrive"]);
        let reply = records(json!([
            {"target_system": "Close", "Domain": "https://developer.close.com"},
            {"target_system": "PipeDrive", "Domain": "https://developers.pipedrive.com"}
        ]));

        let ack = ledger.accumulate(&b, &reply, Some("target_system"));

        assert_eq!(ack, Accumulation::Accumulated { accepted: 2, rejected: 0, missing: 0 });
        assert_eq!(ledger.completed().len(), 2);
        assert_eq!(ledger.completed()[1]["target_system"], "PipeDrive");
        assert!(ledger.skipped().is_empty());
    }

    #[test]
    fn test_no_deduplication() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close"]);
        let reply = records(json!([{"target_system": "Close"}]));

        ledger.accumulate(&b, &reply, None);
        ledger.accumulate(&b, &reply, None);

        assert_eq!(ledger.completed().len(), 2);
        assert_eq!(ledger.completed()[0], ledger.completed()[1]);
    }

    #[test]
    fn test_shape_failure_records_batch_label() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close", "PipeDrive"]);
        let reply = Err(Error::shape_mismatch("array", "object", "{}"));

        let ack = ledger.accumulate(&b, &reply, Some("target_system"));

        assert_eq!(ack, Accumulation::Skipped);
        assert!(ledger.completed().is_empty());
        assert_eq!(ledger.skipped_labels(), vec!["Close, PipeDrive"]);
        assert_eq!(ledger.skipped()[0].reason, SkipReason::Shape);
        assert!(ledger.missing().is_empty());
    }

    #[test]
    fn test_transport_failure_records_each_name() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close", "PipeDrive"]);
        let err = Error::new(ErrorKind::NetworkFailed, "connection reset");

        ledger.skip_transport(&b, &err);

        assert_eq!(ledger.skipped_labels(), vec!["Close", "PipeDrive"]);
        assert!(ledger.skipped().iter().all(|s| s.reason == SkipReason::Transport));
    }

    #[test]
    fn test_non_objects_rejected_individually() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close", "PipeDrive"]);
        let reply = records(json!([{"target_system": "Close"}, "PipeDrive: unknown", 7]));

        let ack = ledger.accumulate(&b, &reply, None);

        assert_eq!(ack, Accumulation::Accumulated { accepted: 1, rejected: 2, missing: 0 });
        assert_eq!(ledger.rejected()[0].position, 1);
        assert_eq!(ledger.rejected()[1].value, json!(7));
    }

    #[test]
    fn test_shortfall_detected() {
        let mut ledger = ScanLedger::new();
        let b = batch(&["Close", "PipeDrive", "SmartBear SwaggerHub"]);
        let reply = records(json!([{"target_system": " close "}, {"target_system": "smartbear swaggerhub"}]));

        let ack = ledger.accumulate(&b, &reply, Some("target_system"));

        assert_eq!(ack, Accumulation::Accumulated { accepted: 2, rejected: 0, missing: 1 });
        assert_eq!(ledger.missing()[0].name, "PipeDrive");

        let err = ledger.shortfall().unwrap();
        assert_eq!(err.kind(), ErrorKind::Shortfall);
        assert_eq!(err.context_value("names"), Some("PipeDrive"));
    }

    #[test]
    fn test_coverage_only_counts_current_batch() {
        let mut ledger = ScanLedger::new();
        ledger.accumulate(&batch(&["Close"]), &records(json!([{"target_system": "Close"}])), Some("target_system"));

        let ack = ledger.accumulate(&batch(&["Close"]), &records(json!([])), Some("target_system"));

        assert_eq!(ack, Accumulation::Accumulated { accepted: 0, rejected: 0, missing: 1 });
        assert!(ledger.shortfall().is_some());
    }
}
