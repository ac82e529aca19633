//! Spreadsheet export of completed records

use crate::ledger::{Missing, ResultRecord, Skipped};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use trialscout_error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// `.json` selects JSON; anything else is a CSV sheet
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

/// Columns are the keys of the first record, in its order. Keys that only
/// appear in later records are not exported.
pub fn header_from(records: &[ResultRecord]) -> Result<Vec<String>> {
    let first = records.first().ok_or_else(|| {
        Error::export_failed("no completed records to export").with_operation("export::header_from")
    })?;
    Ok(first.keys().cloned().collect())
}

/// Render one value as a sheet cell. Absent and null are empty.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Header row plus one row per record. Returns the number of data rows.
pub fn write_csv<W: Write>(records: &[ResultRecord], writer: W) -> Result<usize> {
    let header = header_from(records)?;
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(&header).map_err(csv_error)?;
    for record in records {
        let row = header.iter().map(|key| cell(record.get(key)));
        out.write_record(row).map_err(csv_error)?;
    }
    out.flush()
        .map_err(|e| Error::from(e).with_operation("export::write_csv"))?;
    Ok(records.len())
}

/// Records as a pretty JSON array
pub fn write_json<W: Write>(records: &[ResultRecord], mut writer: W) -> Result<usize> {
    if records.is_empty() {
        return Err(Error::export_failed("no completed records to export")
            .with_operation("export::write_json"));
    }
    serde_json::to_writer_pretty(&mut writer, records).map_err(json_error)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| Error::from(e).with_operation("export::write_json"))?;
    Ok(records.len())
}

/// Write `records` to `path`, choosing the format from its extension.
///
/// Nothing is created when there are no records.
pub fn export_records(records: &[ResultRecord], path: &Path) -> Result<usize> {
    let format = ExportFormat::from_path(path);
    if records.is_empty() {
        return Err(Error::export_failed("no completed records to export")
            .with_operation("export::export_records")
            .with_context("path", path.display().to_string()));
    }

    let file = File::create(path).map_err(|e| {
        Error::from(e)
            .with_operation("export::export_records")
            .with_context("path", path.display().to_string())
    })?;
    let writer = BufWriter::new(file);

    let rows = match format {
        ExportFormat::Csv => write_csv(records, writer)?,
        ExportFormat::Json => write_json(records, writer)?,
    };
    info!(path = %path.display(), rows, format = ?format, "exported records");
    Ok(rows)
}

#[derive(Debug, Serialize)]
struct SkipReport<'a> {
    skipped: &'a [Skipped],
    missing: &'a [Missing],
}

/// Dump skipped labels and missing names as JSON for a later re-run
pub fn write_skip_report(skipped: &[Skipped], missing: &[Missing], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        Error::from(e)
            .with_operation("export::write_skip_report")
            .with_context("path", path.display().to_string())
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &SkipReport { skipped, missing }).map_err(json_error)?;
    writer
        .flush()
        .map_err(|e| Error::from(e).with_operation("export::write_skip_report"))?;
    Ok(())
}

fn csv_error(err: csv::Error) -> Error {
    let kind = if err.is_io_error() {
        ErrorKind::IoFailed
    } else {
        ErrorKind::SerializationFailed
    };
    Error::new(kind, format!("failed to write sheet: {}", err))
        .with_operation("export::write_csv")
        .set_source(err)
}

fn json_error(err: serde_json::Error) -> Error {
    let kind = if err.is_io() {
        ErrorKind::IoFailed
    } else {
        ErrorKind::SerializationFailed
    };
    Error::new(kind, format!("failed to write json: {}", err))
        .with_operation("export::write_json")
        .set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Batch;
    use crate::ledger::ScanLedger;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: Value) -> ResultRecord {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_header_from_first_record() {
        let records = vec![
            record(json!({"target_system": "Close", "Domain": "d1"})),
            record(json!({"Domain": "d2", "target_system": "PipeDrive", "Free_trial": "yes"})),
        ];

        let header = header_from(&records).unwrap();
        assert_eq!(header, vec!["target_system", "Domain"]);
    }

    #[test]
    fn test_write_csv_ignores_later_keys() {
        let records = vec![
            record(json!({"target_system": "Close"})),
            record(json!({"target_system": "PipeDrive", "Free_trial": "yes"})),
        ];
        let mut buf = Vec::new();

        write_csv(&records, &mut buf).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "target_system\nClose\nPipeDrive\n");
    }

    /// Accepts writes, fails on flush
    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_write_json_reports_flush_failure() {
        let records = vec![record(json!({"target_system": "Close"}))];

        let err = write_json(&records, FlushFails(Vec::new())).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert_eq!(err.operation(), "export::write_json");
    }

    #[test]
    fn test_header_empty_fails() {
        let err = header_from(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExportFailed);
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell(None), "");
        assert_eq!(cell(Some(&Value::Null)), "");
        assert_eq!(cell(Some(&json!("/users"))), "/users");
        assert_eq!(cell(Some(&json!(true))), "true");
        assert_eq!(cell(Some(&json!(14))), "14");
        assert_eq!(cell(Some(&json!(["/users", "/groups"]))), r#"["/users","/groups"]"#);
    }

    #[test]
    fn test_write_csv() {
        let records = vec![
            record(json!({"target_system": "Close", "Aggregate_accounts": "/users, /memberships"})),
            record(json!({"target_system": "PipeDrive"})),
        ];
        let mut buf = Vec::new();

        let rows = write_csv(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            text,
            "target_system,Aggregate_accounts\nClose,\"/users, /memberships\"\nPipeDrive,\n"
        );
    }

    #[test]
    fn test_export_picks_format_from_extension() {
        let dir = TempDir::new().unwrap();
        let records = vec![record(json!({"target_system": "Close", "Free_trial": "14 days"}))];

        let csv_path = dir.path().join("saas_trials.csv");
        assert_eq!(export_records(&records, &csv_path).unwrap(), 1);
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("target_system,Free_trial\n"));

        let json_path = dir.path().join("saas_trials.JSON");
        export_records(&records, &json_path).unwrap();
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed[0]["Free_trial"], "14 days");
    }

    #[test]
    fn test_export_empty_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saas_trials.csv");

        let err = export_records(&[], &path).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExportFailed);
        assert!(!path.exists());
    }

    #[test]
    fn test_export_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let records = vec![record(json!({"target_system": "Close"}))];

        let err = export_records(&records, &path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_skip_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skipped.json");
        let mut ledger = ScanLedger::new();
        let batch = Batch::new(0, vec!["Close".into(), "PipeDrive".into()]);
        ledger.skip_transport(&batch, &Error::new(ErrorKind::RateLimited, "429"));

        write_skip_report(ledger.skipped(), ledger.missing(), &path).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["skipped"][1]["label"], "PipeDrive");
        assert_eq!(parsed["skipped"][0]["reason"], "transport");
        assert_eq!(parsed["missing"], json!([]));
    }
}
