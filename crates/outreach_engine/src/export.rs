use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::activity_log::{ActivityLog, LogRecord, RecordStatus};
use crate::persist::{AtomicFileWriter, StoreError};
use outreach_logging::orch_info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    /// `round(success / total * 100)`.
    pub success_rate: u32,
}

/// Export one day's records as `<kind>_report_<date>.csv`.
///
/// The report starts with a synthetic summary block (aggregate counts and
/// success rate) followed by the detail rows. Returns `Ok(None)` without
/// touching the filesystem when the date has no records.
pub fn export_daily_report(
    log: &ActivityLog,
    kind: &str,
    date: NaiveDate,
    output_dir: &Path,
) -> Result<Option<ReportSummary>, ExportError> {
    let records = log.by_date(date)?;
    if records.is_empty() {
        return Ok(None);
    }

    let success = records
        .iter()
        .filter(|r| r.status == RecordStatus::Success)
        .count();
    let failure = records.len() - success;
    let success_rate = ((success as f64 / records.len() as f64) * 100.0).round() as u32;

    let mut buffer = String::new();
    push_row(
        &mut buffer,
        &["Title", "Email", "Subject", "Status", "Date", "Time", "City", "Link"],
    );

    let label = kind.to_uppercase();
    push_row(
        &mut buffer,
        &[
            &format!("--- DAILY {label} REPORT SUMMARY ---"),
            "", "", "",
            &date.format("%Y-%m-%d").to_string(),
            "", "", "",
        ],
    );
    push_summary_row(&mut buffer, "Total Records", &records.len().to_string());
    push_summary_row(&mut buffer, "Succeeded", &success.to_string());
    push_summary_row(&mut buffer, "Failed", &failure.to_string());
    push_summary_row(&mut buffer, "Success Rate", &format!("{success_rate}%"));
    push_row(&mut buffer, &["", "", "", "", "", "", "", ""]);
    push_row(
        &mut buffer,
        &[&format!("--- DETAILED {label} LOG ---"), "", "", "", "", "", "", ""],
    );

    for record in &records {
        push_detail_row(&mut buffer, record);
    }

    let filename = format!("{kind}_report_{}.csv", date.format("%Y-%m-%d"));
    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer.write(&filename, buffer.as_bytes())?;
    orch_info!(
        "Exported {} {kind} records for {date} to {path:?}",
        records.len()
    );

    Ok(Some(ReportSummary {
        path,
        total: records.len(),
        success,
        failure,
        success_rate,
    }))
}

fn push_detail_row(buffer: &mut String, record: &LogRecord) {
    let status = match record.status {
        RecordStatus::Success => "Success",
        RecordStatus::Failure => "Failure",
    };
    let time = record
        .timestamp
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string();
    push_row(
        buffer,
        &[
            &record.title,
            &record.recipient,
            record.subject.as_deref().unwrap_or(""),
            status,
            &record.date.format("%Y-%m-%d").to_string(),
            &time,
            &record.city,
            &record.link,
        ],
    );
}

fn push_summary_row(buffer: &mut String, label: &str, value: &str) {
    push_row(buffer, &[label, value, "", "", "", "", "", ""]);
}

fn push_row(buffer: &mut String, fields: &[&str]) {
    let row = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");
    buffer.push_str(&row);
    buffer.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
