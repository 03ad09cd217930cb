use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::persist::{append_line, ensure_dir, StoreError};
use crate::types::BatchItem;
use outreach_logging::orch_warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Success,
    Failure,
}

/// One completed operation: a generated template or a dispatch attempt.
///
/// Records are append-only; identity is insertion order and the local date
/// is the partition key for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub title: String,
    pub recipient: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub city: String,
    pub link: String,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub status: RecordStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl LogRecord {
    pub fn success(item: &BatchItem, subject: Option<String>) -> Self {
        Self::stamped(item, subject, RecordStatus::Success, None)
    }

    pub fn failure(item: &BatchItem, subject: Option<String>, error: String) -> Self {
        Self::stamped(item, subject, RecordStatus::Failure, Some(error))
    }

    fn stamped(
        item: &BatchItem,
        subject: Option<String>,
        status: RecordStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            title: item.title.clone(),
            recipient: item.recipient.clone(),
            subject,
            city: item.city.clone(),
            link: item.link.clone(),
            timestamp: Utc::now(),
            date: Local::now().date_naive(),
            status,
            error,
        }
    }
}

/// Append-only, date-partitioned record store, one JSON line per record.
/// Survives process restarts; deleted only by an explicit `clear`.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    dir: PathBuf,
    store: String,
}

impl ActivityLog {
    pub fn open(dir: impl Into<PathBuf>, store: impl Into<String>) -> Result<Self, StoreError> {
        let log = Self {
            dir: dir.into(),
            store: store.into(),
        };
        ensure_dir(&log.dir)?;
        Ok(log)
    }

    pub fn store_name(&self) -> &str {
        &self.store
    }

    fn filename(&self) -> String {
        format!("{}.jsonl", self.store)
    }

    pub fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        append_line(&self.dir, &self.filename(), &line)
    }

    pub fn all(&self) -> Result<Vec<LogRecord>, StoreError> {
        let path = self.dir.join(self.filename());
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // A torn write must not poison the whole store.
                    orch_warn!("Skipping corrupt record in {:?}: {err}", path);
                }
            }
        }
        Ok(records)
    }

    pub fn by_date(&self, date: NaiveDate) -> Result<Vec<LogRecord>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.date == date)
            .collect())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let path = self.dir.join(self.filename());
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}
