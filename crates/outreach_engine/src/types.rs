use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One record processed by the batch processor: a mail to generate or send.
///
/// Items arrive pre-mapped from the scraped results; the CSV parsing that
/// produces them is outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub title: String,
    pub description: String,
    pub recipient: String,
    pub city: String,
    pub link: String,
    pub date: String,
}

/// Runtime status of a batch item during one run. Discarded with the run;
/// the durable outcome lives in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    InFlight,
    Done,
    Failed,
}

/// Progress events emitted while a batch run is executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    ItemStarted {
        index: usize,
        total: usize,
        title: String,
    },
    ItemFinished {
        index: usize,
        total: usize,
        title: String,
        status: ItemStatus,
    },
}

pub trait BatchSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

/// Sink that forwards events over a channel, for drivers that render
/// progress elsewhere.
pub struct ChannelBatchSink {
    tx: std::sync::mpsc::Sender<BatchEvent>,
}

impl ChannelBatchSink {
    pub fn new(tx: std::sync::mpsc::Sender<BatchEvent>) -> Self {
        Self { tx }
    }
}

impl BatchSink for ChannelBatchSink {
    fn emit(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

/// Failure of one remote call, classified the way the orchestrator needs:
/// unreachable and timed-out are handled differently from everything else.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    Http(u16),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Protocol(String),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable(_))
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Timeout;
    }
    if err.is_connect() {
        return ClientError::Unreachable(err.to_string());
    }
    ClientError::Protocol(err.to_string())
}
