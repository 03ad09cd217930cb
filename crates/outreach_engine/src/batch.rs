use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::activity_log::{ActivityLog, LogRecord};
use crate::types::{BatchEvent, BatchItem, BatchSink, ItemStatus};
use outreach_logging::{orch_info, orch_warn};

/// Failure scoped to a single batch item. Never halts the batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ItemFailure(pub String);

/// Acknowledgement of a successful operation, carrying the descriptive
/// extras (e.g. the generated subject) that belong in the activity log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemAck {
    pub subject: Option<String>,
}

/// One remote operation applied to one item.
#[async_trait]
pub trait ItemOp: Send + Sync {
    async fn apply(&self, item: &BatchItem) -> Result<ItemAck, ItemFailure>;
}

/// Which operation pair an item takes through the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Primary first, fallback on failure.
    Standard,
    /// Skip the primary entirely; the dispatch-only path is the only one
    /// supported for this recipient class.
    DispatchOnly,
}

pub trait ItemRouter: Send + Sync {
    fn route(&self, item: &BatchItem) -> Route;
}

/// Routes every item through the standard primary/fallback pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRouter;

impl ItemRouter for StandardRouter {
    fn route(&self, _item: &BatchItem) -> Route {
        Route::Standard
    }
}

/// Routes recipients on the job board's own relay addresses to the
/// dispatch-only path; the generate-and-send service cannot deliver there.
#[derive(Debug, Clone)]
pub struct RelayDomainRouter {
    pattern: String,
}

impl RelayDomainRouter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into() }
    }
}

impl Default for RelayDomainRouter {
    fn default() -> Self {
        Self::new("craigslist.org")
    }
}

impl ItemRouter for RelayDomainRouter {
    fn route(&self, item: &BatchItem) -> Route {
        if !self.pattern.is_empty() && item.recipient.contains(&self.pattern) {
            Route::DispatchOnly
        } else {
            Route::Standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Fixed wait after every item, including the last. This is a rate
    /// limit against the downstream service, not cosmetics.
    pub inter_item_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub item: BatchItem,
    pub status: ItemStatus,
    pub subject: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.processed
            .iter()
            .filter(|o| o.status == ItemStatus::Done)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.processed
            .iter()
            .filter(|o| o.status == ItemStatus::Failed)
            .count()
    }
}

/// Sequential batch executor.
///
/// One item's resolution strictly precedes the next item's start. Every
/// item gets exactly one activity-log record and one finished event,
/// regardless of earlier outcomes. Cancellation between items is the
/// caller's concern; an in-flight item always runs to completion.
pub async fn run_batch(
    items: Vec<BatchItem>,
    router: &dyn ItemRouter,
    primary: &dyn ItemOp,
    fallback: Option<&dyn ItemOp>,
    log: &ActivityLog,
    sink: &dyn BatchSink,
    settings: &BatchSettings,
) -> BatchReport {
    let total = items.len();
    let mut report = BatchReport::default();

    for (index, item) in items.into_iter().enumerate() {
        sink.emit(BatchEvent::ItemStarted {
            index,
            total,
            title: item.title.clone(),
        });

        let result = process_item(&item, router.route(&item), primary, fallback).await;

        let outcome = match result {
            Ok(ack) => {
                let record = LogRecord::success(&item, ack.subject.clone());
                if let Err(err) = log.append(&record) {
                    orch_warn!("Failed to append activity record: {err}");
                }
                orch_info!("Processed '{}' ({}/{total})", item.title, index + 1);
                BatchOutcome {
                    item,
                    status: ItemStatus::Done,
                    subject: ack.subject,
                    error: None,
                }
            }
            Err(failure) => {
                let record = LogRecord::failure(&item, None, failure.0.clone());
                if let Err(err) = log.append(&record) {
                    orch_warn!("Failed to append activity record: {err}");
                }
                orch_warn!(
                    "Item '{}' failed ({}/{total}): {}",
                    item.title,
                    index + 1,
                    failure.0
                );
                BatchOutcome {
                    item,
                    status: ItemStatus::Failed,
                    subject: None,
                    error: Some(failure.0),
                }
            }
        };

        sink.emit(BatchEvent::ItemFinished {
            index,
            total,
            title: outcome.item.title.clone(),
            status: outcome.status,
        });
        report.processed.push(outcome);

        tokio::time::sleep(settings.inter_item_delay).await;
    }

    report
}

async fn process_item(
    item: &BatchItem,
    route: Route,
    primary: &dyn ItemOp,
    fallback: Option<&dyn ItemOp>,
) -> Result<ItemAck, ItemFailure> {
    match route {
        Route::DispatchOnly => match fallback {
            Some(op) => op.apply(item).await,
            None => Err(ItemFailure(
                "dispatch-only item but no dispatch operation configured".to_string(),
            )),
        },
        Route::Standard => match primary.apply(item).await {
            Ok(ack) => Ok(ack),
            Err(primary_failure) => match fallback {
                // Exactly one fallback attempt, no further nesting.
                Some(op) => op.apply(item).await.map_err(|fallback_failure| {
                    ItemFailure(format!(
                        "primary: {primary_failure}; fallback: {fallback_failure}"
                    ))
                }),
                None => Err(primary_failure),
            },
        },
    }
}
