//! Outreach engine: remote service clients and batch execution.
mod activity_log;
mod artifact;
mod batch;
mod export;
mod mailer_client;
mod mailgen_client;
mod persist;
mod retry;
mod schedule;
mod scrape_client;
mod types;

pub use activity_log::{ActivityLog, LogRecord, RecordStatus};
pub use artifact::{materialize_results, ArtifactError, ArtifactStore};
pub use batch::{
    run_batch, BatchOutcome, BatchReport, BatchSettings, ItemAck, ItemFailure, ItemOp,
    ItemRouter, RelayDomainRouter, Route, StandardRouter,
};
pub use export::{export_daily_report, ExportError, ReportSummary};
pub use mailer_client::{MailerClient, OutgoingMail};
pub use mailgen_client::{sanitize_subject, split_subject_body, MailGenClient, MailTemplate};
pub use persist::{ensure_dir, AtomicFileWriter, StoreError};
pub use retry::retry;
pub use schedule::{next_export_delay, spawn_daily_export};
pub use scrape_client::{
    ArtifactInfo, CleanupReport, ConfigPayload, FetchResultDto, ResetReport, ScrapeClient,
    ScrapeSettings, StartOptions, StartOutcome, StatusDto,
};
pub use types::{BatchEvent, BatchItem, BatchSink, ChannelBatchSink, ClientError, ItemStatus};
