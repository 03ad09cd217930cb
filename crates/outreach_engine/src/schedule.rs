use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activity_log::ActivityLog;
use crate::export::export_daily_report;
use outreach_logging::{orch_info, orch_warn};

/// Next export instant after `now` for the given wall-clock hour, plus the
/// wait until then. Starting past the export hour rolls to tomorrow.
pub fn next_export_delay(now: NaiveDateTime, hour: u32) -> (NaiveDateTime, Duration) {
    let export_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now.date().and_time(export_time);
    if now >= target {
        target += chrono::Duration::days(1);
    }
    let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
    (target, wait)
}

/// Perpetual daily-export timer for one activity log.
///
/// Fires at `hour:00` local, exports that day's records, then re-arms
/// itself for the next day. Lives until the token is cancelled.
pub fn spawn_daily_export(
    log: ActivityLog,
    kind: String,
    output_dir: PathBuf,
    hour: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let (target, wait) = next_export_delay(Local::now().naive_local(), hour);
            orch_info!("Next {kind} report export scheduled for {target}");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let today = Local::now().date_naive();
            match export_daily_report(&log, &kind, today, &output_dir) {
                Ok(Some(summary)) => {
                    orch_info!(
                        "Daily {kind} report exported: {} records, {}% success",
                        summary.total,
                        summary.success_rate
                    );
                }
                Ok(None) => {
                    orch_info!("No {kind} records to export for {today}");
                }
                Err(err) => {
                    orch_warn!("Daily {kind} export failed: {err}");
                }
            }
        }
    })
}
