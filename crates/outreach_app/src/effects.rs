use std::path::{Path, PathBuf};
use std::time::Duration;

use outreach_core::{JobConfig, StartFailure, StartResult, StatusSnapshot};
use outreach_engine::{
    materialize_results, retry, ArtifactStore, ConfigPayload, ScrapeClient, StartOptions,
    StartOutcome, StatusDto,
};
use outreach_logging::{orch_info, orch_warn};

/// Knobs for the poll retry wrapper (the status call is retried with a
/// fixed short delay before the poll counts as failed).
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub poll_retry_attempts: u32,
    pub poll_retry_delay: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            poll_retry_attempts: 3,
            poll_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Executes monitor effects against the scraping service and feeds the
/// outcomes back as plain values for the state machine.
pub struct EffectExecutor {
    scrape: ScrapeClient,
    store: ArtifactStore,
    settings: ExecutorSettings,
    target_count: usize,
    artifact: Option<PathBuf>,
}

impl EffectExecutor {
    pub fn new(scrape: ScrapeClient, store: ArtifactStore, settings: ExecutorSettings) -> Self {
        Self {
            scrape,
            store,
            settings,
            target_count: 0,
            artifact: None,
        }
    }

    pub async fn reset(&self) -> (bool, bool) {
        let report = self.scrape.reset().await;
        (report.server_ok, report.local_ok)
    }

    pub async fn configure(&mut self, config: &JobConfig) -> Result<(), String> {
        self.target_count = config.targets.len();
        let payload = map_config(config);
        self.scrape
            .configure(&payload)
            .await
            .map_err(|e| e.to_string())
    }

    /// One start attempt. An already-running job with the same identity is
    /// adopted instead of restarted.
    pub async fn start(&self) -> StartResult {
        match self.scrape.status().await {
            Ok(Some(dto)) if dto.is_running => {
                orch_info!("A scraping job is already running; resuming it");
                return StartResult::AlreadyRunning(map_status(dto));
            }
            Ok(_) => {}
            Err(err) => {
                orch_warn!("Pre-start status check failed: {err}");
            }
        }

        let options = StartOptions {
            number_of_urls: self.target_count,
            resume: true,
            infinite_mode: true,
        };
        match self.scrape.start(&options).await {
            Ok(StartOutcome::Started(_)) => StartResult::Started,
            Ok(StartOutcome::TimedOut) => StartResult::TimedOut,
            Err(err) if err.is_unreachable() => StartResult::Failed(StartFailure::Unreachable),
            Err(err) if err.is_timeout() => StartResult::TimedOut,
            Err(err) => StartResult::Failed(StartFailure::Transient(err.to_string())),
        }
    }

    /// One poll: the status call behind the bounded-retry wrapper. Any
    /// terminal failure becomes `None`, which the monitor treats as a
    /// failed poll and backs off.
    pub async fn poll(&self) -> Option<StatusSnapshot> {
        let result = retry(
            || self.scrape.status(),
            self.settings.poll_retry_attempts,
            self.settings.poll_retry_delay,
        )
        .await;

        match result {
            Ok(Some(dto)) => Some(map_status(dto)),
            Ok(None) => None,
            Err(err) => {
                orch_warn!("Status poll failed: {err}");
                None
            }
        }
    }

    pub async fn fetch_artifact(&mut self) -> bool {
        match materialize_results(&self.scrape, &self.store).await {
            Ok(path) => {
                self.artifact = Some(path);
                true
            }
            Err(err) => {
                orch_warn!("Result materialization failed: {err}");
                false
            }
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }
}

fn map_config(config: &JobConfig) -> ConfigPayload {
    ConfigPayload {
        urls: config.targets.clone(),
        keywords: config.keywords.clone(),
        use_headless: false,
        batch_size: config.batch_size,
        max_retries: config.max_retries,
        timeout_per_url: 0,
        save_partial_results: config.save_partial,
        infinite_mode: config.no_timeout,
    }
}

fn map_status(dto: StatusDto) -> StatusSnapshot {
    StatusSnapshot {
        is_running: dto.is_running,
        completed: dto.completed,
        error: dto.error,
        no_results: dto.no_results,
        progress: dto.progress.min(100),
        current_phase: dto.current_phase,
        current_target: dto.current_url,
        last_completed: dto.last_completed,
    }
}
