use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{map_reqwest_error, ClientError};
use outreach_logging::{orch_debug, orch_warn};

/// Connection settings for the scraping service.
///
/// `start_timeout` is the client-side cap on the start call only; the job
/// itself has no wall-clock limit and can run for a day.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub start_timeout: Duration,
}

impl ScrapeSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            start_timeout: Duration::from_secs(86_400),
        }
    }
}

/// Job configuration as the service expects it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPayload {
    pub urls: Vec<String>,
    pub keywords: Vec<String>,
    pub use_headless: bool,
    pub batch_size: u32,
    pub max_retries: u32,
    /// 0 means no per-target timeout.
    pub timeout_per_url: u64,
    pub save_partial_results: bool,
    pub infinite_mode: bool,
}

/// Polled job status as reported by the service. Missing fields default so
/// older service versions still parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct StatusDto {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub no_results: bool,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub current_phase: Option<String>,
    #[serde(default)]
    pub current_url: Option<String>,
    #[serde(default)]
    pub last_completed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartOptions {
    pub number_of_urls: usize,
    pub resume: bool,
    pub infinite_mode: bool,
}

/// Outcome of one start request. A client-side timeout is a valid outcome,
/// not an error: the job start is fire-and-forget beyond our timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Option<StatusDto>),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CleanupReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub deleted_count: u32,
}

/// Response of the result-download endpoint. `content` carries a base64
/// payload when the service could not write the file itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FetchResultDto {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Per-side outcome of a composite reset; neither failure is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReport {
    pub server_ok: bool,
    pub local_ok: bool,
}

#[derive(Deserialize)]
struct FileListDto {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    files: Vec<ArtifactInfo>,
}

/// Stateless facade over the scraping service API.
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    http: reqwest::Client,
    settings: ScrapeSettings,
}

impl ScrapeClient {
    pub fn new(settings: ScrapeSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        Ok(Self { http, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }

    /// Remove server-side leftovers from previous runs.
    pub async fn cleanup_server(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/cleanup"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        Ok(())
    }

    /// Remove previously materialized output files.
    pub async fn cleanup_local(&self) -> Result<CleanupReport, ClientError> {
        let response = self
            .http
            .delete(self.url("/clean-frontend-files"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        response
            .json::<CleanupReport>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Composite reset before a new submission. Each step is tolerated on
    /// failure; the report says which sides succeeded.
    pub async fn reset(&self) -> ResetReport {
        let server_ok = match self.cleanup_server().await {
            Ok(()) => true,
            Err(err) => {
                orch_warn!("Server cleanup failed during reset: {err}");
                false
            }
        };
        let local_ok = match self.cleanup_local().await {
            Ok(report) => {
                orch_debug!("Removed {} leftover output files", report.deleted_count);
                report.success
            }
            Err(err) => {
                orch_warn!("Output cleanup failed during reset: {err}");
                false
            }
        };
        // Status probe keeps us in sync with the service; outcome ignored.
        if let Err(err) = self.status().await {
            orch_debug!("Status probe failed during reset: {err}");
        }
        ResetReport { server_ok, local_ok }
    }

    /// Submit the job configuration. A non-success response is a rejection,
    /// which aborts the run.
    pub async fn configure(&self, payload: &ConfigPayload) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/update-config"))
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected(format!("status {status}: {body}")));
        }
        Ok(())
    }

    /// Start the job. The start call carries its own, much longer timeout;
    /// hitting it yields `TimedOut`, not an error.
    pub async fn start(&self, options: &StartOptions) -> Result<StartOutcome, ClientError> {
        let result = self
            .http
            .post(self.url("/start-scraping"))
            .timeout(self.settings.start_timeout)
            .json(options)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Ok(StartOutcome::TimedOut),
            Err(err) => return Err(map_reqwest_error(err)),
        };

        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        let snapshot = response.json::<StatusDto>().await.ok();
        Ok(StartOutcome::Started(snapshot))
    }

    /// Fetch the latest status snapshot, if the service has one.
    pub async fn status(&self) -> Result<Option<StatusDto>, ClientError> {
        let response = self
            .http
            .get(self.url("/scraping-status"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        let dto = response
            .json::<StatusDto>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        Ok(Some(dto))
    }

    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactInfo>, ClientError> {
        let response = self
            .http
            .get(self.url("/files"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        let dto = response
            .json::<FileListDto>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        if !dto.success {
            return Ok(Vec::new());
        }
        Ok(dto.files)
    }

    /// Check whether the named artifact is present at the well-known
    /// output location.
    pub async fn result_exists(&self, name: &str) -> Result<Option<ArtifactInfo>, ClientError> {
        let files = self.list_artifacts().await?;
        Ok(files.into_iter().find(|f| f.name == name))
    }

    /// Ask the service to materialize the result, preferring a direct save
    /// into the output location over an inline payload.
    pub async fn fetch_result(&self) -> Result<FetchResultDto, ClientError> {
        let response = self
            .http
            .get(self.url("/download-results"))
            .query(&[("save_to_frontend", "true")])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        response
            .json::<FetchResultDto>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))
    }

    pub async fn delete_artifact(&self, name: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/files/{name}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        Ok(())
    }
}
