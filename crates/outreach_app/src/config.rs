use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// One run's configuration, loaded from a RON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base URL of the scraping service API.
    pub scraper_url: String,
    /// Base URL of the template-generation service API.
    pub mailgen_url: String,
    /// Base URL of the dispatch service.
    pub mailer_url: String,
    /// Well-known location for the materialized result artifact.
    pub output_dir: PathBuf,
    /// Durable home of the activity logs and exported reports.
    pub data_dir: PathBuf,
    pub targets: Vec<String>,
    pub keywords: Vec<String>,
    pub persona: String,
    /// Pre-mapped batch items (JSON array); the CSV-to-item mapping is an
    /// external step.
    pub items_file: Option<PathBuf>,
    pub result_filename: String,
    pub relay_domain: String,
    pub export_hour: u32,
    pub generate_delay_ms: u64,
    pub send_delay_ms: u64,
    pub generate_timeout_ms: u64,
    pub recovery_delay_ms: u64,
    pub initial_poll_delay_ms: u64,
    pub max_poll_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scraper_url: "http://127.0.0.1:8000/api".to_string(),
            mailgen_url: "http://127.0.0.1:61325/api".to_string(),
            mailer_url: "http://127.0.0.1:8020".to_string(),
            output_dir: PathBuf::from("./output"),
            data_dir: PathBuf::from("./data"),
            targets: Vec::new(),
            keywords: Vec::new(),
            persona: "Abj".to_string(),
            items_file: None,
            result_filename: "results.csv".to_string(),
            relay_domain: "craigslist.org".to_string(),
            export_hour: 17,
            generate_delay_ms: 2_000,
            send_delay_ms: 3_000,
            generate_timeout_ms: 300_000,
            recovery_delay_ms: 10_000,
            initial_poll_delay_ms: 10_000,
            max_poll_delay_ms: 30_000,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading run config {path:?}"))?;
        let config: RunConfig =
            ron::from_str(&content).with_context(|| format!("parsing run config {path:?}"))?;
        Ok(config)
    }

    pub fn monitor_settings(&self) -> outreach_core::MonitorSettings {
        outreach_core::MonitorSettings {
            initial_poll_delay_ms: self.initial_poll_delay_ms,
            max_poll_delay_ms: self.max_poll_delay_ms,
            recovery_delay_ms: self.recovery_delay_ms,
            ..outreach_core::MonitorSettings::default()
        }
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }
}
