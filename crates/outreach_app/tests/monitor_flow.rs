use std::time::{Duration, Instant};

use outreach_app::driver::{run_monitor, MonitorEvent};
use outreach_app::effects::{EffectExecutor, ExecutorSettings};
use outreach_core::{JobSelection, MonitorSettings, NoticeLevel, Phase};
use outreach_engine::{ArtifactStore, ScrapeClient, ScrapeSettings};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings() -> MonitorSettings {
    MonitorSettings {
        initial_poll_delay_ms: 10,
        max_poll_delay_ms: 30,
        recovery_delay_ms: 30,
        ..MonitorSettings::default()
    }
}

fn executor_for(server: &MockServer, output_dir: &TempDir) -> EffectExecutor {
    let mut settings = ScrapeSettings::new(server.uri());
    settings.request_timeout = Duration::from_secs(2);
    settings.start_timeout = Duration::from_millis(50);
    let scrape = ScrapeClient::new(settings).expect("client");
    let store = ArtifactStore::new(output_dir.path(), "results.csv");
    EffectExecutor::new(
        scrape,
        store,
        ExecutorSettings {
            poll_retry_attempts: 1,
            poll_retry_delay: Duration::from_millis(10),
        },
    )
}

fn selection() -> JobSelection {
    JobSelection::new(
        vec!["https://a.example".to_string(), "https://b.example".to_string()],
        vec!["x".to_string()],
    )
}

async fn mount_reset_endpoints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/cleanup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/clean-frontend-files"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "deleted_count": 0})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/update-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(server)
        .await;
}

/// Mount `/scraping-status` responses served in order: `idle_probes` empty
/// snapshots (consumed by the reset probe and pre-start checks), then
/// `running` running snapshots, then `completed` forever.
async fn mount_status_sequence(server: &MockServer, idle_probes: u64, running: u64) {
    Mock::given(method("GET"))
        .and(path("/scraping-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_running": false,
            "current_phase": "Not Started",
            "last_completed": null
        })))
        .up_to_n_times(idle_probes)
        .mount(server)
        .await;
    if running > 0 {
        Mock::given(method("GET"))
            .and(path("/scraping-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_running": true,
                "progress": 0,
                "current_phase": "Phase 1: Scraping listings",
                "current_url": "https://a.example"
            })))
            .up_to_n_times(running)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/scraping-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_running": false,
            "completed": true,
            "progress": 100,
            "last_completed": "All phases finished"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn timed_out_start_is_monitored_to_completion() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    mount_reset_endpoints(&server).await;

    // Start hangs past the client timeout: fire-and-forget.
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(400))
                .set_body_json(json!({"is_running": true})),
        )
        .mount(&server)
        .await;
    // One reset probe + one pre-start check, then 31 unchanged zero-progress
    // polls before completion.
    mount_status_sequence(&server, 2, 31).await;
    // Existence check comes up empty; the fetch signals a direct save.
    Mock::given(method("GET"))
        .and(path("/download-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = run_monitor(
        selection(),
        test_settings(),
        executor_for(&server, &output),
        tx,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.phase, Phase::Completed);
    assert!(outcome.artifact.is_some());

    let mut notices = Vec::new();
    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            MonitorEvent::Notice(n) => notices.push(n),
            MonitorEvent::PhaseChanged(p) => phases.push(p),
            MonitorEvent::StatusLine(_) => {}
        }
    }

    // The timed-out start was warned about, monitoring continued anyway.
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.message.contains("timed out")));
    // The one-time zero-progress reassurance fired after 30 polls.
    assert_eq!(
        notices
            .iter()
            .filter(|n| n.message.contains("longer than usual to start"))
            .count(),
        1
    );
    assert_eq!(
        phases,
        vec![
            Phase::Resetting,
            Phase::Configuring,
            Phase::Starting,
            Phase::Polling,
            Phase::Downloading,
            Phase::Completed
        ]
    );
}

#[tokio::test]
async fn transient_start_failures_recover_with_the_fixed_delay() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    mount_reset_endpoints(&server).await;

    // Two transient failures, then a clean start.
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .mount(&server)
        .await;
    // Reset probe + three pre-start checks, no running window: the first
    // real poll already sees completion.
    mount_status_sequence(&server, 4, 0).await;
    Mock::given(method("GET"))
        .and(path("/download-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let started = Instant::now();
    let outcome = run_monitor(
        selection(),
        test_settings(),
        executor_for(&server, &output),
        tx,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.phase, Phase::Completed);
    // Two recovery waits of 30 ms each happened before polling began.
    assert!(started.elapsed() >= Duration::from_millis(60));

    let mut recovery_notices = 0;
    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            MonitorEvent::Notice(n) if n.message.contains("Attempting recovery") => {
                recovery_notices += 1;
            }
            MonitorEvent::PhaseChanged(p) => phases.push(p),
            _ => {}
        }
    }
    assert_eq!(recovery_notices, 2);
    assert_eq!(
        phases,
        vec![
            Phase::Resetting,
            Phase::Configuring,
            Phase::Starting,
            Phase::Recovering,
            Phase::Starting,
            Phase::Recovering,
            Phase::Starting,
            Phase::Polling,
            Phase::Downloading,
            Phase::Completed
        ]
    );
}

#[tokio::test]
async fn cancellation_stops_polling_and_returns_to_idle() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    mount_reset_endpoints(&server).await;

    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_running": true})))
        .mount(&server)
        .await;
    // Reset probe + pre-start check, then running forever.
    mount_status_sequence(&server, 2, u64::MAX).await;

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        canceller.cancel();
    });

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = run_monitor(
        selection(),
        test_settings(),
        executor_for(&server, &output),
        tx,
        cancel,
    )
    .await;
    assert_eq!(outcome.phase, Phase::Idle);
    assert!(outcome.artifact.is_none());

    // With the monitor gone, no further status requests arrive.
    let polls_after_cancel = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/scraping-status"))
        .count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls_later = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/scraping-status"))
        .count();
    assert_eq!(polls_after_cancel, polls_later);
}
