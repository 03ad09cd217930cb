use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use outreach_core::{JobSelection, NoticeLevel, Phase};
use outreach_engine::{
    export_daily_report, spawn_daily_export, ActivityLog, ArtifactStore, BatchItem,
    MailGenClient, MailerClient, ScrapeClient, ScrapeSettings,
};
use outreach_logging::{orch_error, orch_info, orch_warn};
use tokio_util::sync::CancellationToken;

use outreach_app::config::RunConfig;
use outreach_app::driver::{run_monitor, MonitorEvent};
use outreach_app::effects::{EffectExecutor, ExecutorSettings};
use outreach_app::{flows, logging};

const SENT_MAIL_STORE: &str = "sent_mail";
const TEMPLATE_STORE: &str = "generated_template";

#[derive(Parser)]
#[command(name = "outreach", about = "Scraping-job orchestrator and mail pipeline driver")]
struct Cli {
    /// Path to the RON run configuration.
    #[arg(long, default_value = "outreach.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: scrape job, template generation, dispatch.
    Run,
    /// Export one day's activity records as a CSV report.
    Export {
        kind: ReportKind,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete every record of one activity log.
    Clear { kind: ReportKind },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportKind {
    Email,
    Template,
}

impl ReportKind {
    fn store(self) -> &'static str {
        match self {
            ReportKind::Email => SENT_MAIL_STORE,
            ReportKind::Template => TEMPLATE_STORE,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ReportKind::Email => "email",
            ReportKind::Template => "template",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(logging::LogDestination::Both);

    let config = RunConfig::load(&cli.config)?;
    match cli.command {
        Command::Run => run_pipeline(config).await,
        Command::Export { kind, date } => export_report(&config, kind, date),
        Command::Clear { kind } => clear_log(&config, kind),
    }
}

async fn run_pipeline(config: RunConfig) -> anyhow::Result<()> {
    let selection = JobSelection::new(config.targets.clone(), config.keywords.clone());

    let scrape = ScrapeClient::new(ScrapeSettings::new(config.scraper_url.clone()))
        .context("building scrape client")?;
    let store = ArtifactStore::new(config.output_dir.clone(), config.result_filename.clone());
    let executor = EffectExecutor::new(scrape, store, ExecutorSettings::default());

    let sent_log = ActivityLog::open(&config.data_dir, SENT_MAIL_STORE)?;
    let template_log = ActivityLog::open(&config.data_dir, TEMPLATE_STORE)?;

    // Daily 17:00 exports, one perpetual timer per log.
    let exports = CancellationToken::new();
    let export_tasks = [
        spawn_daily_export(
            sent_log.clone(),
            ReportKind::Email.label().to_string(),
            config.data_dir.clone(),
            config.export_hour,
            exports.clone(),
        ),
        spawn_daily_export(
            template_log.clone(),
            ReportKind::Template.label().to_string(),
            config.data_dir.clone(),
            config.export_hour,
            exports.clone(),
        ),
    ];

    // Ctrl-C is the CLI's "navigate away": it cancels the run, which tears
    // down every monitor timer.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                MonitorEvent::PhaseChanged(phase) => orch_info!("Phase: {phase:?}"),
                MonitorEvent::StatusLine(line) => orch_info!("{line}"),
                MonitorEvent::Notice(notice) => match notice.level {
                    NoticeLevel::Error => orch_error!("{}", notice.message),
                    NoticeLevel::Warning => orch_warn!("{}", notice.message),
                    _ => orch_info!("{}", notice.message),
                },
            }
        }
    });

    let outcome = run_monitor(
        selection,
        config.monitor_settings(),
        executor,
        event_tx,
        cancel.clone(),
    )
    .await;
    let _ = printer.await;

    match outcome.phase {
        Phase::Completed => {
            orch_info!("Scrape job completed; artifact at {:?}", outcome.artifact);
            run_mail_flows(&config, &template_log, &sent_log).await?;
        }
        Phase::Idle => orch_info!("Run cancelled"),
        phase => orch_error!("Run ended in {phase:?}"),
    }

    exports.cancel();
    for task in export_tasks {
        let _ = task.await;
    }
    Ok(())
}

async fn run_mail_flows(
    config: &RunConfig,
    template_log: &ActivityLog,
    sent_log: &ActivityLog,
) -> anyhow::Result<()> {
    let Some(items_file) = &config.items_file else {
        orch_info!("No items file configured; skipping the mail flows");
        return Ok(());
    };
    let items = load_items(items_file)?;
    if items.is_empty() {
        orch_warn!("Items file {items_file:?} holds no records; nothing to generate");
        return Ok(());
    }

    let mailgen = MailGenClient::new(
        config.mailgen_url.clone(),
        config.persona.clone(),
        config.generate_timeout(),
    )
    .context("building mail-generation client")?;
    let mailer = MailerClient::new(config.mailer_url.clone(), std::time::Duration::from_secs(30))
        .context("building mailer client")?;

    let (generate_report, generated) = flows::run_generate_flow(
        items,
        &mailgen,
        template_log,
        std::time::Duration::from_millis(config.generate_delay_ms),
    )
    .await;
    orch_info!(
        "Generate flow: {} ok, {} failed",
        generate_report.succeeded(),
        generate_report.failed()
    );
    if generated.is_empty() {
        orch_error!("Failed to generate any mail templates");
        return Ok(());
    }

    let send_report = flows::run_send_flow(
        generated,
        &mailgen,
        &mailer,
        &config.relay_domain,
        sent_log,
        std::time::Duration::from_millis(config.send_delay_ms),
    )
    .await;
    orch_info!(
        "Send flow: {} ok, {} failed",
        send_report.succeeded(),
        send_report.failed()
    );
    Ok(())
}

fn load_items(path: &Path) -> anyhow::Result<Vec<BatchItem>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading items {path:?}"))?;
    let items: Vec<BatchItem> =
        serde_json::from_str(&content).with_context(|| format!("parsing items {path:?}"))?;
    Ok(items)
}

fn export_report(
    config: &RunConfig,
    kind: ReportKind,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let log = ActivityLog::open(&config.data_dir, kind.store())?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    match export_daily_report(&log, kind.label(), date, &config.data_dir)? {
        Some(summary) => {
            orch_info!(
                "Exported {} records ({}% success) to {:?}",
                summary.total,
                summary.success_rate,
                summary.path
            );
        }
        None => {
            orch_warn!("No {} records to export for {date}", kind.label());
        }
    }
    Ok(())
}

fn clear_log(config: &RunConfig, kind: ReportKind) -> anyhow::Result<()> {
    let log = ActivityLog::open(&config.data_dir, kind.store())?;
    log.clear()?;
    orch_info!("Cleared the {} activity log", kind.label());
    Ok(())
}
