use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use outreach_engine::{
    run_batch, split_subject_body, ActivityLog, BatchEvent, BatchItem, BatchReport,
    BatchSettings, BatchSink, ItemAck, ItemFailure, ItemOp, MailGenClient, MailTemplate,
    MailerClient, OutgoingMail, RelayDomainRouter, StandardRouter,
};
use outreach_logging::{orch_info, orch_warn};

/// One successfully generated template, paired with its source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMail {
    pub item: BatchItem,
    pub template: MailTemplate,
}

/// Sink that narrates batch progress into the log.
pub struct LogBatchSink {
    label: &'static str,
}

impl LogBatchSink {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl BatchSink for LogBatchSink {
    fn emit(&self, event: BatchEvent) {
        match event {
            BatchEvent::ItemStarted { index, total, title } => {
                orch_info!("{} {}/{}: {}", self.label, index + 1, total, title);
            }
            BatchEvent::ItemFinished { index, total, title, status } => {
                orch_info!(
                    "{} {}/{} finished ({:?}): {}",
                    self.label,
                    index + 1,
                    total,
                    status,
                    title
                );
            }
        }
    }
}

struct GenerateTemplateOp<'a> {
    client: &'a MailGenClient,
    collected: Mutex<Vec<GeneratedMail>>,
}

#[async_trait]
impl ItemOp for GenerateTemplateOp<'_> {
    async fn apply(&self, item: &BatchItem) -> Result<ItemAck, ItemFailure> {
        let raw = self
            .client
            .generate(item)
            .await
            .map_err(|e| ItemFailure(e.to_string()))?;
        let template = split_subject_body(&raw);
        let subject = template.subject.clone();
        self.collected
            .lock()
            .expect("collected templates lock")
            .push(GeneratedMail {
                item: item.clone(),
                template,
            });
        Ok(ItemAck {
            subject: Some(subject),
        })
    }
}

/// Generate a mail template for every selected item, sequentially and rate
/// limited. Items whose generation fails are logged and dropped; they do
/// not reach the send flow.
pub async fn run_generate_flow(
    items: Vec<BatchItem>,
    client: &MailGenClient,
    log: &ActivityLog,
    inter_item_delay: Duration,
) -> (BatchReport, Vec<GeneratedMail>) {
    let op = GenerateTemplateOp {
        client,
        collected: Mutex::new(Vec::new()),
    };
    let sink = LogBatchSink::new("generate");
    let settings = BatchSettings { inter_item_delay };

    // Generation has no secondary service to fall back to.
    let report = run_batch(items, &StandardRouter, &op, None, log, &sink, &settings).await;

    let generated = op
        .collected
        .into_inner()
        .expect("collected templates lock");
    orch_info!(
        "Generated {} templates ({} failures)",
        generated.len(),
        report.failed()
    );
    (report, generated)
}

struct GptDispatchOp<'a> {
    client: &'a MailGenClient,
    subjects: Arc<HashMap<String, String>>,
}

#[async_trait]
impl ItemOp for GptDispatchOp<'_> {
    async fn apply(&self, item: &BatchItem) -> Result<ItemAck, ItemFailure> {
        self.client
            .dispatch(item)
            .await
            .map_err(|e| ItemFailure(e.to_string()))?;
        Ok(ItemAck {
            subject: self.subjects.get(&item.link).cloned(),
        })
    }
}

struct MailerSendOp<'a> {
    client: &'a MailerClient,
    templates: Arc<HashMap<String, MailTemplate>>,
}

#[async_trait]
impl ItemOp for MailerSendOp<'_> {
    async fn apply(&self, item: &BatchItem) -> Result<ItemAck, ItemFailure> {
        let template = self
            .templates
            .get(&item.link)
            .ok_or_else(|| ItemFailure(format!("no template generated for {}", item.link)))?;
        let mail = OutgoingMail {
            recipient: item.recipient.clone(),
            subject: template.subject.clone(),
            body: template.body.clone(),
        };
        self.client
            .send(&mail)
            .await
            .map_err(|e| ItemFailure(e.to_string()))?;
        Ok(ItemAck {
            subject: Some(template.subject.clone()),
        })
    }
}

/// Send every generated mail: the unified generate-and-send service first,
/// the plain dispatch service as the per-item fallback, and dispatch-only
/// for relay-domain recipients.
pub async fn run_send_flow(
    mails: Vec<GeneratedMail>,
    mailgen: &MailGenClient,
    mailer: &MailerClient,
    relay_domain: &str,
    log: &ActivityLog,
    inter_item_delay: Duration,
) -> BatchReport {
    let templates: Arc<HashMap<String, MailTemplate>> = Arc::new(
        mails
            .iter()
            .map(|m| (m.item.link.clone(), m.template.clone()))
            .collect(),
    );
    let subjects: Arc<HashMap<String, String>> = Arc::new(
        mails
            .iter()
            .map(|m| (m.item.link.clone(), m.template.subject.clone()))
            .collect(),
    );
    let items: Vec<BatchItem> = mails.into_iter().map(|m| m.item).collect();

    let primary = GptDispatchOp {
        client: mailgen,
        subjects,
    };
    let fallback = MailerSendOp {
        client: mailer,
        templates,
    };
    let sink = LogBatchSink::new("send");
    let settings = BatchSettings { inter_item_delay };

    let report = run_batch(
        items,
        &RelayDomainRouter::new(relay_domain),
        &primary,
        Some(&fallback as &dyn ItemOp),
        log,
        &sink,
        &settings,
    )
    .await;

    if report.failed() > 0 {
        orch_warn!(
            "{} of {} mails failed to send",
            report.failed(),
            report.processed.len()
        );
    }
    report
}
