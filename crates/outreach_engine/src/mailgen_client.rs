use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{map_reqwest_error, BatchItem, ClientError};

/// Generated mail template, split from the raw model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplate {
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
struct GeneratePayload<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(rename = "dateOfPost")]
    date_of_post: &'a str,
    persona: &'a str,
    link: &'a str,
    city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateReply {
    reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
struct DispatchReply {
    #[serde(default)]
    success: bool,
}

/// Client for the template-generation service. Generation is slow (large
/// model); the timeout is minutes, not seconds.
#[derive(Debug, Clone)]
pub struct MailGenClient {
    http: reqwest::Client,
    base_url: String,
    persona: String,
}

impl MailGenClient {
    pub fn new(
        base_url: impl Into<String>,
        persona: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            persona: persona.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn payload<'a>(&'a self, item: &'a BatchItem, with_recipient: bool) -> GeneratePayload<'a> {
        GeneratePayload {
            title: &item.title,
            description: &item.description,
            date_of_post: &item.date,
            persona: &self.persona,
            link: &item.link,
            city: &item.city,
            recipient: with_recipient.then_some(item.recipient.as_str()),
        }
    }

    /// Generate a mail template for one item; returns the raw model reply.
    pub async fn generate(&self, item: &BatchItem) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/generate/"))
            .json(&self.payload(item, false))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        let reply = response
            .json::<GenerateReply>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        Ok(reply.reply)
    }

    /// Generate and send in one remote step.
    pub async fn dispatch(&self, item: &BatchItem) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/send/"))
            .json(&self.payload(item, true))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        let reply = response
            .json::<DispatchReply>()
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        if !reply.success {
            return Err(ClientError::Rejected("service reported failure".into()));
        }
        Ok(())
    }
}

/// Split a raw reply at the first blank line into subject and body.
///
/// A leading `Subject:` prefix is dropped and the subject is flattened to a
/// single line. A reply without a blank-line boundary yields the whole text
/// as body with a placeholder subject.
pub fn split_subject_body(raw: &str) -> MailTemplate {
    match raw.split_once("\n\n") {
        Some((subject_line, body)) => {
            let subject = subject_line
                .trim()
                .strip_prefix("Subject:")
                .unwrap_or(subject_line)
                .trim();
            MailTemplate {
                subject: sanitize_subject(subject),
                body: body.trim().to_string(),
            }
        }
        None => MailTemplate {
            subject: sanitize_subject(""),
            body: raw.trim().to_string(),
        },
    }
}

/// Flatten CR/LF out of a subject so it cannot break mail headers.
pub fn sanitize_subject(subject: &str) -> String {
    let cleaned = subject
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "No Subject".to_string()
    } else {
        cleaned.to_string()
    }
}
