use std::time::Duration;

use serde::Serialize;

use crate::mailgen_client::sanitize_subject;
use crate::types::{map_reqwest_error, ClientError};

/// One mail ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
struct SendPayload<'a> {
    mail_id: &'a str,
    subject: String,
    mail_body: &'a str,
}

/// Client for the plain dispatch service.
#[derive(Debug, Clone)]
pub struct MailerClient {
    http: reqwest::Client,
    base_url: String,
}

impl MailerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn send(&self, mail: &OutgoingMail) -> Result<(), ClientError> {
        let payload = SendPayload {
            mail_id: &mail.recipient,
            subject: sanitize_subject(&mail.subject),
            mail_body: &mail.body,
        };
        let response = self
            .http
            .post(format!("{}/send-mail", self.base_url.trim_end_matches('/')))
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ClientError::Http(response.status().as_u16()));
        }
        Ok(())
    }
}
