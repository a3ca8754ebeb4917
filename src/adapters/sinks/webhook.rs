//! Sink that POSTs reports as JSON to a webhook.
//!
//! The payload carries the structured report plus its rendered text, so
//! chat integrations can post `text` directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::errors::NotifyError;
use crate::domain::models::ChangeReport;
use crate::domain::ports::NotificationSink;
use crate::services::notifier::ReportFormatter;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: String,
    report: &'a ChangeReport,
}

#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    http: Client,
    formatter: ReportFormatter,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, formatter: ReportFormatter) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            formatter,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            text: self.formatter.render(report),
            report,
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}
