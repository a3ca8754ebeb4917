//! Sink that prints reports to stdout, as text or JSON lines.

use async_trait::async_trait;

use crate::domain::errors::NotifyError;
use crate::domain::models::ChangeReport;
use crate::domain::ports::NotificationSink;
use crate::services::notifier::ReportFormatter;

#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    formatter: ReportFormatter,
    json: bool,
}

impl ConsoleSink {
    pub fn new(formatter: ReportFormatter, json: bool) -> Self {
        Self { formatter, json }
    }

    /// Text that `publish` prints for `report`.
    pub fn render(&self, report: &ChangeReport) -> Result<String, NotifyError> {
        if self.json {
            serde_json::to_string(report).map_err(|e| NotifyError::Encoding(e.to_string()))
        } else {
            Ok(self.formatter.render(report).trim_end().to_string())
        }
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError> {
        println!("{}", self.render(report)?);
        Ok(())
    }
}
