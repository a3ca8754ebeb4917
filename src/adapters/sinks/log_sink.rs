//! Sink that writes reports to the tracing pipeline.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::errors::NotifyError;
use crate::domain::models::ChangeReport;
use crate::domain::ports::NotificationSink;
use crate::services::notifier::ReportFormatter;

#[derive(Debug, Clone, Default)]
pub struct LogSink {
    formatter: ReportFormatter,
}

impl LogSink {
    pub fn new(formatter: ReportFormatter) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError> {
        let text = self.formatter.render(report);
        if report.is_failure() {
            warn!(subject_id = %report.subject_id, report = %text.trim_end(), "Change report");
        } else {
            info!(subject_id = %report.subject_id, report = %text.trim_end(), "Change report");
        }
        Ok(())
    }
}
