//! Port for report delivery.

use async_trait::async_trait;

use crate::domain::errors::NotifyError;
use crate::domain::models::ChangeReport;

/// Publishes change reports to an external transport.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError>;
}
