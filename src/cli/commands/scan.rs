//! Implementation of the `memberscan scan` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::ChangeReport;
use crate::infrastructure::setup::{build_scan_cycle, build_sink};
use crate::services::notifier::ReportFormatter;
use crate::services::scan_cycle::CancelSignal;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Subject to scan
    pub subject: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub report: ChangeReport,
    pub communities: usize,
    pub rejected: usize,
    pub notify_error: Option<String>,
    #[serde(skip)]
    rendered: String,
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.rendered.clone()];
        if self.rejected > 0 {
            lines.push(format!("{} malformed candidate(s) dropped", self.rejected));
        }
        if let Some(error) = &self.notify_error {
            lines.push(format!("Snapshot committed but the report was not delivered: {error}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ScanArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let sink = build_sink(&config, json_mode)?;
    let cycle = Arc::new(build_scan_cycle(&config, sink).await?);
    let formatter = ReportFormatter::new(&config.notify);

    let (cancel, signal) = CancelSignal::pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scan");
            cancel.cancel();
        }
    });

    let result = cycle.run(&args.subject, &signal).await;
    interrupt.abort();

    match result {
        Ok(outcome) => {
            let output_data = ScanOutput {
                success: true,
                communities: outcome.snapshot.len(),
                rejected: outcome.rejected,
                notify_error: outcome.notify_error.map(|e| e.to_string()),
                rendered: formatter.render(&outcome.report),
                report: outcome.report,
            };
            output(&output_data, json_mode);
            Ok(())
        }
        Err(err) => {
            cycle.report_failure(&args.subject, &err, None).await;
            Err(err).with_context(|| format!("Scan failed for {}", args.subject))
        }
    }
}
