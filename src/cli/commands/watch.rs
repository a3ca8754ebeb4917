//! Implementation of the `memberscan watch` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::SubjectConfig;
use crate::infrastructure::setup::{build_scan_cycle, build_sink};
use crate::services::scheduler::{Scheduler, SchedulerEvent, SubjectStatus};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch only these subjects (defaults to every configured subject)
    #[arg(short, long, value_delimiter = ',')]
    pub subject: Vec<String>,

    /// Override the polling interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
pub struct WatchOutput {
    pub subjects: Vec<SubjectStatus>,
}

impl CommandOutput for WatchOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Stopped watching {} subject(s):", self.subjects.len())];
        for status in &self.subjects {
            lines.push(format!(
                "  {:<24} cycles {:>4}  failures {:>3}{}",
                status.subject_id,
                status.cycles,
                status.failures,
                status
                    .last_error
                    .as_deref()
                    .map(|e| format!("  last error: {e}"))
                    .unwrap_or_default()
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: WatchArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !args.subject.is_empty() {
        config.subjects.retain(|s| args.subject.contains(&s.id));
        for id in &args.subject {
            if !config.subjects.iter().any(|s| &s.id == id) {
                config.subjects.push(SubjectConfig {
                    id: id.clone(),
                    interval_secs: None,
                });
            }
        }
    }
    if let Some(secs) = args.interval {
        anyhow::ensure!(secs > 0, "--interval must be greater than zero");
        for subject in &mut config.subjects {
            subject.interval_secs = Some(secs);
        }
    }
    anyhow::ensure!(
        !config.subjects.is_empty(),
        "No subjects to watch; add subjects to the config or pass --subject"
    );

    let sink = build_sink(&config, json_mode)?;
    let cycle = Arc::new(build_scan_cycle(&config, sink).await?);
    let scheduler = Scheduler::from_config(cycle, &config);
    info!(subjects = scheduler.subject_count(), "Watching subjects");

    let (handle, mut events) = scheduler.start().await;
    let mut running = config.subjects.len();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for interrupt")?;
                info!("Interrupt received, stopping scheduler");
                handle.shutdown();
                break;
            }
            event = events.recv() => match event {
                Some(SchedulerEvent::CycleFailed { subject_id, error, retry_in, .. }) => {
                    warn!(subject_id = %subject_id, error = %error, retry_in_secs = retry_in.as_secs(), "Cycle failed");
                }
                Some(SchedulerEvent::SubjectStopped { .. }) => {
                    running = running.saturating_sub(1);
                    if running == 0 {
                        break;
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    // Keep draining so stopping tasks never block on a full channel.
    let drain = tokio::spawn(async move { while events.recv().await.is_some() {} });
    let statuses = tokio::time::timeout(Duration::from_secs(30), handle.join())
        .await
        .context("Timed out waiting for subjects to stop")?;
    drain.abort();

    output(&WatchOutput { subjects: statuses }, json_mode);
    Ok(())
}
