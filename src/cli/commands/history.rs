//! Implementation of the `memberscan history` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::adapters::sqlite::{initialize_database, SqliteRunRepository};
use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::ScanRun;
use crate::domain::ports::RunRepository;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Subject whose runs to list
    pub subject: String,

    /// Maximum number of runs to display
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub subject_id: String,
    pub runs: Vec<ScanRun>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return format!("No scan runs recorded for {}.", self.subject_id);
        }
        format!(
            "Last {} run(s) for {}:\n{}",
            self.runs.len(),
            self.subject_id,
            TableFormatter::new().format_runs(&self.runs)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: HistoryArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;

    let runs = SqliteRunRepository::new(pool)
        .recent(&args.subject, args.limit)
        .await
        .with_context(|| format!("Failed to load scan history for {}", args.subject))?;

    output(
        &HistoryOutput {
            subject_id: args.subject,
            runs,
        },
        json_mode,
    );
    Ok(())
}
