//! Implementation of the `memberscan snapshot` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::adapters::sqlite::{initialize_database, SqliteSnapshotStore};
use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::Snapshot;
use crate::domain::ports::SnapshotStore;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Subject whose committed snapshot to show
    pub subject: String,

    /// Include entries that were never reported
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct SnapshotOutput {
    pub subject_id: String,
    pub snapshot: Option<Snapshot>,
    pub hidden: usize,
}

impl CommandOutput for SnapshotOutput {
    fn to_human(&self) -> String {
        let Some(snapshot) = &self.snapshot else {
            return format!("No snapshot committed for {} yet.", self.subject_id);
        };

        let mut lines = vec![format!(
            "{}: {} communities as of {}",
            snapshot.subject_id,
            snapshot.len(),
            snapshot.as_of.format("%Y-%m-%d %H:%M UTC")
        )];
        if !snapshot.is_empty() {
            lines.push(TableFormatter::new().format_communities(snapshot.communities.values()));
        }
        if self.hidden > 0 {
            lines.push(format!("{} unreported entries hidden (use --all)", self.hidden));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SnapshotArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    let store = SqliteSnapshotStore::new(pool);

    let mut snapshot = store
        .load(&args.subject)
        .await
        .with_context(|| format!("Failed to load snapshot for {}", args.subject))?;

    let mut hidden = 0;
    if let Some(snapshot) = snapshot.as_mut().filter(|_| !args.all) {
        let before = snapshot.len();
        let reported = snapshot.reported.clone();
        snapshot.communities.retain(|id, _| reported.contains(id));
        hidden = before - snapshot.len();
    }

    let output_data = SnapshotOutput {
        subject_id: args.subject,
        snapshot,
        hidden,
    };
    output(&output_data, json_mode);
    Ok(())
}
