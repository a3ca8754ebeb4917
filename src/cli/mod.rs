//! Command-line interface for memberscan.

pub mod commands;
pub mod output;
pub mod table;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use commands::history::HistoryArgs;
use commands::init::InitArgs;
use commands::scan::ScanArgs;
use commands::snapshot::SnapshotArgs;
use commands::watch::WatchArgs;

#[derive(Parser, Debug)]
#[command(name = "memberscan")]
#[command(about = "Track community memberships across detectors and report changes", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .memberscan/config.yaml)
    #[arg(short, long, global = true, env = "MEMBERSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize memberscan configuration and database
    Init(InitArgs),

    /// Run one scan cycle for a subject
    Scan(ScanArgs),

    /// Poll every configured subject until interrupted
    Watch(WatchArgs),

    /// Show the committed snapshot for a subject
    Snapshot(SnapshotArgs),

    /// Show recent scan runs for a subject
    History(HistoryArgs),
}

/// Load and validate configuration for a command.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    ConfigLoader::load_optional(path).context("Failed to load configuration")
}

/// Print a command error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": causes,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
