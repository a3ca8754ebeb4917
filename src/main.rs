//! memberscan CLI entry point.

use clap::Parser;

use memberscan::cli::{load_config, Cli, Commands};
use memberscan::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging follows the config file when it loads; init and broken
    // configs fall back to defaults so the error itself still gets printed.
    let mut log_config = match &cli.command {
        Commands::Init(_) => LogConfig::default(),
        _ => load_config(cli.config.as_deref())
            .map(|config| LogConfig::from(&config.logging))
            .unwrap_or_default(),
    };
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init(args) => memberscan::cli::commands::init::execute(args, cli.json).await,
        Commands::Scan(args) => memberscan::cli::commands::scan::execute(args, config_path, cli.json).await,
        Commands::Watch(args) => memberscan::cli::commands::watch::execute(args, config_path, cli.json).await,
        Commands::Snapshot(args) => memberscan::cli::commands::snapshot::execute(args, config_path, cli.json).await,
        Commands::History(args) => memberscan::cli::commands::history::execute(args, config_path, cli.json).await,
    };

    if let Err(err) = result {
        memberscan::cli::handle_error(err, cli.json);
    }
}
