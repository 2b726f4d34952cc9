//! logtriage CLI - rule-based log issue detection.

mod commands;
mod formatters;
mod logging;
mod setup;

use anyhow::Result;
use clap::Parser;
use logtriage_config::ConfigManager;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "logtriage")]
#[command(about = "Detect and classify issues in log files with configurable rules", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long = "output", value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Analyze log files or pasted text
    Analyze(commands::AnalyzeArgs),

    /// Inspect the rule set
    Rules {
        #[command(subcommand)]
        command: commands::RulesCommand,
    },

    /// Show problem library counts
    Stats(commands::StatsArgs),

    /// Manage logtriage configuration
    Config {
        #[command(subcommand)]
        command: commands::ConfigCommand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        // Config commands must work when the file is missing or broken
        Command::Config { command } => {
            logging::init_tracing(cli.verbose, None);
            commands::handle_config_command(command, config_path).await
        }
        Command::Analyze(args) => {
            let manager = prepare(config_path, cli.verbose).await?;
            commands::run_analyze(args, manager.config(), cli.format).await
        }
        Command::Rules { command } => {
            let manager = prepare(config_path, cli.verbose).await?;
            commands::handle_rules_command(command, manager.config(), cli.format).await
        }
        Command::Stats(args) => {
            let manager = prepare(config_path, cli.verbose).await?;
            commands::run_stats(args, manager.config(), cli.format).await
        }
    }
}

/// Load the config file and install logging with its filter.
async fn prepare(config_path: Option<&Path>, verbose: u8) -> Result<ConfigManager> {
    let manager = setup::load_config(config_path).await?;
    logging::init_tracing(verbose, manager.config().logging.filter.as_deref());
    Ok(manager)
}
