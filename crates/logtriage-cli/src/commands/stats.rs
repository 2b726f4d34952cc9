//! `logtriage stats`

use crate::formatters;
use crate::setup;
use crate::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use logtriage_config::EngineConfig;
use logtriage_core::ProblemStats;
use logtriage_scan::ClassificationLinker;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Only count these type keys (can be specified multiple times)
    #[arg(long = "type", value_name = "KEY")]
    pub types: Vec<String>,

    /// Problem library JSON file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    pub problems: Option<PathBuf>,
}

pub async fn run_stats(args: StatsArgs, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let linker = ClassificationLinker::new(setup::problem_library(config, args.problems.as_deref())?);

    let stats = if args.types.is_empty() {
        linker.global_stats().await
    } else {
        let keys: BTreeSet<String> = args.types.into_iter().collect();
        linker.link(&keys).await.map(|by_type| ProblemStats {
            total: by_type.values().sum(),
            by_type,
        })
    }
    .context("Failed to query problem library")?;

    println!("{}", formatters::formatter(format).stats(&stats)?);
    Ok(())
}
