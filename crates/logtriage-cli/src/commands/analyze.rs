//! `logtriage analyze`

use crate::formatters;
use crate::setup::{self, RuleSource};
use crate::OutputFormat;
use anyhow::{bail, Context, Result};
use clap::Args;
use logtriage_config::EngineConfig;
use logtriage_scan::{
    AnalysisReport, BulkAnalyzer, CancellationToken, ClassificationLinker, MAX_CONTEXT_WINDOW,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Name reported for `--text` input
pub const TEXT_SOURCE: &str = "<text>";

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Log files to analyze
    #[arg(value_name = "PATHS", required_unless_present = "text")]
    pub paths: Vec<PathBuf>,

    /// Analyze this text instead of files
    #[arg(long, conflicts_with = "paths")]
    pub text: Option<String>,

    /// Additional rule files or directories (can be specified multiple times)
    #[arg(long = "rules", value_name = "FILE")]
    pub rules: Vec<PathBuf>,

    /// Leave the built-in rules out
    #[arg(long)]
    pub no_builtin: bool,

    /// Lines of context on each side of a match
    #[arg(short, long, value_name = "N")]
    pub window: Option<usize>,

    /// Add problem library counts for every issue type
    #[arg(long)]
    pub link: bool,

    /// Problem library JSON file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    pub problems: Option<PathBuf>,

    /// Per-file time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// What happened to one input.
#[derive(Debug, Serialize)]
pub struct InputOutcome {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_links: Option<BTreeMap<String, usize>>,
}

impl InputOutcome {
    pub fn new(source: impl Into<String>, outcome: logtriage_core::Result<AnalysisReport>) -> Self {
        let (report, error) = match outcome {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            source: source.into(),
            report,
            error,
            problem_links: None,
        }
    }
}

pub async fn run_analyze(
    args: AnalyzeArgs,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut options = config.scan_options();
    if let Some(window) = args.window {
        if window > MAX_CONTEXT_WINDOW {
            bail!("--window must be at most {}, got {}", MAX_CONTEXT_WINDOW, window);
        }
        options.context_window = window;
    }

    let linker = if args.link {
        Some(ClassificationLinker::new(setup::problem_library(
            config,
            args.problems.as_deref(),
        )?))
    } else {
        None
    };

    let source = RuleSource {
        paths: args.rules.clone(),
        no_builtin: args.no_builtin,
    };
    let rules = source.load(config).await?;
    let analyzer = setup::build_analyzer(&rules, options)?;
    if analyzer.snapshot().is_empty() {
        warn!("no enabled rules compiled; every input will come back clean");
    }

    let token = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(token.clone());

    let mut outcomes = match args.text {
        Some(text) => {
            let outcome = analyzer.analyze_reader(text.as_bytes(), TEXT_SOURCE, None, &token);
            vec![InputOutcome::new(TEXT_SOURCE, outcome)]
        }
        None => {
            let timeout = args
                .timeout
                .map(Duration::from_secs)
                .or_else(|| config.bulk_timeout());
            BulkAnalyzer::new(analyzer)
                .with_max_concurrent(config.bulk.max_concurrent)
                .with_timeout(timeout)
                .analyze_files(args.paths, &token)
                .await
                .into_iter()
                .map(|o| InputOutcome::new(o.path.display().to_string(), o.outcome))
                .collect()
        }
    };

    ctrl_c.abort();

    if let Some(linker) = &linker {
        for outcome in &mut outcomes {
            if let Some(report) = &outcome.report {
                let links = linker
                    .link_result(&report.result)
                    .await
                    .context("Failed to query problem library")?;
                outcome.problem_links = Some(links);
            }
        }
    }

    println!("{}", formatters::formatter(format).analysis(&outcomes)?);

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        bail!("{} of {} input(s) could not be analyzed", failed, outcomes.len());
    }
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling analysis");
            token.cancel();
        }
    })
}
