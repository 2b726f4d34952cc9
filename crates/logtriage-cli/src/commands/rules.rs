//! `logtriage rules`

use crate::formatters;
use crate::setup::{self, RuleSource};
use crate::OutputFormat;
use anyhow::{bail, Result};
use clap::Subcommand;
use logtriage_config::EngineConfig;
use logtriage_core::RuleCompilationError;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Load and compile rules, reporting every rule that fails
    Check {
        /// Rule files or directories to check (defaults to the configured rule set)
        files: Vec<PathBuf>,
    },

    /// Print the effective rule set
    List {
        /// Leave the built-in rules out
        #[arg(long)]
        no_builtin: bool,
    },
}

/// Outcome of `rules check`.
#[derive(Debug, Serialize)]
pub struct RuleCheck {
    /// Rules loaded, disabled ones included
    pub loaded: usize,
    /// Rules that made it into the snapshot
    pub compiled: usize,
    pub errors: Vec<RuleCompilationError>,
}

impl RuleCheck {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub async fn handle_rules_command(
    cmd: RulesCommand,
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        RulesCommand::Check { files } => check_rules(files, config, format).await,
        RulesCommand::List { no_builtin } => list_rules(no_builtin, config, format).await,
    }
}

async fn check_rules(files: Vec<PathBuf>, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let rules = if files.is_empty() {
        RuleSource::default().load(config).await?
    } else {
        // Explicit files are checked on their own
        let mut isolated = config.clone();
        isolated.rules.paths.clear();
        RuleSource {
            paths: files,
            no_builtin: true,
        }
        .load(&isolated)
        .await?
    };

    let compilation = setup::compile_rules(&rules)?;
    let check = RuleCheck {
        loaded: rules.len(),
        compiled: compilation.snapshot.len(),
        errors: compilation.errors,
    };

    println!("{}", formatters::formatter(format).rule_check(&check)?);

    if !check.is_clean() {
        bail!("{} rule(s) failed to compile", check.errors.len());
    }
    Ok(())
}

async fn list_rules(no_builtin: bool, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let source = RuleSource {
        paths: Vec::new(),
        no_builtin,
    };
    let rules = source.load(config).await?;
    println!("{}", formatters::formatter(format).rules(&rules)?);
    Ok(())
}
