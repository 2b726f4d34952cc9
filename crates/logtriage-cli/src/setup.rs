//! Shared command setup: config, rules, analyzer and problem library.

use anyhow::{bail, Context, Result};
use logtriage_config::{ConfigManager, EngineConfig};
use logtriage_core::Rule;
use logtriage_rule_engine::{Compilation, RuleLoader, SnapshotCache};
use logtriage_scan::{Analyzer, JsonProblemLibrary, ScanOptions};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Compiled rule snapshots shared by every command in this process.
static SNAPSHOTS: LazyLock<SnapshotCache> = LazyLock::new(SnapshotCache::default);

pub async fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    ConfigManager::load_or_default(path).await.with_context(|| match path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })
}

/// Where rules come from for one command.
#[derive(Debug, Default)]
pub struct RuleSource {
    /// Extra rule files or directories
    pub paths: Vec<PathBuf>,
    /// Leave the built-in rules out
    pub no_builtin: bool,
}

impl RuleSource {
    fn loader(&self, config: &EngineConfig) -> RuleLoader {
        RuleLoader::new()
            .with_builtin(config.rules.include_builtin && !self.no_builtin)
            .with_paths(config.rules.paths.iter().chain(self.paths.iter()).cloned())
    }

    /// Load the effective rule list.
    pub async fn load(&self, config: &EngineConfig) -> Result<Vec<Rule>> {
        let rules = self
            .loader(config)
            .load_all()
            .await
            .context("Failed to load rules")?;
        debug!(rules = rules.len(), "rules loaded");
        Ok(rules)
    }
}

/// Compile `rules`, reusing an identical earlier snapshot.
pub fn compile_rules(rules: &[Rule]) -> Result<Compilation> {
    SNAPSHOTS
        .get_or_compile(rules)
        .context("Failed to fingerprint rules")
}

/// Compile `rules` into an analyzer configured from `options`.
pub fn build_analyzer(rules: &[Rule], options: ScanOptions) -> Result<Analyzer> {
    Ok(Analyzer::new(compile_rules(rules)?).with_options(options))
}

/// Problem library from the command line or the config file.
pub fn problem_library(
    config: &EngineConfig,
    override_path: Option<&Path>,
) -> Result<JsonProblemLibrary> {
    let Some(path) = override_path.or(config.problems.library.as_deref()) else {
        bail!("No problem library configured. Pass --problems or set [problems] library in the config file.");
    };
    Ok(JsonProblemLibrary::new(path))
}
