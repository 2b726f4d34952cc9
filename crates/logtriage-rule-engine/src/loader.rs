//! Multi-source rule loading
//!
//! Loads rules from the embedded built-in catalog and from rule files on
//! disk. Supported formats:
//!
//! - `.json`: an array of rules, or `{"rules": [...]}`
//! - `.toml`: `[[rules]]` tables
//!
//! The loader only assembles configuration; compiling (and rejecting bad
//! patterns) is the compiler's job.

use crate::built_in::builtin_rules;
use crate::constants::{MAX_DIRECTORY_DEPTH, MAX_RULE_FILE_SIZE};
use crate::{Result, RuleError};
use logtriage_core::Rule;
use serde::Deserialize;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk rule file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Toml,
}

impl RuleFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(RuleFormat::Json),
            "toml" => Some(RuleFormat::Toml),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRuleDocument {
    List(Vec<Rule>),
    Wrapped { rules: Vec<Rule> },
}

#[derive(Deserialize)]
struct TomlRuleFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Parse the contents of one rule file.
pub fn parse_rules(contents: &str, format: RuleFormat) -> Result<Vec<Rule>> {
    match format {
        RuleFormat::Json => Ok(match serde_json::from_str(contents)? {
            JsonRuleDocument::List(rules) => rules,
            JsonRuleDocument::Wrapped { rules } => rules,
        }),
        RuleFormat::Toml => Ok(toml::from_str::<TomlRuleFile>(contents)?.rules),
    }
}

/// Sort rules by priority, higher first. Equal priorities keep their
/// loaded order.
///
/// The resulting order is the declaration order the compiler preserves.
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by_key(|rule| Reverse(rule.priority.unwrap_or(0)));
}

/// Loads rules from the built-in catalog and rule files
#[derive(Debug, Clone)]
pub struct RuleLoader {
    include_builtin: bool,
    paths: Vec<PathBuf>,
}

impl Default for RuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleLoader {
    /// A loader with the built-in catalog and no extra paths
    pub fn new() -> Self {
        Self {
            include_builtin: true,
            paths: Vec::new(),
        }
    }

    pub fn with_builtin(mut self, include_builtin: bool) -> Self {
        self.include_builtin = include_builtin;
        self
    }

    /// Add a rule file or a directory of rule files.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Load all rules from all sources, sorted with [`sort_rules`].
    pub async fn load_all(&self) -> Result<Vec<Rule>> {
        let mut all_rules = Vec::new();

        if self.include_builtin {
            all_rules.extend(builtin_rules()?);
        }

        for path in &self.paths {
            all_rules.extend(self.load_from_path(path).await?);
        }

        sort_rules(&mut all_rules);

        info!(
            rules = all_rules.len(),
            sources = self.paths.len(),
            builtin = self.include_builtin,
            "loaded rules"
        );

        Ok(all_rules)
    }

    /// Load one file, or every rule file under a directory.
    pub async fn load_from_path(&self, path: &Path) -> Result<Vec<Rule>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_error(path, e))?;

        if metadata.is_dir() {
            self.load_from_directory(path).await
        } else {
            self.load_from_file(path).await
        }
    }

    async fn load_from_directory(&self, dir: &Path) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();

        for path in discover_rule_files(dir) {
            rules.extend(self.load_from_file(&path).await?);
        }

        Ok(rules)
    }

    /// Load rules from a single JSON or TOML file
    pub async fn load_from_file(&self, path: &Path) -> Result<Vec<Rule>> {
        let format = RuleFormat::from_path(path)
            .ok_or_else(|| RuleError::UnsupportedFormat(path.display().to_string()))?;

        // Check file size before reading
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_error(path, e))?;
        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(RuleError::FileTooLarge {
                path: path.display().to_string(),
                size: metadata.len(),
                limit: MAX_RULE_FILE_SIZE,
            });
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(path, e))?;

        let rules = parse_rules(&contents, format).map_err(|e| RuleError::LoadError {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        debug!(path = %path.display(), rules = rules.len(), "loaded rule file");
        Ok(rules)
    }
}

fn load_error(path: &Path, e: std::io::Error) -> RuleError {
    RuleError::LoadError {
        path: path.display().to_string(),
        source: Box::new(e),
    }
}

/// Rule files under `dir`, sorted by path for a stable load order.
fn discover_rule_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(false)
        .max_depth(MAX_DIRECTORY_DEPTH)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let hidden = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with('.'))
                .unwrap_or(false);
            !hidden && RuleFormat::from_path(entry.path()).is_some()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    files
}
