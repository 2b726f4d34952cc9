//! Classification linking
//!
//! Maps the type keys of an analysis to the number of remediation documents
//! filed under each key in the external problem library. The library is
//! only ever read.

use async_trait::async_trait;
use logtriage_core::{AnalysisResult, Error, ProblemEntry, ProblemStats, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Count `entries` per type key.
///
/// With a non-empty `wanted` set only entries filed under one of those keys
/// are counted and `total` is their sum. Otherwise every entry counts and
/// `total` is the number of entries. Entries without a type count under `""`.
pub fn count_problems(entries: &[ProblemEntry], wanted: Option<&BTreeSet<String>>) -> ProblemStats {
    let wanted = wanted.filter(|set| !set.is_empty());
    let mut by_type = BTreeMap::new();

    for entry in entries {
        let error_type = entry.error_type.as_deref().unwrap_or("");
        if wanted.is_some_and(|set| !set.contains(error_type)) {
            continue;
        }
        *by_type.entry(error_type.to_string()).or_insert(0) += 1;
    }

    let total = match wanted {
        Some(_) => by_type.values().sum(),
        None => entries.len(),
    };

    ProblemStats { total, by_type }
}

/// Read-only access to the problem library.
#[async_trait]
pub trait ProblemLibrary: Send + Sync {
    /// Counts per type key, scoped to `type_keys` when given.
    async fn problem_stats(&self, type_keys: Option<&BTreeSet<String>>) -> Result<ProblemStats>;
}

/// A problem library held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProblemLibrary {
    entries: Vec<ProblemEntry>,
}

impl InMemoryProblemLibrary {
    pub fn new(entries: Vec<ProblemEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ProblemEntry] {
        &self.entries
    }
}

#[async_trait]
impl ProblemLibrary for InMemoryProblemLibrary {
    async fn problem_stats(&self, type_keys: Option<&BTreeSet<String>>) -> Result<ProblemStats> {
        Ok(count_problems(&self.entries, type_keys))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProblemDocument {
    List(Vec<ProblemEntry>),
    Wrapped { problems: Vec<ProblemEntry> },
}

/// Parse a problem library export (`[...]` or `{"problems": [...]}`).
pub fn parse_problems(contents: &str) -> Result<Vec<ProblemEntry>> {
    Ok(match serde_json::from_str(contents)? {
        ProblemDocument::List(entries) => entries,
        ProblemDocument::Wrapped { problems } => problems,
    })
}

/// A problem library exported to a JSON file, re-read on every query.
#[derive(Debug, Clone)]
pub struct JsonProblemLibrary {
    path: PathBuf,
}

impl JsonProblemLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<ProblemEntry>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::ProblemLibrary {
                message: format!("failed to read {}: {}", self.path.display(), e),
            })?;
        parse_problems(&contents).map_err(|e| Error::ProblemLibrary {
            message: format!("failed to parse {}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl ProblemLibrary for JsonProblemLibrary {
    async fn problem_stats(&self, type_keys: Option<&BTreeSet<String>>) -> Result<ProblemStats> {
        let entries = self.load().await?;
        debug!(path = %self.path.display(), entries = entries.len(), "loaded problem library");
        Ok(count_problems(&entries, type_keys))
    }
}

/// Links issue type keys to problem-library counts.
pub struct ClassificationLinker<L> {
    library: L,
}

impl<L: ProblemLibrary> ClassificationLinker<L> {
    pub fn new(library: L) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Counts for exactly `type_keys`, `0` where the library has none.
    pub async fn link(&self, type_keys: &BTreeSet<String>) -> Result<BTreeMap<String, usize>> {
        if type_keys.is_empty() {
            return Ok(BTreeMap::new());
        }

        let stats = self.library.problem_stats(Some(type_keys)).await?;
        Ok(type_keys
            .iter()
            .map(|key| (key.clone(), stats.count_for(key)))
            .collect())
    }

    /// Counts for every type key in the result's summary.
    pub async fn link_result(&self, result: &AnalysisResult) -> Result<BTreeMap<String, usize>> {
        let keys: BTreeSet<String> = result.summary.by_type.keys().cloned().collect();
        self.link(&keys).await
    }

    /// Global counts across the whole library.
    pub async fn global_stats(&self) -> Result<ProblemStats> {
        self.library.problem_stats(None).await
    }
}
