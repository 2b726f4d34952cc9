//! Problem library shapes consumed by the classification linker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A remediation document in the external problem library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Type key this document is filed under.
    #[serde(default)]
    pub error_type: Option<String>,
}

/// Problem counts per type key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStats {
    /// Entries counted by this query.
    #[serde(default)]
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl ProblemStats {
    /// Count for one type key, zero when absent.
    pub fn count_for(&self, type_key: &str) -> usize {
        self.by_type.get(type_key).copied().unwrap_or(0)
    }
}
