//! Parallel analysis of many files
//!
//! Each file is analyzed on the blocking pool with its own scan state. The
//! only thing the tasks share is the analyzer, and through it the read-only
//! rule snapshot. A per-file deadline is enforced by cancelling that file's
//! token, never by abandoning the task.

use crate::analyze::{AnalysisReport, Analyzer};
use crate::cancellation::CancellationToken;
use logtriage_core::{CancelReason, Error, FatalInputError, Result};
use std::collections::HashMap;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

/// Outcome for one input path.
#[derive(Debug)]
pub struct BulkOutcome {
    pub path: PathBuf,
    pub outcome: Result<AnalysisReport>,
}

/// Runs one [`Analyzer`] over many files concurrently.
#[derive(Debug, Clone)]
pub struct BulkAnalyzer {
    analyzer: Arc<Analyzer>,
    max_concurrent: usize,
    timeout: Option<Duration>,
}

/// Number of files analyzed at once when not configured.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl BulkAnalyzer {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            max_concurrent: default_concurrency(),
            timeout: None,
        }
    }

    /// At most `max_concurrent` files in flight (minimum 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Wall-clock budget per file; an expired file is cancelled with [`CancelReason::Deadline`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze every path; outcomes come back in input order, one per path.
    ///
    /// Cancelling `token` cancels every file still in flight.
    pub async fn analyze_files(
        &self,
        paths: Vec<PathBuf>,
        token: &CancellationToken,
    ) -> Vec<BulkOutcome> {
        let total = paths.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(total);

        info!(files = total, max_concurrent = self.max_concurrent, "starting bulk analysis");

        for (index, path) in paths.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let analyzer = Arc::clone(&self.analyzer);
            let token = token.child();
            let timeout = self.timeout;

            let task_path = path.clone();
            let handle = tasks.spawn(async move {
                analyze_one(&semaphore, analyzer, &task_path, token, timeout).await
            });
            pending.insert(handle.id(), (index, path));
        }

        let outcomes = collect_outcomes(tasks, pending).await;

        let failed = outcomes.iter().filter(|o| o.outcome.is_err()).count();
        info!(files = total, failed, "bulk analysis finished");

        outcomes
    }
}

/// Join every task and order the outcomes by input index.
///
/// A task that panicked or was aborted still yields an outcome for its path.
async fn collect_outcomes(
    mut tasks: JoinSet<Result<AnalysisReport>>,
    mut pending: HashMap<task::Id, (usize, PathBuf)>,
) -> Vec<BulkOutcome> {
    let mut outcomes = Vec::with_capacity(pending.len());

    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => {
                let failure = Error::Io(io::Error::other(format!("analysis task failed: {}", e)));
                (e.id(), Err(failure))
            }
        };
        let Some((index, path)) = pending.remove(&id) else {
            continue;
        };

        match &outcome {
            Ok(report) => debug!(
                path = %path.display(),
                issues = report.result.summary.total_issues,
                complete = report.is_complete(),
                "file analyzed"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "file failed"),
        }
        outcomes.push((index, BulkOutcome { path, outcome }));
    }

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn analyze_one(
    semaphore: &Semaphore,
    analyzer: Arc<Analyzer>,
    path: &Path,
    token: CancellationToken,
    timeout: Option<Duration>,
) -> Result<AnalysisReport> {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?;

    let watchdog = timeout.map(|limit| {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            token.cancel_with(CancelReason::Deadline);
        })
    });

    let path = path.to_path_buf();
    let joined = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path).map_err(|source| FatalInputError::Read {
            bytes_read: 0,
            source,
        })?;
        let filename = path.display().to_string();
        analyzer.analyze_reader(BufReader::new(file), &filename, None, &token)
    })
    .await;

    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }

    joined.map_err(|e| Error::Io(io::Error::other(e)))?
}
