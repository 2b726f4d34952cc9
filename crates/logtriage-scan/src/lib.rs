//! logtriage scan - streams log content through a compiled rule snapshot
//!
//! ```text
//! bytes ──▶ LineReader ──▶ LineScanner ──▶ ContextExtractor ──▶ IssueAggregator ──▶ AnalysisResult
//!                             ▲                                                         │
//!                    Arc<CompiledRuleSet>                                  ClassificationLinker
//! ```
//!
//! Each analysis is a single forward pass holding only the current line and
//! a window of `W` lines. Bulk runs parallelize across files and share only
//! the read-only snapshot.

pub mod aggregate;
pub mod analyze;
pub mod bulk;
pub mod cancellation;
pub mod context;
pub mod decode;
pub mod level;
pub mod linker;
pub mod scanner;

pub use aggregate::{summarize, IssueAggregator};
pub use analyze::{
    analyze, file_id_for, AnalysisReport, Analyzer, RunStatus, ScanOptions,
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_INPUT_BYTES, MAX_CONTEXT_WINDOW,
};
pub use bulk::{default_concurrency, BulkAnalyzer, BulkOutcome};
pub use cancellation::CancellationToken;
pub use context::{ContextExtractor, ContextualHit};
pub use decode::{DecodedLine, LineReader};
pub use level::detect_level;
pub use linker::{
    count_problems, parse_problems, ClassificationLinker, InMemoryProblemLibrary,
    JsonProblemLibrary, ProblemLibrary,
};
pub use scanner::{scan, LineScanner, RawHit, ScanOutput};
