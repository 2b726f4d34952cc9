//! logtriage core - wire types and errors shared by the triage engine.
//!
//! This crate defines the data that crosses the engine's boundaries:
//!
//! - [`Rule`]: a detection rule as handed over by the external rule store
//! - [`Issue`] and [`AnalysisResult`]: the frozen output of one scan
//! - [`TypeKey`]: the grouping key shared with the problem library
//! - [`RuleCompilationError`] and [`DecodeWarning`]: non-fatal diagnostics
//!   that travel alongside a successful result
//! - [`Error`]: fatal and cancellation outcomes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │    logtriage-cli     │  (Host: config, bulk runs, output)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │    logtriage-scan    │  (Scanner, context, aggregation, linker)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ logtriage-rule-engine│  (Rule compiler, matchers)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │    logtriage-core    │  (This crate - shared types)
//! └──────────────────────┘
//! ```

pub mod diagnostics;
pub mod error;
pub mod problem;
pub mod types;

pub use diagnostics::{CancelReason, DecodeWarning, RuleCompilationError};
pub use error::{Error, FatalInputError, Result};
pub use problem::{ProblemEntry, ProblemStats};
pub use types::{
    AnalysisResult, Issue, LogLevel, Operator, Rule, RuleType, Severity, Summary, TypeKey,
    UnknownOperator,
};
