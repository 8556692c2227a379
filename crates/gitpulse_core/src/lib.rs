//! Git history analysis engine for gitpulse.
//!
//! Clones a repository into a throwaway bare snapshot, reads its history
//! through the `git` CLI and produces one serializable result: change
//! hotspots, per-file churn, a LOC/churn tree of the tip revision and
//! survival curves for the lines written in each recent calendar quarter.
//!
//! # Main Types
//!
//! - [`Analyzer`] - Runs one analysis per request under a deadline
//! - [`AnalysisResult`] - Everything computed, with a status per section
//! - [`WorkerPool`] - Bounds concurrent `git` processes across analyses
//! - [`AnalysisConfig`] - User configuration loaded from `.gitpulse.toml`
//!
//! # Error Handling
//!
//! This crate uses [`thiserror`] for typed errors. Only cloning can fail an
//! analysis ([`AnalysisError`]); every later failure is reported as a skipped
//! section in [`AnalysisResult::status`].
//!
//! The CLI crate (`gitpulse_cli`) uses `anyhow` for error propagation.

/// Hotspot and churn aggregation.
pub mod aggregate;
/// Orchestration of a whole analysis.
pub mod analyzer;
/// Binary blob detection and line counting.
pub mod binary;
/// User configuration loaded from `.gitpulse.toml`.
pub mod config;
/// Error types for cloning, commands and configuration.
pub mod error;
/// `git` command execution and the shared worker pool.
pub mod git;
/// Parsing of `git log` output into history streams.
pub mod log;
/// Common re-exports for internal use.
pub mod prelude;
/// The serializable analysis result.
pub mod result;
/// Temporary bare clones.
pub mod snapshot;
/// Quarter cohort line survival.
pub mod survival;
#[cfg(test)]
pub(crate) mod test_utils;
/// The LOC and churn tree of the tip revision.
pub mod tree;

pub use aggregate::{Aggregation, FileChurn, Hotspot, aggregate};
pub use analyzer::Analyzer;
pub use config::{AnalysisConfig, ConfigError, SurvivalConfig};
pub use error::{AnalysisError, CloneError, CloneErrorKind, CommandError, StageError};
pub use git::{Git, GitCommand, GitRepo, WorkerPool};
pub use log::{LogParser, LogStreams};
pub use result::{
    AnalysisRequest, AnalysisResult, Diagnostics, RepositoryIdentity, Section, SectionStatus, SurvivalCurve,
    SurvivalSample, skip_reason,
};
pub use snapshot::RepositorySnapshot;
pub use survival::SurvivalAnalyzer;
pub use tree::{FileNode, TipFile, build_tree};

/// Default filename for gitpulse configuration.
pub const CONFIG_FILENAME: &str = ".gitpulse.toml";
