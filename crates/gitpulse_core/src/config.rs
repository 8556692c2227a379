use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

const DEFAULT_GIT_BINARY: &str = "git";
const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;
const WORKERS_PER_CORE: usize = 2;

/// Engine configuration loaded from `.gitpulse.toml`.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Program invoked for every external git command.
    pub git_binary: String,

    /// Hard bound on snapshot acquisition, in seconds.
    pub clone_timeout_secs: u64,

    /// Bound on each log, show, blame and ls-tree invocation, in seconds.
    pub command_timeout_secs: u64,

    /// Number of worker permits. Defaults to twice the available cores.
    pub max_concurrency: Option<usize>,

    /// Glob patterns for paths removed from every section.
    pub exclude_paths: Vec<String>,

    /// Survival sampling limits.
    pub survival: SurvivalConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            git_binary: DEFAULT_GIT_BINARY.to_string(),
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            max_concurrency: None,
            exclude_paths: Vec::new(),
            survival: SurvivalConfig::default(),
        }
    }
}

/// Settings for cohort survival sampling, the `[survival]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Repositories with more commits than this skip survival entirely.
    pub max_commits: usize,
    /// Number of most recent quarters analysed.
    pub max_cohorts: usize,
    /// Weeks between consecutive samples.
    pub sample_interval_weeks: u32,
    /// Last sample offset after the cohort end. `None` samples up to now.
    pub horizon_weeks: Option<u32>,
    /// Capacity of the per-(revision, path) blame cache.
    pub blame_cache_entries: usize,
    /// Commits per diff-extraction command.
    pub show_batch_size: usize,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            max_commits: 10_000,
            max_cohorts: 8,
            sample_interval_weeks: 4,
            horizon_weeks: Some(104),
            blame_cache_entries: 2048,
            show_batch_size: 64,
        }
    }
}

impl AnalysisConfig {
    /// Creates a default configuration with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a `.gitpulse.toml` file.
    ///
    /// Returns the default configuration if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Returns the clone budget.
    #[must_use]
    pub const fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    /// Returns the per-command budget.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Returns the effective worker count, never zero.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(WORKERS_PER_CORE, |n| NonZeroUsize::get(n) * WORKERS_PER_CORE)
        })
    }

    /// Compiles `exclude_paths` into a glob set.
    pub fn build_excludes(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in &self.exclude_paths {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }

        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: self.exclude_paths.join(", "),
            source,
        })
    }
}

/// Errors that can occur when reading or parsing a `.gitpulse.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// Path to the config file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file contained invalid TOML or unexpected values.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// Path to the config file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// An exclude pattern is not a valid glob.
    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },
}

impl ConfigError {
    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::InvalidGlob { .. } => None,
        }
    }
}
