//! The serializable outcome of one analysis.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{FileChurn, Hotspot};
use crate::tree::FileNode;

/// Reason strings carried by [`SectionStatus::Skipped`].
pub mod skip_reason {
    /// The repository has more commits than the survival limit allows.
    pub const SCALE_CAP: &str = "scale-cap";
    /// The overall deadline expired before the section finished.
    pub const DEADLINE: &str = "deadline";
}

/// Independently computed parts of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Files ranked by distinct touching commits.
    Hotspots,
    /// Per-file added and removed line totals.
    Churn,
    /// LOC and churn tree of the tip revision.
    FileTree,
    /// Quarter cohort survival curves.
    SurvivalCurves,
}

impl Section {
    /// Every section, in presentation order.
    pub const ALL: [Self; 4] = [Self::Hotspots, Self::Churn, Self::FileTree, Self::SurvivalCurves];

    /// The name used in serialized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hotspots => "hotspots",
            Self::Churn => "churn",
            Self::FileTree => "file_tree",
            Self::SurvivalCurves => "survival_curves",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a section was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Computed in full. An empty section means "computed and empty".
    Complete,
    /// Not computed, with a human-readable reason.
    Skipped(String),
}

impl SectionStatus {
    /// Builds a skipped status.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    /// Returns `true` for [`SectionStatus::Complete`].
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The skip reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Complete => None,
            Self::Skipped(reason) => Some(reason),
        }
    }
}

/// Who owns a repository and where it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    /// Owning user or organisation.
    pub owner: String,
    /// Repository name without a `.git` suffix.
    pub name: String,
    /// Clone URL or local path.
    pub url: String,
}

impl RepositoryIdentity {
    /// Creates an identity from explicit parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Derives owner and name from the last two path components of `url`.
    ///
    /// Handles `https://host/owner/name(.git)`, `git@host:owner/name.git` and
    /// local paths. Missing components become empty strings.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
            None => trimmed.rsplit_once(':').filter(|(host, _)| !host.contains('/')).map_or(trimmed, |(_, p)| p),
        };

        let mut parts = path.rsplit(['/', '\\']).filter(|p| !p.is_empty());
        let name = parts.next().unwrap_or_default();
        let owner = parts.next().unwrap_or_default();

        Self::new(owner, name, url)
    }

    /// `owner/name`.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Input to one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// The repository to analyse.
    pub repository: RepositoryIdentity,
    /// Remote HEAD as seen by the caller, echoed in the result.
    pub head_commit: Option<String>,
    /// Reference time for survival sampling. Defaults to the wall clock.
    pub as_of: Option<DateTime<Utc>>,
}

impl AnalysisRequest {
    /// A request for `repository` at its current HEAD.
    #[must_use]
    pub const fn new(repository: RepositoryIdentity) -> Self {
        Self {
            repository,
            head_commit: None,
            as_of: None,
        }
    }

    /// A request for the repository at `url`.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self::new(RepositoryIdentity::from_url(url))
    }

    /// Sets the expected HEAD commit.
    #[must_use]
    pub fn with_head_commit(mut self, head: impl Into<String>) -> Self {
        self.head_commit = Some(head.into());
        self
    }

    /// Pins the survival reference time.
    #[must_use]
    pub const fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

/// One measurement of a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalSample {
    /// Weeks after the end of the cohort quarter.
    pub weeks_elapsed: u32,
    /// Introduced lines still attributed to their introducing commit.
    pub surviving_lines: u64,
    /// `surviving_lines / introduced_lines`, absent for an empty cohort.
    pub surviving_fraction: Option<f64>,
}

/// Survival of the lines introduced during one calendar quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve {
    /// Quarter label such as `2024-Q1`.
    pub cohort_label: String,
    /// Inclusive quarter start.
    pub start: DateTime<Utc>,
    /// Exclusive quarter end.
    pub end: DateTime<Utc>,
    /// Lines added by the quarter's commits.
    pub introduced_lines: u64,
    /// Samples in increasing `weeks_elapsed` order.
    pub samples: Vec<SurvivalSample>,
}

/// Counters describing how the result was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Malformed log lines skipped while parsing.
    pub dropped_lines: usize,
    /// Wall time of the whole analysis, clone included.
    pub elapsed_ms: u64,
}

/// Everything computed for one repository at one commit.
///
/// Holds no handles, so it can be persisted as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analysed repository.
    pub repository: RepositoryIdentity,
    /// Tip commit of the snapshot, `None` for an empty repository.
    pub head_commit: Option<String>,
    /// When the analysis finished.
    pub analyzed_at: DateTime<Utc>,
    /// Commits reachable from the tip.
    pub commit_count: usize,
    /// Files ranked by distinct touching commits.
    pub hotspots: Vec<Hotspot>,
    /// Per-file churn, largest first.
    pub churn: Vec<FileChurn>,
    /// Tree of files present at the tip.
    pub file_tree: FileNode,
    /// One curve per cohort, oldest first.
    pub survival_curves: Vec<SurvivalCurve>,
    /// Completion state of every section.
    pub status: BTreeMap<Section, SectionStatus>,
    /// Parse and timing counters.
    pub diagnostics: Diagnostics,
}

impl AnalysisResult {
    /// An all-complete result with no data, as produced for a repository
    /// without commits.
    #[must_use]
    pub fn empty(repository: RepositoryIdentity) -> Self {
        Self {
            repository,
            head_commit: None,
            analyzed_at: Utc::now(),
            commit_count: 0,
            hotspots: Vec::new(),
            churn: Vec::new(),
            file_tree: FileNode::empty_root(),
            survival_curves: Vec::new(),
            status: Section::ALL.into_iter().map(|s| (s, SectionStatus::Complete)).collect(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// A result with no data where every section was skipped for `reason`.
    #[must_use]
    pub fn unresolved(repository: RepositoryIdentity, reason: &str) -> Self {
        Self {
            status: Section::ALL
                .into_iter()
                .map(|s| (s, SectionStatus::skipped(reason)))
                .collect(),
            ..Self::empty(repository)
        }
    }

    /// The status of `section`.
    #[must_use]
    pub fn section_status(&self, section: Section) -> &SectionStatus {
        const COMPLETE: &SectionStatus = &SectionStatus::Complete;
        self.status.get(&section).unwrap_or(COMPLETE)
    }

    /// Returns `true` if any section was skipped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.status.values().any(|s| !s.is_complete())
    }

    /// Sections that were skipped, with their reasons.
    pub fn skipped(&self) -> impl Iterator<Item = (Section, &str)> {
        self.status.iter().filter_map(|(section, status)| status.reason().map(|r| (*section, r)))
    }
}
