//! Orchestration of one analysis under an overall deadline.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use globset::GlobSet;
use tokio::time::Instant;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregation, aggregate};
use crate::config::{AnalysisConfig, ConfigError};
use crate::error::AnalysisError;
use crate::git::{Git, GitRepo, WorkerPool};
use crate::log::{LogParser, LogStreams};
use crate::result::{AnalysisRequest, AnalysisResult, Diagnostics, Section, SectionStatus, SurvivalCurve, skip_reason};
use crate::snapshot::RepositorySnapshot;
use crate::survival::SurvivalAnalyzer;
use crate::tree::{FileNode, TipFile, build_tree, list_tip_files};

/// A section's value, or the reason it was not computed.
type Outcome<T> = Result<T, String>;

/// Runs analyses against remote repositories.
///
/// Cheap to clone. Every clone shares one [`WorkerPool`], so concurrent
/// analyses together never exceed its process limit.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: Arc<AnalysisConfig>,
    exclude: GlobSet,
    git: Git,
}

impl Analyzer {
    /// Creates an analyzer with a pool sized by [`AnalysisConfig::concurrency`].
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        let pool = WorkerPool::new(config.concurrency());
        Self::with_pool(config, pool)
    }

    /// Creates an analyzer drawing from an existing pool.
    pub fn with_pool(config: AnalysisConfig, pool: WorkerPool) -> Result<Self, ConfigError> {
        let exclude = config.build_excludes()?;
        let git = Git::new(config.git_binary.as_str(), config.command_timeout(), pool);
        Ok(Self {
            config: Arc::new(config),
            exclude,
            git,
        })
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The shared worker pool.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        self.git.pool()
    }

    /// Clones and analyses one repository.
    ///
    /// Only clone-level failures are errors. Anything that fails, exceeds a
    /// scale cap or runs past `deadline` after the clone is reported in
    /// [`AnalysisResult::status`] while the other sections are still returned.
    /// The snapshot is removed before this returns, whatever the outcome.
    pub async fn analyze(&self, request: &AnalysisRequest, deadline: Instant) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let url = request.repository.url.as_str();
        let budget = self.config.clone_timeout().min(deadline.saturating_duration_since(started));

        #[cfg(feature = "tracing")]
        info!(url, budget_secs = budget.as_secs(), "analysis started");

        let snapshot = RepositorySnapshot::acquire(&self.git, url, budget).await?;
        let mut result = self.analyze_snapshot(&snapshot, request, deadline).await;

        if let Err(e) = snapshot.release() {
            #[cfg(feature = "tracing")]
            warn!(url, error = %e, "failed to remove snapshot");
            #[cfg(not(feature = "tracing"))]
            drop(e);
        }

        result.analyzed_at = Utc::now();
        result.diagnostics.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        #[cfg(feature = "tracing")]
        info!(
            url,
            commits = result.commit_count,
            elapsed_ms = result.diagnostics.elapsed_ms,
            partial = result.is_partial(),
            "analysis finished"
        );

        Ok(result)
    }

    async fn analyze_snapshot(
        &self,
        snapshot: &RepositorySnapshot,
        request: &AnalysisRequest,
        deadline: Instant,
    ) -> AnalysisResult {
        let repo = snapshot.repo(&self.git);

        let head = match within(deadline, repo.head_commit()).await {
            Ok(None) => return AnalysisResult::empty(request.repository.clone()),
            Ok(Some(head)) => head,
            Err(reason) => {
                #[cfg(feature = "tracing")]
                warn!(%reason, "could not resolve HEAD");
                return AnalysisResult::unresolved(request.repository.clone(), &reason);
            }
        };

        #[cfg(feature = "tracing")]
        if let Some(expected) = &request.head_commit
            && *expected != head
        {
            warn!(%expected, actual = %head, "snapshot HEAD differs from requested commit");
        }

        let as_of = request.as_of.unwrap_or_else(Utc::now);
        let (files, history) = tokio::join!(
            within(deadline, list_tip_files(repo.git_dir(), repo.pool(), &self.exclude)),
            self.history(&repo, deadline, as_of),
        );

        assemble(request, Some(head), files, history)
    }

    async fn history(&self, repo: &GitRepo, deadline: Instant, as_of: DateTime<Utc>) -> History {
        let streams = match within(deadline, LogParser::new(repo.clone()).collect()).await {
            Ok(streams) => Arc::new(streams),
            Err(reason) => return History::failed(&reason),
        };

        let aggregation = {
            let streams = Arc::clone(&streams);
            let exclude = self.exclude.clone();
            within(
                deadline,
                repo.pool()
                    .run_blocking(move || aggregate(&streams.changes, &streams.numstat, &exclude)),
            )
        };
        let (aggregation, survival) = tokio::join!(aggregation, self.survival(repo, &streams, deadline, as_of));

        History {
            commit_count: streams.timeline.len(),
            dropped_lines: streams.dropped_lines,
            aggregation,
            survival,
        }
    }

    async fn survival(
        &self,
        repo: &GitRepo,
        streams: &LogStreams,
        deadline: Instant,
        as_of: DateTime<Utc>,
    ) -> Outcome<Vec<SurvivalCurve>> {
        let limit = self.config.survival.max_commits;
        if streams.timeline.len() > limit {
            #[cfg(feature = "tracing")]
            info!(commits = streams.timeline.len(), limit, "skipping survival analysis");
            return Err(skip_reason::SCALE_CAP.to_string());
        }

        let analyzer = SurvivalAnalyzer::new(repo.clone(), self.config.survival.clone(), self.exclude.clone());
        within(deadline, analyzer.run(&streams.timeline, &streams.numstat, as_of)).await
    }
}

/// Everything derived from the log commands.
struct History {
    commit_count: usize,
    dropped_lines: usize,
    aggregation: Outcome<Aggregation>,
    survival: Outcome<Vec<SurvivalCurve>>,
}

impl History {
    fn failed(reason: &str) -> Self {
        Self {
            commit_count: 0,
            dropped_lines: 0,
            aggregation: Err(reason.to_string()),
            survival: Err(reason.to_string()),
        }
    }
}

/// Awaits `work` until `deadline`, flattening both failure kinds into a
/// skip reason.
async fn within<T, E: Display>(deadline: Instant, work: impl Future<Output = Result<T, E>>) -> Outcome<T> {
    match tokio::time::timeout_at(deadline, work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(skip_reason::DEADLINE.to_string()),
    }
}

fn record<T: Default>(status: &mut BTreeMap<Section, SectionStatus>, section: Section, outcome: Outcome<T>) -> T {
    match outcome {
        Ok(value) => {
            status.insert(section, SectionStatus::Complete);
            value
        }
        Err(reason) => {
            #[cfg(feature = "tracing")]
            debug!(%section, %reason, "section skipped");
            status.insert(section, SectionStatus::Skipped(reason));
            T::default()
        }
    }
}

fn assemble(
    request: &AnalysisRequest,
    head: Option<String>,
    files: Outcome<Vec<TipFile>>,
    history: History,
) -> AnalysisResult {
    let mut status = BTreeMap::new();

    let (hotspots, churn, churn_by_path) = match history.aggregation {
        Ok(aggregation) => {
            let by_path: HashMap<String, u64> = aggregation.churn_by_path();
            status.insert(Section::Hotspots, SectionStatus::Complete);
            status.insert(Section::Churn, SectionStatus::Complete);
            (aggregation.hotspots, aggregation.churn, by_path)
        }
        Err(reason) => {
            status.insert(Section::Hotspots, SectionStatus::Skipped(reason.clone()));
            status.insert(Section::Churn, SectionStatus::Skipped(reason));
            (Vec::new(), Vec::new(), HashMap::new())
        }
    };

    let file_tree = match record(&mut status, Section::FileTree, files.map(Some)) {
        Some(files) => build_tree(&files, &churn_by_path),
        None => FileNode::empty_root(),
    };
    let survival_curves = record(&mut status, Section::SurvivalCurves, history.survival);

    AnalysisResult {
        repository: request.repository.clone(),
        head_commit: head,
        analyzed_at: Utc::now(),
        commit_count: history.commit_count,
        hotspots,
        churn,
        file_tree,
        survival_curves,
        status,
        diagnostics: Diagnostics {
            dropped_lines: history.dropped_lines,
            elapsed_ms: 0,
        },
    }
}
