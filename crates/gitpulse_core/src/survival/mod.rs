//! Quarter cohort survival sampling.
//!
//! Each cohort is the set of lines added by the non-merge commits of one
//! calendar quarter. At every sample point the mainline revision of that
//! moment is blamed, and a cohort line survives while blame still attributes
//! a line with the same content and origin path to the introducing commit.

mod cohort;
mod diff;
mod identity;

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use globset::GlobSet;
use lru::LruCache;
use tokio::task::JoinSet;
#[cfg(feature = "tracing")]
use tracing::debug;

pub use self::cohort::{Quarter, SamplePoint, cohort_quarters, sample_schedule};
pub use self::diff::{IntroducedLine, SHOW_FORMAT, parse_line_porcelain, parse_unified_diff};
pub use self::identity::{LineIdentity, content_hash};
use crate::aggregate::resolve_paths;
use crate::config::SurvivalConfig;
use crate::error::{CommandError, StageError};
use crate::git::GitRepo;
use crate::log::{CommitRecord, FileChangeEvent};
use crate::result::{SurvivalCurve, SurvivalSample};

type BlameKey = (Arc<str>, Arc<str>);
type Blamed = Arc<[LineIdentity]>;

/// Builds survival curves for the most recent quarters of a snapshot.
#[derive(Debug, Clone)]
pub struct SurvivalAnalyzer {
    repo: GitRepo,
    settings: SurvivalConfig,
    exclude: GlobSet,
}

impl SurvivalAnalyzer {
    /// Creates an analyzer over `repo`. Lines in files whose name at the tip
    /// matches `exclude` never enter a cohort.
    #[must_use]
    pub const fn new(repo: GitRepo, settings: SurvivalConfig, exclude: GlobSet) -> Self {
        Self {
            repo,
            settings,
            exclude,
        }
    }

    /// Computes one curve per cohort, oldest first.
    ///
    /// `timeline` must be newest first with the tip at index 0; `numstat`
    /// supplies the renames used to follow files forward. Samples are taken
    /// up to `as_of`. An empty timeline yields no curves.
    pub async fn run(
        &self,
        timeline: &[CommitRecord],
        numstat: &[FileChangeEvent],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<SurvivalCurve>, StageError> {
        let Some(tip) = timeline.first() else {
            return Ok(Vec::new());
        };
        let Some(oldest) = timeline.iter().map(|c| c.timestamp).min() else {
            return Ok(Vec::new());
        };

        let quarters = cohort_quarters(
            Quarter::containing(oldest),
            Quarter::containing(tip.timestamp.min(as_of)),
            self.settings.max_cohorts,
        );

        let mut cohort_of: HashMap<Arc<str>, usize> = HashMap::new();
        for commit in timeline.iter().filter(|c| !c.is_merge()) {
            if let Some(index) = quarters.iter().position(|q| q.contains(commit.timestamp)) {
                cohort_of.insert(Arc::from(commit.hash.as_str()), index);
            }
        }

        #[cfg(feature = "tracing")]
        debug!(cohorts = quarters.len(), commits = cohort_of.len(), "sampling survival");

        let final_names = resolve_paths(numstat);
        let mut introduced: Vec<HashMap<LineIdentity, u64>> = vec![HashMap::new(); quarters.len()];
        for line in self.introduced_lines(cohort_of.keys().cloned().collect()).await? {
            let key = (line.commit.to_string(), line.path.to_string());
            let final_path = final_names.get(&key).map_or(&*line.path, String::as_str);
            if self.exclude.is_match(final_path) {
                continue;
            }
            if let Some(&index) = cohort_of.get(&line.commit) {
                *introduced[index].entry(line.identity()).or_default() += 1;
            }
        }

        let tracked: Arc<HashSet<Arc<str>>> = Arc::new(cohort_of.into_keys().collect());
        let mainline = mainline(timeline);
        let renames = RenameGraph::from_events(numstat);
        let mut sampler = Sampler::new(self.repo.clone(), tracked, self.settings.blame_cache_entries);

        let mut curves = Vec::with_capacity(quarters.len());
        for (quarter, lines) in quarters.into_iter().zip(introduced) {
            let schedule = sample_schedule(
                quarter.end(),
                as_of,
                self.settings.sample_interval_weeks,
                self.settings.horizon_weeks,
            );
            let total: u64 = lines.values().sum();
            let surviving = if total == 0 {
                vec![0; schedule.len()]
            } else {
                let revisions: Vec<Option<Arc<str>>> = schedule
                    .iter()
                    .map(|sample| revision_at(&mainline, sample.at).map(Arc::from))
                    .collect();
                let candidates = renames.candidates(lines.keys().map(|id| &*id.path));
                sampler.surviving(&lines, &candidates, &revisions).await?
            };

            curves.push(SurvivalCurve {
                cohort_label: quarter.label(),
                start: quarter.start(),
                end: quarter.end(),
                introduced_lines: total,
                samples: schedule
                    .iter()
                    .zip(surviving)
                    .map(|(point, surviving_lines)| SurvivalSample {
                        weeks_elapsed: point.weeks_elapsed,
                        surviving_lines,
                        surviving_fraction: fraction(surviving_lines, total),
                    })
                    .collect(),
            });
        }

        Ok(curves)
    }

    async fn introduced_lines(&self, commits: Vec<Arc<str>>) -> Result<Vec<IntroducedLine>, StageError> {
        let mut tasks = JoinSet::new();

        for batch in commits.chunks(self.settings.show_batch_size.max(1)) {
            let repo = self.repo.clone();
            let mut args: Vec<String> = ["show", SHOW_FORMAT, "--unified=0", "--no-color", "--no-ext-diff", "-M"]
                .into_iter()
                .map(str::to_string)
                .collect();
            args.extend(batch.iter().map(ToString::to_string));

            tasks.spawn(async move {
                let text = repo.run_text(&args).await?;
                let lines = repo.pool().run_blocking(move || parse_unified_diff(&text)).await?;
                Ok::<_, StageError>(lines)
            });
        }

        let mut lines = Vec::new();
        for batch in join_all(tasks).await? {
            lines.extend(batch);
        }
        Ok(lines)
    }
}

/// Blame and tree lookups shared by every cohort of one run.
struct Sampler {
    repo: GitRepo,
    tracked: Arc<HashSet<Arc<str>>>,
    trees: HashMap<Arc<str>, Arc<HashSet<String>>>,
    blames: LruCache<BlameKey, Blamed>,
}

impl Sampler {
    fn new(repo: GitRepo, tracked: Arc<HashSet<Arc<str>>>, cache_entries: usize) -> Self {
        Self {
            repo,
            tracked,
            trees: HashMap::new(),
            blames: LruCache::new(NonZeroUsize::new(cache_entries).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Surviving line counts of one cohort at each revision. A missing
    /// revision (no commit yet at that time) counts nothing.
    async fn surviving(
        &mut self,
        introduced: &HashMap<LineIdentity, u64>,
        candidates: &[String],
        revisions: &[Option<Arc<str>>],
    ) -> Result<Vec<u64>, StageError> {
        let distinct: HashSet<&Arc<str>> = revisions.iter().flatten().collect();
        self.load_trees(distinct.iter().map(|r| Arc::clone(r)).collect()).await?;

        let mut wanted: HashSet<BlameKey> = HashSet::new();
        for rev in &distinct {
            let Some(files) = self.trees.get(*rev) else { continue };
            for path in candidates.iter().filter(|p| files.contains(p.as_str())) {
                wanted.insert((Arc::clone(rev), Arc::from(path.as_str())));
            }
        }
        let blamed = self.blame_all(wanted).await?;

        let mut counts = Vec::with_capacity(revisions.len());
        for rev in revisions {
            let Some(rev) = rev else {
                counts.push(0);
                continue;
            };

            let mut present: HashMap<&LineIdentity, u64> = HashMap::new();
            for ((blamed_rev, _), lines) in &blamed {
                if blamed_rev != rev {
                    continue;
                }
                for line in lines.iter().filter(|l| introduced.contains_key(*l)) {
                    *present.entry(line).or_default() += 1;
                }
            }

            counts.push(
                present
                    .into_iter()
                    .map(|(id, n)| n.min(introduced.get(id).copied().unwrap_or(0)))
                    .sum(),
            );
        }

        Ok(counts)
    }

    async fn load_trees(&mut self, revisions: Vec<Arc<str>>) -> Result<(), StageError> {
        let mut tasks = JoinSet::new();
        for rev in revisions.into_iter().filter(|r| !self.trees.contains_key(r)) {
            let repo = self.repo.clone();
            tasks.spawn(async move {
                let files = list_blobs(&repo, &rev).await?;
                Ok::<_, StageError>((rev, Arc::new(files)))
            });
        }

        self.trees.extend(join_all(tasks).await?);
        Ok(())
    }

    async fn blame_all(&mut self, wanted: HashSet<BlameKey>) -> Result<HashMap<BlameKey, Blamed>, StageError> {
        let mut blamed = HashMap::with_capacity(wanted.len());
        let mut tasks = JoinSet::new();

        for key in wanted {
            if let Some(lines) = self.blames.get(&key) {
                blamed.insert(key, Arc::clone(lines));
                continue;
            }

            let repo = self.repo.clone();
            let tracked = Arc::clone(&self.tracked);
            tasks.spawn(async move {
                let text = repo
                    .run_text(["blame", "--line-porcelain", &*key.0, "--", &*key.1])
                    .await?;
                let lines = repo
                    .pool()
                    .run_blocking(move || parse_line_porcelain(&text, &tracked))
                    .await?;
                Ok::<_, StageError>((key, Blamed::from(lines)))
            });
        }

        #[cfg(feature = "tracing")]
        debug!(cached = blamed.len(), queued = tasks.len(), "blaming");

        for (key, lines) in join_all(tasks).await? {
            self.blames.put(key.clone(), Arc::clone(&lines));
            blamed.insert(key, lines);
        }

        Ok(blamed)
    }
}

async fn join_all<T: Send + 'static>(mut tasks: JoinSet<Result<T, StageError>>) -> Result<Vec<T>, StageError> {
    let mut out = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        out.push(joined.map_err(|e| CommandError::Worker(e.to_string()))??);
    }
    Ok(out)
}

/// Regular files present at `rev`.
async fn list_blobs(repo: &GitRepo, rev: &str) -> Result<HashSet<String>, StageError> {
    let out = repo.run(["ls-tree", "-r", "-z", rev]).await?;

    Ok(out
        .split(|&b| b == 0)
        .filter_map(|entry| {
            let entry = String::from_utf8_lossy(entry);
            let (meta, path) = entry.split_once('\t')?;
            (meta.split(' ').nth(1) == Some("blob")).then(|| path.to_string())
        })
        .collect())
}

/// The tip followed by its first-parent ancestors.
fn mainline(timeline: &[CommitRecord]) -> Vec<&CommitRecord> {
    let by_hash: HashMap<&str, &CommitRecord> = timeline.iter().map(|c| (c.hash.as_str(), c)).collect();
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = timeline.first();

    while let Some(commit) = current {
        if !seen.insert(commit.hash.as_str()) {
            break;
        }
        chain.push(commit);
        current = commit.first_parent().and_then(|p| by_hash.get(p).copied());
    }

    chain
}

/// The newest mainline commit made at or before `at`.
fn revision_at<'a>(mainline: &[&'a CommitRecord], at: DateTime<Utc>) -> Option<&'a str> {
    mainline.iter().find(|c| c.timestamp <= at).map(|c| c.hash.as_str())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "line counts stay far below the 2^52 limit of exact f64 integers"
)]
fn fraction(surviving: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| (surviving as f64 / total as f64).clamp(0.0, 1.0))
}

/// Forward rename edges, old path to every later name.
#[derive(Debug, Default)]
struct RenameGraph {
    targets: HashMap<String, Vec<String>>,
}

impl RenameGraph {
    fn from_events(events: &[FileChangeEvent]) -> Self {
        let mut graph = Self::default();
        for event in events {
            if let Some(old) = &event.renamed_from {
                graph.targets.entry(old.clone()).or_default().push(event.path.clone());
            }
        }
        graph
    }

    /// `paths` plus every name they were later renamed to, sorted.
    fn candidates<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = paths.into_iter().map(str::to_string).collect();

        while let Some(path) = queue.pop_front() {
            if let Some(next) = self.targets.get(&path) {
                queue.extend(next.iter().filter(|n| !seen.contains(*n)).cloned());
            }
            seen.insert(path);
        }

        let mut out: Vec<String> = seen.into_iter().collect();
        out.sort();
        out
    }
}
