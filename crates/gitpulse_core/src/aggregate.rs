//! Hotspot and churn aggregation over parsed log streams.

use std::collections::{HashMap, HashSet};

use globset::GlobSet;
use serde::{Deserialize, Serialize};

use crate::log::{ChangedPath, FileChangeEvent};

/// A file ranked by how many distinct commits touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Path under its final name.
    pub path: String,
    /// Parent directory, empty for files at the repository root.
    pub directory: String,
    /// Number of distinct commits that touched the file.
    pub change_count: usize,
}

/// Cumulative line changes for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChurn {
    /// Path under its final name.
    pub path: String,
    /// Sum of added lines over all text changes.
    pub additions: u64,
    /// Sum of removed lines over all text changes, excluding the commit
    /// that deletes the file outright.
    pub deletions: u64,
    /// Changes git reported as binary, which carry no line counts.
    pub binary_changes: usize,
}

impl FileChurn {
    /// Added plus removed lines.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Descending by change count, ties by path.
    pub hotspots: Vec<Hotspot>,
    /// Descending by total churn, ties by path.
    pub churn: Vec<FileChurn>,
}

impl Aggregation {
    /// Total churn keyed by path, for merging into the file tree.
    #[must_use]
    pub fn churn_by_path(&self) -> HashMap<String, u64> {
        self.churn.iter().map(|c| (c.path.clone(), c.total())).collect()
    }
}

/// Maps historical paths to the name they carry at the tip.
///
/// Renames must be recorded newest first. Aliases are stored fully resolved,
/// so a chain `a -> b -> c` answers `c` for `a` in a single lookup.
#[derive(Debug, Clone, Default)]
pub struct RenameResolver {
    aliases: HashMap<String, String>,
}

impl RenameResolver {
    /// Creates a resolver with no known renames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the final name of `path` given the renames recorded so far.
    #[must_use]
    pub fn resolve<'a>(&'a self, path: &'a str) -> &'a str {
        self.aliases.get(path).map_or(path, String::as_str)
    }

    /// Records the renames of one commit, older than every commit recorded
    /// before it.
    ///
    /// Targets are resolved before any alias of this commit is applied, so
    /// two files swapping names in one commit map to each other.
    pub fn record_commit<'r>(&mut self, renames: impl IntoIterator<Item = (&'r str, &'r str)>) {
        let targets: Vec<(&str, String)> = renames
            .into_iter()
            .map(|(old, new)| (old, self.resolve(new).to_string()))
            .collect();

        for (old, target) in targets {
            if target == old {
                self.aliases.remove(old);
            } else {
                self.aliases.insert(old.to_string(), target);
            }
        }
    }
}

/// Aggregates hotspots and churn from the name-only and numeric-diff streams.
///
/// Both streams must be in log order (newest first). Renames found in the
/// numeric-diff stream are carried backward, so pre-rename history counts
/// towards the final path. Paths matching `exclude` (after resolution) are
/// dropped. Removing a whole file touches it but adds no churn.
#[must_use]
pub fn aggregate(changes: &[ChangedPath], numstat: &[FileChangeEvent], exclude: &GlobSet) -> Aggregation {
    let resolved = resolve_paths(numstat);
    let final_name = |commit: &str, path: &str| -> String {
        resolved
            .get(&(commit.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_else(|| path.to_string())
    };

    Aggregation {
        hotspots: count_hotspots(changes, &final_name, exclude),
        churn: sum_churn(numstat, &final_name, exclude),
    }
}

/// Resolves every `(commit, path)` in the numeric-diff stream to its final
/// name, applying each commit's renames only to older commits.
pub(crate) fn resolve_paths(numstat: &[FileChangeEvent]) -> HashMap<(String, String), String> {
    let mut resolver = RenameResolver::new();
    let mut resolved = HashMap::with_capacity(numstat.len());
    let mut pending: Vec<(&str, &str)> = Vec::new();
    let mut current: Option<&str> = None;

    for event in numstat {
        if current != Some(event.commit_hash.as_str()) {
            resolver.record_commit(pending.drain(..));
            current = Some(event.commit_hash.as_str());
        }

        let name = resolver.resolve(&event.path).to_string();
        resolved.insert((event.commit_hash.clone(), event.path.clone()), name);

        if let Some(old) = &event.renamed_from {
            pending.push((old.as_str(), event.path.as_str()));
        }
    }

    resolved
}

fn count_hotspots(
    changes: &[ChangedPath],
    final_name: &impl Fn(&str, &str) -> String,
    exclude: &GlobSet,
) -> Vec<Hotspot> {
    let mut seen: HashSet<(&str, String)> = HashSet::with_capacity(changes.len());
    let mut counts: HashMap<String, usize> = HashMap::new();

    for change in changes {
        let path = final_name(&change.commit_hash, &change.path);
        if exclude.is_match(&path) {
            continue;
        }
        if seen.insert((change.commit_hash.as_str(), path.clone())) {
            *counts.entry(path).or_default() += 1;
        }
    }

    let mut hotspots: Vec<Hotspot> = counts
        .into_iter()
        .map(|(path, change_count)| Hotspot {
            directory: parent_directory(&path).to_string(),
            path,
            change_count,
        })
        .collect();

    hotspots.sort_by(|a, b| b.change_count.cmp(&a.change_count).then_with(|| a.path.cmp(&b.path)));
    hotspots
}

fn sum_churn(
    numstat: &[FileChangeEvent],
    final_name: &impl Fn(&str, &str) -> String,
    exclude: &GlobSet,
) -> Vec<FileChurn> {
    let mut totals: HashMap<String, FileChurn> = HashMap::new();

    for event in numstat {
        let path = final_name(&event.commit_hash, &event.path);
        if exclude.is_match(&path) {
            continue;
        }

        let entry = totals.entry(path).or_default();
        if event.is_binary() {
            entry.binary_changes += 1;
        }
        entry.additions += u64::from(event.additions.unwrap_or(0));
        if !event.deleted {
            entry.deletions += u64::from(event.deletions.unwrap_or(0));
        }
    }

    let mut churn: Vec<FileChurn> = totals
        .into_iter()
        .map(|(path, mut c)| {
            c.path = path;
            c
        })
        .collect();

    churn.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.path.cmp(&b.path)));
    churn
}

/// Returns the parent directory of a slash-separated path, or `""`.
#[must_use]
pub fn parent_directory(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(commit: &str, path: &str) -> ChangedPath {
        ChangedPath {
            commit_hash: commit.into(),
            path: path.into(),
        }
    }

    fn stat(commit: &str, path: &str, additions: u32, deletions: u32) -> FileChangeEvent {
        FileChangeEvent {
            commit_hash: commit.into(),
            path: path.into(),
            renamed_from: None,
            additions: Some(additions),
            deletions: Some(deletions),
            deleted: false,
        }
    }

    fn delete(commit: &str, path: &str, deletions: u32) -> FileChangeEvent {
        FileChangeEvent {
            deleted: true,
            ..stat(commit, path, 0, deletions)
        }
    }

    fn rename(commit: &str, from: &str, to: &str) -> FileChangeEvent {
        FileChangeEvent {
            renamed_from: Some(from.into()),
            ..stat(commit, to, 0, 0)
        }
    }

    fn binary(commit: &str, path: &str) -> FileChangeEvent {
        FileChangeEvent {
            additions: None,
            deletions: None,
            ..stat(commit, path, 0, 0)
        }
    }

    fn no_excludes() -> GlobSet {
        GlobSet::empty()
    }

    #[test]
    fn hotspots_count_distinct_commits() {
        let changes = vec![change("d", "a"), change("c", "a"), change("c", "b"), change("c", "a")];
        let result = aggregate(&changes, &[], &no_excludes());

        let counts: Vec<(&str, usize)> = result
            .hotspots
            .iter()
            .map(|h| (h.path.as_str(), h.change_count))
            .collect();
        assert_eq!(counts, vec![("a", 2), ("b", 1)]);
    }

    #[test]
    fn hotspots_break_ties_by_path_and_carry_directory() {
        let changes = vec![change("c", "src/z.rs"), change("c", "src/a.rs"), change("c", "README.md")];
        let result = aggregate(&changes, &[], &no_excludes());

        let paths: Vec<&str> = result.hotspots.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/a.rs", "src/z.rs"]);
        assert_eq!(result.hotspots[0].directory, "");
        assert_eq!(result.hotspots[1].directory, "src");
    }

    #[test]
    fn churn_sums_additions_and_deletions() {
        let numstat = vec![stat("2", "a.txt", 2, 1), stat("1", "a.txt", 5, 0)];
        let result = aggregate(&[], &numstat, &no_excludes());

        assert_eq!(result.churn.len(), 1);
        assert_eq!(result.churn[0].total(), 8);
        assert_eq!(result.churn_by_path().get("a.txt"), Some(&8));
    }

    #[test]
    fn churn_skips_binary_counts_without_zeroing_text_edits() {
        let numstat = vec![binary("3", "logo.svg"), stat("2", "logo.svg", 4, 1), binary("1", "img.png")];
        let result = aggregate(&[], &numstat, &no_excludes());

        let svg = result.churn.iter().find(|c| c.path == "logo.svg").unwrap();
        assert_eq!(svg.total(), 5);
        assert_eq!(svg.binary_changes, 1);

        let png = result.churn.iter().find(|c| c.path == "img.png").unwrap();
        assert_eq!(png.total(), 0);
        assert_eq!(png.binary_changes, 1);
    }

    #[test]
    fn churn_is_sorted_by_total_descending() {
        let numstat = vec![stat("1", "small", 1, 0), stat("1", "big", 10, 10), stat("1", "mid", 5, 0)];
        let result = aggregate(&[], &numstat, &no_excludes());
        let paths: Vec<&str> = result.churn.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["big", "mid", "small"]);
    }

    #[test]
    fn renames_carry_history_to_final_path() {
        // newest first: 3 renames b -> c, 2 renames a -> b, 1 creates a
        let numstat = vec![
            rename("3", "b", "c"),
            rename("2", "a", "b"),
            stat("1", "a", 5, 0),
        ];
        let changes = vec![change("3", "c"), change("2", "b"), change("1", "a")];
        let result = aggregate(&changes, &numstat, &no_excludes());

        assert_eq!(result.hotspots.len(), 1);
        assert_eq!(result.hotspots[0].path, "c");
        assert_eq!(result.hotspots[0].change_count, 3);
        assert_eq!(result.churn_by_path().get("c"), Some(&5));
    }

    #[test]
    fn path_recreated_after_rename_keeps_its_own_history() {
        // 3 recreates a, 2 renames a -> b, 1 creates a
        let numstat = vec![stat("3", "a", 1, 0), rename("2", "a", "b"), stat("1", "a", 4, 0)];
        let changes = vec![change("3", "a"), change("2", "b"), change("1", "a")];
        let result = aggregate(&changes, &numstat, &no_excludes());

        let by_path = result.churn_by_path();
        assert_eq!(by_path.get("a"), Some(&1));
        assert_eq!(by_path.get("b"), Some(&4));
        let b = result.hotspots.iter().find(|h| h.path == "b").unwrap();
        assert_eq!(b.change_count, 2);
    }

    #[test]
    fn swap_within_one_commit_maps_names_to_each_other() {
        let mut resolver = RenameResolver::new();
        resolver.record_commit([("a", "b"), ("b", "a")]);
        assert_eq!(resolver.resolve("a"), "b");
        assert_eq!(resolver.resolve("b"), "a");
    }

    #[test]
    fn rename_back_to_original_name_removes_alias() {
        let mut resolver = RenameResolver::new();
        resolver.record_commit([("b", "a")]);
        resolver.record_commit([("a", "b")]);
        assert_eq!(resolver.resolve("a"), "a");
        assert_eq!(resolver.resolve("b"), "a");
    }

    #[test]
    fn excluded_paths_are_dropped_from_both_lists() {
        let mut builder = globset::GlobSetBuilder::new();
        builder.add(globset::Glob::new("*.lock").unwrap());
        let exclude = builder.build().unwrap();

        let changes = vec![change("1", "Cargo.lock"), change("1", "src/lib.rs")];
        let numstat = vec![stat("1", "Cargo.lock", 100, 0), stat("1", "src/lib.rs", 1, 0)];
        let result = aggregate(&changes, &numstat, &exclude);

        assert_eq!(result.hotspots.len(), 1);
        assert_eq!(result.churn.len(), 1);
        assert_eq!(result.churn[0].path, "src/lib.rs");
    }

    #[test]
    fn deleting_a_file_counts_as_a_touch_but_not_as_churn() {
        let changes = vec![change("3", "a.txt"), change("2", "a.txt"), change("1", "a.txt")];
        let numstat = vec![delete("3", "a.txt", 7), stat("2", "a.txt", 2, 0), stat("1", "a.txt", 5, 0)];
        let result = aggregate(&changes, &numstat, &no_excludes());

        assert_eq!(result.hotspots[0].change_count, 3);
        assert_eq!(result.churn[0].additions, 7);
        assert_eq!(result.churn[0].deletions, 0);
        assert_eq!(result.churn[0].total(), 7);
    }

    #[test]
    fn line_removals_before_deletion_still_count() {
        let numstat = vec![delete("3", "a.txt", 4), stat("2", "a.txt", 0, 3), stat("1", "a.txt", 7, 0)];
        let result = aggregate(&[], &numstat, &no_excludes());

        assert_eq!(result.churn[0].deletions, 3);
        assert_eq!(result.churn[0].total(), 10);
    }

    #[test]
    fn parent_directory_handles_nesting() {
        assert_eq!(parent_directory("a/b/c.rs"), "a/b");
        assert_eq!(parent_directory("c.rs"), "");
    }
}
