//! History extraction from `git log`.

pub mod parse;
mod types;

#[cfg(feature = "tracing")]
use tracing::debug;

pub use self::parse::{normalize_rename_path, parse_name_only, parse_numstat, parse_timeline, unquote_path};
pub use self::types::{ChangedPath, CommitRecord, FileChangeEvent, LogStreams, Parsed};
use crate::error::CommandError;
use crate::git::GitRepo;

/// Runs the three log commands against a snapshot and parses their output.
#[derive(Debug, Clone)]
pub struct LogParser {
    repo: GitRepo,
}

impl LogParser {
    /// Creates a parser for `repo`.
    #[must_use]
    pub const fn new(repo: GitRepo) -> Self {
        Self { repo }
    }

    /// Produces the timeline, name-only and numeric-diff streams.
    ///
    /// The three commands run concurrently through the worker pool. Only a
    /// failing command is an error; malformed lines are counted in
    /// [`LogStreams::dropped_lines`].
    pub async fn collect(&self) -> Result<LogStreams, CommandError> {
        let (timeline, changes, numstat) = tokio::try_join!(
            self.parse_output(&["log", parse::TIMELINE_FORMAT, "HEAD"], parse_timeline),
            self.parse_output(&["log", "--name-only", "-M", parse::HASH_FORMAT, "HEAD"], parse_name_only),
            self.parse_output(&["log", "--numstat", "--summary", "-M", parse::HASH_FORMAT, "HEAD"], parse_numstat),
        )?;

        let dropped_lines = timeline.dropped + changes.dropped + numstat.dropped;

        #[cfg(feature = "tracing")]
        debug!(
            commits = timeline.items.len(),
            changes = changes.items.len(),
            numstat = numstat.items.len(),
            dropped_lines,
            "parsed history"
        );

        Ok(LogStreams {
            timeline: timeline.items,
            changes: changes.items,
            numstat: numstat.items,
            dropped_lines,
        })
    }

    async fn parse_output<T>(&self, args: &[&str], parse: fn(&str) -> Parsed<T>) -> Result<Parsed<T>, CommandError>
    where
        T: Send + 'static,
    {
        let raw = self.repo.run(args).await?;
        self.repo
            .pool()
            .run_blocking(move || parse(&String::from_utf8_lossy(&raw)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::git::{Git, WorkerPool};
    use crate::test_utils::TestRepo;

    fn parser(repo: &TestRepo) -> LogParser {
        let git = Git::new("git", Duration::from_secs(30), WorkerPool::new(4));
        LogParser::new(git.repo(repo.git_dir()))
    }

    #[tokio::test]
    async fn collect_produces_aligned_streams() {
        let repo = TestRepo::new();
        let first = repo.commit_file_at("a.txt", "1\n2\n3\n4\n5\n", "add a", "2024-01-10T12:00:00+0000");
        repo.write("b.txt", "x\n");
        repo.write("a.txt", "1\n2\n3\n4\n5\n6\n7\n");
        let second = repo.commit_at("touch both", "2024-02-10T12:00:00+0000");

        let streams = parser(&repo).collect().await.unwrap();

        assert_eq!(streams.dropped_lines, 0);
        let hashes: Vec<&str> = streams.timeline.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec![second.as_str(), first.as_str()]);
        assert_eq!(streams.timeline[0].author_login, "Dev");

        let changed: Vec<(&str, &str)> = streams
            .changes
            .iter()
            .map(|c| (c.commit_hash.as_str(), c.path.as_str()))
            .collect();
        assert_eq!(
            changed,
            vec![(second.as_str(), "a.txt"), (second.as_str(), "b.txt"), (first.as_str(), "a.txt")]
        );

        let a_events: Vec<(Option<u32>, Option<u32>)> = streams
            .numstat
            .iter()
            .filter(|e| e.path == "a.txt")
            .map(|e| (e.additions, e.deletions))
            .collect();
        assert_eq!(a_events, vec![(Some(2), Some(0)), (Some(5), Some(0))]);
    }

    #[tokio::test]
    async fn collect_reports_renames_with_old_path() {
        let repo = TestRepo::new();
        repo.commit_file("old.txt", "a\nb\nc\nd\n", "add");
        repo.rename("old.txt", "dir/new.txt");
        repo.commit("move");

        let streams = parser(&repo).collect().await.unwrap();
        let rename = streams.numstat.iter().find(|e| e.renamed_from.is_some()).unwrap();
        assert_eq!(rename.path, "dir/new.txt");
        assert_eq!(rename.renamed_from.as_deref(), Some("old.txt"));
        assert!(streams.changes.iter().any(|c| c.path == "dir/new.txt"));
    }

    #[tokio::test]
    async fn collect_fails_when_history_is_unreadable() {
        let repo = TestRepo::new();
        let err = parser(&repo).collect().await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }
}
