use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit of the history timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash.
    pub hash: String,
    /// Parent hashes, first parent first. Empty for a root commit.
    pub parents: Vec<String>,
    /// Author name as recorded by git.
    pub author_login: String,
    /// Author email as recorded by git.
    pub author_email: String,
    /// Committer timestamp.
    pub timestamp: DateTime<Utc>,
    /// Position in log order, `0` being the newest commit.
    pub sequence_index: usize,
}

impl CommitRecord {
    /// Returns `true` for commits with more than one parent.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The first parent, if any.
    #[must_use]
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// A file touched by a commit, from the name-only stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    /// Commit that touched the file.
    pub commit_hash: String,
    /// Path after the commit (the new name for renames).
    pub path: String,
}

/// Added and removed line counts for one file in one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// Commit that touched the file.
    pub commit_hash: String,
    /// Path after the commit (the new name for renames).
    pub path: String,
    /// Previous path when the commit renamed the file.
    pub renamed_from: Option<String>,
    /// Added lines, or `None` when git reports a binary change.
    pub additions: Option<u32>,
    /// Removed lines, or `None` when git reports a binary change.
    pub deletions: Option<u32>,
    /// The commit removed the file outright.
    pub deleted: bool,
}

impl FileChangeEvent {
    /// Returns `true` when git reported no line counts at all.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.additions.is_none() && self.deletions.is_none()
    }
}

/// Parsed items together with the number of lines that had to be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    /// Successfully parsed items in input order.
    pub items: Vec<T>,
    /// Lines that did not have the expected shape.
    pub dropped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            dropped: 0,
        }
    }
}

/// The three aligned views of a repository's history.
#[derive(Debug, Clone, Default)]
pub struct LogStreams {
    /// Commits, newest first.
    pub timeline: Vec<CommitRecord>,
    /// One entry per (commit, path) in log order.
    pub changes: Vec<ChangedPath>,
    /// One line-count event per (commit, path) in log order.
    pub numstat: Vec<FileChangeEvent>,
    /// Total malformed lines skipped across all three commands.
    pub dropped_lines: usize,
}
