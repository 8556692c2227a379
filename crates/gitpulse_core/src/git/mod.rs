//! Access to the `git` command-line tool.

mod command;
mod pool;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use self::command::GitCommand;
pub use self::pool::WorkerPool;
use crate::error::CommandError;

/// Factory for `git` commands that all share one program, timeout and pool.
#[derive(Debug, Clone)]
pub struct Git {
    binary: Arc<str>,
    timeout: Duration,
    pool: WorkerPool,
}

impl Git {
    /// Creates a factory running `binary` with a per-command `timeout`.
    pub fn new(binary: impl Into<Arc<str>>, timeout: Duration, pool: WorkerPool) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            pool,
        }
    }

    /// Returns a new command not yet bound to any repository.
    #[must_use]
    pub fn command(&self) -> GitCommand {
        GitCommand::new(self.binary.as_ref(), self.timeout)
    }

    /// The pool every command from this factory runs under.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Binds this factory to the repository at `git_dir`.
    #[must_use]
    pub fn repo(&self, git_dir: impl Into<PathBuf>) -> GitRepo {
        let git_dir: PathBuf = git_dir.into();
        GitRepo {
            git: self.clone(),
            git_dir: Arc::from(git_dir),
        }
    }
}

/// A `git` factory bound to one repository.
///
/// Cheap to clone and `'static`, so it can be moved into spawned tasks.
#[derive(Debug, Clone)]
pub struct GitRepo {
    git: Git,
    git_dir: Arc<Path>,
}

impl GitRepo {
    /// Path of the repository's git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The pool commands for this repository run under.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        self.git.pool()
    }

    /// Builds a command with `args` against this repository.
    pub fn command<I, S>(&self, args: I) -> GitCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.git.command().git_dir(&self.git_dir).args(args)
    }

    /// Runs a command through the pool and returns raw standard output.
    pub async fn run<I, S>(&self, args: I) -> Result<Vec<u8>, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.pool().run(self.command(args)).await
    }

    /// Runs a command through the pool and decodes its output lossily.
    pub async fn run_text<I, S>(&self, args: I) -> Result<String, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let out = self.run(args).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Resolves `HEAD` to a commit hash.
    ///
    /// Returns `None` for a repository without commits, where `HEAD` names an
    /// unborn branch. Any other failure to resolve `HEAD` is an error.
    pub async fn head_commit(&self) -> Result<Option<String>, CommandError> {
        match self.run_text(["rev-parse", "--verify", "--quiet", "HEAD^{commit}"]).await {
            Ok(out) => {
                let hash = out.trim();
                Ok((!hash.is_empty()).then(|| hash.to_string()))
            }
            Err(failed @ CommandError::Failed { .. }) => {
                let git_dir = Arc::clone(&self.git_dir);
                if self.pool().run_blocking(move || head_is_unborn(&git_dir)).await? {
                    Ok(None)
                } else {
                    Err(failed)
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Whether `HEAD` names a branch that does not exist yet. Unreadable
/// repositories and refs count as not unborn.
fn head_is_unborn(git_dir: &Path) -> bool {
    gix::open(git_dir)
        .ok()
        .and_then(|repo| repo.head().ok().map(|head| head.is_unborn()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestRepo;

    fn git() -> Git {
        Git::new("git", Duration::from_secs(30), WorkerPool::new(2))
    }

    #[tokio::test]
    async fn head_commit_is_none_for_empty_repository() {
        let repo = TestRepo::new();
        let head = git().repo(repo.git_dir()).head_commit().await.unwrap();
        assert!(head.is_none());
    }

    #[tokio::test]
    async fn head_commit_fails_for_a_broken_branch_ref() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "one\n", "first");
        let branch = repo.git(&["symbolic-ref", "HEAD"]);
        let missing = "1234567890123456789012345678901234567890\n";
        std::fs::write(repo.git_dir().join(branch.trim()), missing).unwrap();

        let err = git().repo(repo.git_dir()).head_commit().await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }

    #[tokio::test]
    async fn head_commit_resolves_latest_commit() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "one\n", "first");
        let expected = repo.commit_file("a.txt", "one\ntwo\n", "second");

        let head = git().repo(repo.git_dir()).head_commit().await.unwrap();
        assert_eq!(head.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn run_text_reports_failures_as_command_errors() {
        let repo = TestRepo::new();
        let err = git()
            .repo(repo.git_dir())
            .run_text(["cat-file", "-p", "does-not-exist"])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }
}
