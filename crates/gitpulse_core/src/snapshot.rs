//! Scoped acquisition of a bare, history-complete repository copy.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::{AnalysisError, CloneError, CloneErrorKind, CommandError};
use crate::git::{Git, GitRepo};

const TEMP_PREFIX: &str = "gitpulse-";
const BARE_DIR_NAME: &str = "repo.git";

/// Fragments of `git clone` diagnostics that mean the repository is missing,
/// private, or needs credentials we will never supply.
const NOT_FOUND_MARKERS: &[&str] = &[
    "repository not found",
    "not found",
    "does not exist",
    "does not appear to be a git repository",
    "authentication failed",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "permission denied",
];

/// A local bare clone living in its own temporary directory.
///
/// The directory is removed by [`release`](Self::release), or by `Drop` on
/// any other exit path (error, panic, or cancellation of the owning future).
#[derive(Debug)]
pub struct RepositorySnapshot {
    dir: TempDir,
    git_dir: PathBuf,
    url: String,
}

impl RepositorySnapshot {
    /// Clones the full history of `url` as a bare repository.
    ///
    /// Waiting for a worker permit counts against `budget`. Exceeding it
    /// yields [`AnalysisError::CloneTimeout`]; every other failure is an
    /// [`AnalysisError::Clone`].
    pub async fn acquire(git: &Git, url: &str, budget: Duration) -> Result<Self, AnalysisError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| CloneError {
                kind: CloneErrorKind::Spawn,
                url: url.to_string(),
                message: format!("failed to create temporary directory: {e}"),
            })?;
        let git_dir = dir.path().join(BARE_DIR_NAME);

        #[cfg(feature = "tracing")]
        debug!(url, dir = %dir.path().display(), "cloning");

        let command = git
            .command()
            .args(["clone", "--bare", "--quiet", "--"])
            .arg(url)
            .arg(&git_dir)
            .timeout(budget);

        match tokio::time::timeout(budget, git.pool().run(command)).await {
            Ok(Ok(_)) => Ok(Self {
                dir,
                git_dir,
                url: url.to_string(),
            }),
            Ok(Err(CommandError::TimedOut { .. })) | Err(_) => Err(AnalysisError::CloneTimeout { budget }),
            Ok(Err(e)) => Err(classify(url, e).into()),
        }
    }

    /// The bare repository directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The URL this snapshot was cloned from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Binds a command factory to this snapshot.
    #[must_use]
    pub fn repo(&self, git: &Git) -> GitRepo {
        git.repo(self.git_dir.clone())
    }

    /// Removes the temporary directory now.
    ///
    /// A directory that has already disappeared is not an error.
    pub fn release(self) -> io::Result<()> {
        match self.dir.close() {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

fn classify(url: &str, err: CommandError) -> CloneError {
    let (kind, message) = match err {
        CommandError::Spawn { source, .. } => (CloneErrorKind::Spawn, source.to_string()),
        CommandError::Failed { stderr, code, .. } => {
            let lower = stderr.to_ascii_lowercase();
            let kind = if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
                CloneErrorKind::NotFound
            } else {
                CloneErrorKind::Transient
            };
            let message = if stderr.is_empty() {
                format!("exit status {}", code.unwrap_or(-1))
            } else {
                stderr
            };
            (kind, message)
        }
        other @ (CommandError::TimedOut { .. } | CommandError::Worker(_)) => (CloneErrorKind::Transient, other.to_string()),
    };

    CloneError {
        kind,
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::WorkerPool;
    use crate::test_utils::TestRepo;

    fn git() -> Git {
        Git::new("git", Duration::from_secs(30), WorkerPool::new(2))
    }

    fn failed(stderr: &str) -> CommandError {
        CommandError::Failed {
            command: "git clone".into(),
            code: Some(128),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn classify_detects_missing_repositories() {
        for stderr in [
            "remote: Repository not found.\nfatal: repository 'https://github.com/a/b.git/' not found",
            "fatal: repository '/tmp/nope' does not exist",
            "fatal: could not read Username for 'https://github.com': terminal prompts disabled",
            "fatal: '/tmp/x' does not appear to be a git repository",
        ] {
            assert_eq!(classify("u", failed(stderr)).kind, CloneErrorKind::NotFound, "{stderr}");
        }
    }

    #[test]
    fn classify_treats_network_failures_as_transient() {
        let err = classify(
            "u",
            failed("fatal: unable to access 'https://example.com/': Could not resolve host: example.com"),
        );
        assert_eq!(err.kind, CloneErrorKind::Transient);
    }

    #[test]
    fn classify_keeps_exit_status_when_stderr_is_empty() {
        let err = classify("u", failed(""));
        assert_eq!(err.message, "exit status 128");
    }

    #[tokio::test]
    async fn acquire_clones_bare_copy_and_release_removes_it() {
        let source = TestRepo::new();
        source.commit_file("a.txt", "hello\n", "init");

        let url = source.path().display().to_string();
        let snapshot = RepositorySnapshot::acquire(&git(), &url, Duration::from_secs(30))
            .await
            .unwrap();

        let git_dir = snapshot.git_dir().to_path_buf();
        assert!(git_dir.join("HEAD").exists());
        assert!(!git_dir.join("a.txt").exists());
        assert_eq!(snapshot.url(), url);

        let root = git_dir.parent().unwrap().to_path_buf();
        snapshot.release().unwrap();
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn drop_removes_directory() {
        let source = TestRepo::new();
        source.commit_file("a.txt", "hello\n", "init");

        let snapshot = RepositorySnapshot::acquire(&git(), &source.path().display().to_string(), Duration::from_secs(30))
            .await
            .unwrap();
        let root = snapshot.git_dir().parent().unwrap().to_path_buf();
        drop(snapshot);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn release_of_already_removed_directory_is_noop() {
        let source = TestRepo::new();
        source.commit_file("a.txt", "hello\n", "init");

        let snapshot = RepositorySnapshot::acquire(&git(), &source.path().display().to_string(), Duration::from_secs(30))
            .await
            .unwrap();
        std::fs::remove_dir_all(snapshot.git_dir().parent().unwrap()).unwrap();
        assert!(snapshot.release().is_ok());
    }

    #[tokio::test]
    async fn acquire_reports_missing_repository_as_not_found() {
        let missing = tempfile::TempDir::new().unwrap().path().join("missing");
        let err = RepositorySnapshot::acquire(&git(), &missing.display().to_string(), Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(err.is_not_found(), "{err}");
        assert!(err.to_string().starts_with("git clone failed"));
    }

    #[tokio::test]
    async fn acquire_with_zero_budget_times_out() {
        let source = TestRepo::new();
        source.commit_file("a.txt", "hello\n", "init");

        let err = RepositorySnapshot::acquire(&git(), &source.path().display().to_string(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
