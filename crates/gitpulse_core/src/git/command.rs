//! External `git` invocation with captured output and an enforced timeout.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::error::CommandError;

/// A single `git` invocation, built up fluently and run once.
///
/// Every command runs with a fixed environment: no terminal prompts, the C
/// locale, and `core.quotePath=false` so non-ASCII paths come through as-is.
/// The child is killed when the timeout fires or when the awaiting future
/// is dropped.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: OsString,
    git_dir: Option<PathBuf>,
    args: Vec<OsString>,
    timeout: Duration,
}

impl GitCommand {
    /// Creates a command for `program` bounded by `timeout`.
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            git_dir: None,
            args: Vec::new(),
            timeout,
        }
    }

    /// Runs against the repository at `git_dir` instead of the working directory.
    #[must_use]
    pub fn git_dir(mut self, git_dir: &Path) -> Self {
        self.git_dir = Some(git_dir.to_path_buf());
        self
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short human-readable name such as `git log`, used in errors.
    #[must_use]
    pub fn label(&self) -> String {
        let subcommand = self.args.first().map(|a| a.to_string_lossy()).unwrap_or_default();
        format!("git {subcommand}").trim_end().to_string()
    }

    /// Spawns the process and returns its standard output.
    ///
    /// A non-zero exit status is reported as [`CommandError::Failed`] with
    /// the trimmed standard error attached.
    pub async fn output(&self) -> Result<Vec<u8>, CommandError> {
        let mut command = tokio::process::Command::new(&self.program);

        if let Some(git_dir) = &self.git_dir {
            command.arg("--git-dir").arg(git_dir);
        }

        command
            .args(["-c", "core.quotePath=false"])
            .args(&self.args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| CommandError::Spawn {
            command: self.label(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CommandError::Spawn {
                    command: self.label(),
                    source,
                });
            }
            Err(_elapsed) => {
                return Err(CommandError::TimedOut {
                    command: self.label(),
                    timeout: self.timeout,
                });
            }
        };

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(CommandError::Failed {
                command: self.label(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
