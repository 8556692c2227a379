//! End-to-end tests for the `gitpulse analyze` command.

#![expect(clippy::expect_used, reason = "tests use expect for clearer failure messages")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const AS_OF: &str = "2024-06-30T00:00:00Z";

fn gitpulse() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gitpulse"))
}

fn git(repo: &Path, args: &[&str], date: &str) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .status()
        .expect("git failed to start");
    assert!(status.success(), "git {args:?} failed");
}

fn init_git_repo(dir: &TempDir) -> PathBuf {
    let repo = dir.path().join("widgets");
    fs::create_dir(&repo).expect("mkdir failed");

    let date = "2024-01-01T00:00:00+0000";
    git(&repo, &["init", "-q"], date);
    git(&repo, &["config", "user.email", "test@test.com"], date);
    git(&repo, &["config", "user.name", "Test User"], date);
    git(&repo, &["config", "commit.gpgsign", "false"], date);
    repo
}

fn commit(repo: &Path, file: &str, content: &str, date: &str) {
    fs::write(repo.join(file), content).expect("write failed");
    git(repo, &["add", "-A"], date);
    git(repo, &["commit", "-q", "-m", &format!("update {file}")], date);
}

fn sample_repo(dir: &TempDir) -> PathBuf {
    let repo = init_git_repo(dir);
    commit(&repo, "a.txt", "one\ntwo\n", "2024-01-10T12:00:00+0000");
    commit(&repo, "b.txt", "x\n", "2024-02-10T12:00:00+0000");
    commit(&repo, "a.txt", "one\ntwo\nthree\n", "2024-04-10T12:00:00+0000");
    repo
}

fn analyze_json(dir: &TempDir, repo: &Path, extra: &[&str]) -> serde_json::Value {
    let output = gitpulse()
        .arg("analyze")
        .arg(repo)
        .args(["--format", "json", "--as-of", AS_OF])
        .args(extra)
        .current_dir(dir.path())
        .output()
        .expect("gitpulse failed to start");

    assert!(output.status.success(), "gitpulse failed: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn help_lists_analyze_command() {
    gitpulse()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn no_arguments_prints_help() {
    gitpulse().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn json_report_contains_every_section() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);

    let json = analyze_json(&dir, &repo, &[]);

    assert_eq!(json["version"], "1.0");
    assert_eq!(json["partial"], false);
    assert_eq!(json["repository"]["name"], "widgets");
    assert_eq!(json["commit_count"], 3);
    assert_eq!(json["hotspots"][0]["path"], "a.txt");
    assert_eq!(json["hotspots"][0]["change_count"], 2);
    assert_eq!(json["file_tree"]["loc"], 4);
    assert_eq!(json["status"]["survival_curves"], "complete");
    assert_eq!(json["survival_curves"][0]["cohort_label"], "2024-Q1");
    assert!(json["head_commit"].as_str().is_some_and(|h| h.len() == 40));
}

#[test]
fn explicit_identity_and_head_are_echoed() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);

    let json = analyze_json(&dir, &repo, &["--owner", "acme", "--name", "gadgets"]);

    assert_eq!(json["repository"]["owner"], "acme");
    assert_eq!(json["repository"]["name"], "gadgets");
}

#[test]
fn output_flag_writes_report_file() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);
    let report = dir.path().join("report.json");

    gitpulse()
        .arg("analyze")
        .arg(&repo)
        .args(["-f", "json", "--as-of", AS_OF, "-o"])
        .arg(&report)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = fs::read_to_string(&report).expect("report should exist");
    assert!(content.contains("\"hotspots\""));
}

#[test]
fn text_output_shows_sections_and_summary() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);

    gitpulse()
        .arg("analyze")
        .arg(&repo)
        .args(["--as-of", AS_OF])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Hotspots"))
        .stdout(predicate::str::contains("a.txt"))
        .stdout(predicate::str::contains("2024-Q1"))
        .stdout(predicate::str::contains("Analysis complete"));
}

#[test]
fn exclude_flag_removes_paths() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);

    let json = analyze_json(&dir, &repo, &["--exclude", "a.txt"]);

    let hotspots = json["hotspots"].as_array().expect("hotspots array");
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["path"], "b.txt");
    assert_eq!(json["file_tree"]["loc"], 1);
}

#[test]
fn config_scale_cap_marks_survival_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);
    fs::write(dir.path().join(".gitpulse.toml"), "[survival]\nmax_commits = 1\n").expect("write config");

    let json = analyze_json(&dir, &repo, &[]);

    assert_eq!(json["partial"], true);
    assert_eq!(json["status"]["survival_curves"]["skipped"], "scale-cap");
    assert_eq!(json["status"]["hotspots"], "complete");
    assert_eq!(json["survival_curves"].as_array().map(Vec::len), Some(0));
}

#[test]
fn missing_repository_exits_with_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("does-not-exist");

    gitpulse()
        .arg("analyze")
        .arg(&missing)
        .current_dir(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("git clone failed"));
}

#[test]
fn invalid_config_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let repo = sample_repo(&dir);
    fs::write(dir.path().join(".gitpulse.toml"), "exclude_paths = [\"[\"]\n").expect("write config");

    gitpulse()
        .arg("analyze")
        .arg(&repo)
        .current_dir(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid exclude pattern"));
}

#[test]
fn invalid_as_of_is_rejected() {
    gitpulse()
        .args(["analyze", "repo", "--as-of", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timestamp"));
}
