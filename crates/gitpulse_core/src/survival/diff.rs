//! Parsers for the two commands survival sampling depends on: zero-context
//! `git show` diffs and `git blame --line-porcelain`.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::identity::LineIdentity;
use crate::log::parse::{RECORD_SEPARATOR, is_commit_hash, unquote_path};

/// `--format` argument that prefixes each commit's diff with its hash.
pub const SHOW_FORMAT: &str = "--format=%x1e%H";

static HUNK_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@").ok());

const NULL_PATH: &str = "/dev/null";
const NEW_SIDE_PREFIX: &str = "b/";

/// One line added by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroducedLine {
    /// Commit that added the line.
    pub commit: Arc<str>,
    /// File the line was added to.
    pub path: Arc<str>,
    /// Line content without the leading `+`.
    pub content: String,
}

impl IntroducedLine {
    /// The position-independent identity of this line.
    #[must_use]
    pub fn identity(&self) -> LineIdentity {
        LineIdentity::new(Arc::clone(&self.path), &self.content, Arc::clone(&self.commit))
    }
}

/// Remaining lines of the hunk being read.
#[derive(Debug, Clone, Copy)]
struct Hunk {
    old: u32,
    new: u32,
    /// Added lines that replace a removed line of the same hunk.
    replaced: u32,
}

impl Hunk {
    const fn is_done(self) -> bool {
        self.old == 0 && self.new == 0
    }
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let captures = HUNK_HEADER.as_ref()?.captures(line)?;
    let count = |i: usize| captures.get(i).map_or(Some(1), |m| m.as_str().parse().ok());
    let (old, new) = (count(1)?, count(2)?);
    Some(Hunk {
        old,
        new,
        replaced: old.min(new),
    })
}

fn parse_new_path(raw: &str) -> Option<String> {
    let path = unquote_path(raw);
    if path == NULL_PATH {
        return None;
    }
    Some(path.strip_prefix(NEW_SIDE_PREFIX).unwrap_or(&path).to_string())
}

/// Extracts added lines from `git show --unified=0` output produced with
/// [`SHOW_FORMAT`].
///
/// A hunk that removes `old` lines and adds `new` lines modifies the first
/// `min(old, new)` of them in place; only the remaining `new - old` added
/// lines are introduced.
///
/// Hunk bodies are consumed by the line counts in their headers, so added
/// content that happens to look like a header is still read as content.
/// Lines for deleted files (`+++ /dev/null`) cannot occur; lines outside any
/// known commit or file are ignored.
#[must_use]
pub fn parse_unified_diff(text: &str) -> Vec<IntroducedLine> {
    let mut out = Vec::new();
    let mut commit: Option<Arc<str>> = None;
    let mut path: Option<Arc<str>> = None;
    let mut hunk: Option<Hunk> = None;

    for line in text.lines() {
        if let Some(remaining) = hunk.as_mut() {
            match line.as_bytes().first() {
                Some(b'+') => {
                    remaining.new = remaining.new.saturating_sub(1);
                    if remaining.replaced > 0 {
                        remaining.replaced -= 1;
                    } else if let (Some(commit), Some(path)) = (&commit, &path) {
                        out.push(IntroducedLine {
                            commit: Arc::clone(commit),
                            path: Arc::clone(path),
                            content: line[1..].to_string(),
                        });
                    }
                }
                Some(b'-') => remaining.old = remaining.old.saturating_sub(1),
                Some(b'\\') => {}
                _ => {
                    remaining.old = remaining.old.saturating_sub(1);
                    remaining.new = remaining.new.saturating_sub(1);
                }
            }
            if remaining.is_done() {
                hunk = None;
            }
            continue;
        }

        if let Some(hash) = line.strip_prefix(RECORD_SEPARATOR) {
            let hash = hash.trim();
            commit = is_commit_hash(hash).then(|| Arc::from(hash));
            path = None;
        } else if line.starts_with("diff ") {
            path = None;
        } else if let Some(raw) = line.strip_prefix("+++ ") {
            path = parse_new_path(raw).map(Arc::from);
        } else if line.starts_with("@@") {
            hunk = parse_hunk_header(line).filter(|h| !h.is_done());
        }
    }

    out
}

/// Parses `git blame --line-porcelain` output.
///
/// Only lines whose blamed commit is in `tracked` are returned, identified by
/// the file name the line had in that commit.
#[must_use]
pub fn parse_line_porcelain(text: &str, tracked: &HashSet<Arc<str>>) -> Vec<LineIdentity> {
    let mut out = Vec::new();
    let mut commit: Option<Arc<str>> = None;
    let mut filename: Option<Arc<str>> = None;

    for line in text.lines() {
        if let Some(content) = line.strip_prefix('\t') {
            if let (Some(commit), Some(filename)) = (&commit, &filename) {
                out.push(LineIdentity::new(Arc::clone(filename), content, Arc::clone(commit)));
            }
            commit = None;
            filename = None;
        } else if let Some(raw) = line.strip_prefix("filename ") {
            filename = Some(Arc::from(unquote_path(raw)));
        } else if let Some(hash) = parse_blame_header(line) {
            commit = tracked.get(hash).cloned();
            filename = None;
        }
    }

    out
}

fn parse_blame_header(line: &str) -> Option<&str> {
    let mut fields = line.split(' ');
    let hash = fields.next().filter(|h| is_commit_hash(h))?;
    let numbers: Vec<&str> = fields.collect();
    let well_formed = matches!(numbers.len(), 2 | 3) && numbers.iter().all(|n| n.parse::<u32>().is_ok());
    well_formed.then_some(hash)
}
