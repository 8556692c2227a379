//! Tolerant parsers for `git log` output.
//!
//! Every command is run with a format whose commit header starts with the
//! ASCII record separator, so headers can never be confused with path lines
//! (git always quotes control characters in paths). Lines that do not have
//! the expected shape are skipped and counted, never treated as errors.

use chrono::DateTime;

use super::types::{ChangedPath, CommitRecord, FileChangeEvent, Parsed};

/// Starts every commit header line.
pub const RECORD_SEPARATOR: char = '\x1e';
/// Separates fields within a timeline header.
pub const FIELD_SEPARATOR: char = '\x1f';

/// `--format` argument producing one timeline line per commit.
pub const TIMELINE_FORMAT: &str = "--format=%x1e%H%x1f%P%x1f%an%x1f%ae%x1f%ct";
/// `--format` argument producing a bare commit-hash header.
pub const HASH_FORMAT: &str = "--format=%x1e%H";

const RENAME_ARROW: &str = " => ";
const DELETE_SUMMARY: &str = "delete mode ";
/// `--summary` lines other than deletions, which carry nothing we count.
const OTHER_SUMMARIES: &[&str] = &["create mode ", "rename ", "copy ", "mode change ", "rewrite "];
const TIMELINE_FIELDS: usize = 5;

/// Returns `true` for a full SHA-1 or SHA-256 hex object name.
#[must_use]
pub fn is_commit_hash(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parses the output of `git log` with [`TIMELINE_FORMAT`].
#[must_use]
pub fn parse_timeline(text: &str) -> Parsed<CommitRecord> {
    let mut parsed = Parsed::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let sequence_index = parsed.items.len();
        match line
            .strip_prefix(RECORD_SEPARATOR)
            .and_then(|header| parse_timeline_header(header, sequence_index))
        {
            Some(record) => parsed.items.push(record),
            None => parsed.dropped += 1,
        }
    }

    parsed
}

fn parse_timeline_header(header: &str, sequence_index: usize) -> Option<CommitRecord> {
    let fields: Vec<&str> = header.split(FIELD_SEPARATOR).collect();
    let [hash, parents, name, email, timestamp] = <[&str; TIMELINE_FIELDS]>::try_from(fields).ok()?;

    if !is_commit_hash(hash) {
        return None;
    }

    let parents: Vec<String> = parents.split_whitespace().map(str::to_string).collect();
    if !parents.iter().all(|p| is_commit_hash(p)) {
        return None;
    }

    let seconds: i64 = timestamp.trim().parse().ok()?;

    Some(CommitRecord {
        hash: hash.to_string(),
        parents,
        author_login: name.to_string(),
        author_email: email.to_string(),
        timestamp: DateTime::from_timestamp(seconds, 0)?,
        sequence_index,
    })
}

/// Parses `git log --name-only` output with [`HASH_FORMAT`] headers.
#[must_use]
pub fn parse_name_only(text: &str) -> Parsed<ChangedPath> {
    parse_records(text, |commit, line, items| {
        items.push(ChangedPath {
            commit_hash: commit.to_string(),
            path: unquote_path(line),
        });
        true
    })
}

/// Parses `git log --numstat --summary` output with [`HASH_FORMAT`] headers.
///
/// Binary files (`-` counts) yield `None` additions and deletions. Rename
/// notation is normalized to the new path, keeping the old one aside. A
/// `delete mode` summary line marks the matching event of the same commit
/// as [`deleted`](FileChangeEvent::deleted).
#[must_use]
pub fn parse_numstat(text: &str) -> Parsed<FileChangeEvent> {
    parse_records(text, |commit, line, items| {
        if let Some(summary) = line.strip_prefix(' ') {
            return apply_summary(commit, summary, items);
        }
        match parse_numstat_line(commit, line) {
            Some(event) => {
                items.push(event);
                true
            }
            None => false,
        }
    })
}

fn apply_summary(commit: &str, summary: &str, items: &mut [FileChangeEvent]) -> bool {
    let Some(rest) = summary.strip_prefix(DELETE_SUMMARY) else {
        return OTHER_SUMMARIES.iter().any(|prefix| summary.starts_with(prefix));
    };
    let Some((_mode, raw)) = rest.split_once(' ') else {
        return false;
    };

    let path = unquote_path(raw);
    if let Some(event) = items
        .iter_mut()
        .rev()
        .take_while(|e| e.commit_hash == commit)
        .find(|e| e.path == path)
    {
        event.deleted = true;
    }
    true
}

fn parse_numstat_line(commit: &str, line: &str) -> Option<FileChangeEvent> {
    let mut fields = line.splitn(3, '\t');
    let additions = parse_count(fields.next()?)?;
    let deletions = parse_count(fields.next()?)?;
    let raw = fields.next().filter(|p| !p.is_empty())?;

    let (renamed_from, path) = if is_quoted(raw) {
        normalize_rename_path(&unquote_path(raw))
    } else {
        let (old, new) = normalize_rename_path(raw);
        (old.map(|o| unquote_path(&o)), unquote_path(&new))
    };

    if path.is_empty() {
        return None;
    }

    Some(FileChangeEvent {
        commit_hash: commit.to_string(),
        renamed_from: renamed_from.filter(|old| *old != path),
        path,
        additions,
        deletions,
        deleted: false,
    })
}

fn parse_count(field: &str) -> Option<Option<u32>> {
    if field == "-" {
        Some(None)
    } else {
        field.parse().ok().map(Some)
    }
}

/// Walks hash-headed records, handing each non-empty body line to `entry`.
///
/// `entry` pushes what it parsed and returns `false` for a malformed line.
fn parse_records<T>(text: &str, mut entry: impl FnMut(&str, &str, &mut Vec<T>) -> bool) -> Parsed<T> {
    let mut parsed = Parsed::default();
    let mut current: Option<&str> = None;

    for line in text.lines() {
        if let Some(header) = line.strip_prefix(RECORD_SEPARATOR) {
            let hash = header.trim();
            current = is_commit_hash(hash).then_some(hash);
            if current.is_none() {
                parsed.dropped += 1;
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let accepted = current.is_some_and(|commit| entry(commit, line, &mut parsed.items));
        if !accepted {
            parsed.dropped += 1;
        }
    }

    parsed
}

/// Splits git's rename notation into `(old, new)`.
///
/// Handles both `old => new` and the common-prefix form
/// `src/{old => new}/file.rs`, where either side of the braces may be
/// empty. Paths without a rename come back unchanged with no old path.
#[must_use]
pub fn normalize_rename_path(raw: &str) -> (Option<String>, String) {
    if let Some(open) = raw.find('{')
        && let Some(len) = raw[open..].find('}')
    {
        let close = open + len;
        if let Some((old, new)) = raw[open + 1..close].split_once(RENAME_ARROW.trim_start()) {
            let prefix = &raw[..open];
            let suffix = &raw[close + 1..];
            return (
                Some(join_rename_parts(prefix, old.trim_end(), suffix)),
                join_rename_parts(prefix, new.trim_start(), suffix),
            );
        }
    }

    match raw.split_once(RENAME_ARROW) {
        Some((old, new)) => (Some(old.to_string()), new.to_string()),
        None => (None, raw.to_string()),
    }
}

fn join_rename_parts(prefix: &str, middle: &str, suffix: &str) -> String {
    let mut joined = format!("{prefix}{middle}{suffix}");
    while joined.contains("//") {
        joined = joined.replace("//", "/");
    }
    joined.trim_start_matches('/').to_string()
}

fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"')
}

/// Decodes a C-style quoted path as printed by git.
///
/// Unquoted input is returned unchanged. Octal escapes are decoded as raw
/// bytes and the result is interpreted as UTF-8 lossily.
#[must_use]
pub fn unquote_path(raw: &str) -> String {
    if !is_quoted(raw) {
        return raw.to_string();
    }

    let inner = &raw.as_bytes()[1..raw.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut bytes = inner.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }

        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'r') => out.push(b'\r'),
            Some(b'a') => out.push(0x07),
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0c),
            Some(b'v') => out.push(0x0b),
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            Some(other) => out.push(other),
            None => out.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
