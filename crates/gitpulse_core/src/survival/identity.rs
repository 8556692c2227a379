use std::sync::Arc;

use sha2::{Digest as _, Sha256};

/// Position-independent identity of one introduced line.
///
/// Two lines with the same content in the same file are told apart by the
/// commit that introduced them; moving a line within its file keeps its
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineIdentity {
    /// File path in the introducing commit.
    pub path: Arc<str>,
    /// Hash of the line with trailing whitespace removed.
    pub content_hash: u64,
    /// Introducing commit.
    pub commit: Arc<str>,
}

impl LineIdentity {
    /// Builds the identity of `content` introduced at `path` by `commit`.
    #[must_use]
    pub fn new(path: Arc<str>, content: &str, commit: Arc<str>) -> Self {
        Self {
            path,
            content_hash: content_hash(content),
            commit,
        }
    }
}

/// First eight bytes of the SHA-256 of the right-trimmed line.
#[must_use]
pub fn content_hash(line: &str) -> u64 {
    let digest = Sha256::digest(line.trim_end().as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
