//! Hierarchical LOC and churn tree of the files at the tip revision.

mod tip;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub use self::tip::list_tip_files;

/// A file present at the tip with its line count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipFile {
    /// Slash-separated path from the repository root.
    pub path: String,
    /// Newline count of the blob, `0` for binary content.
    pub loc: u64,
}

/// A file or directory in the analysed tree.
///
/// Leaves are files. For every directory, `loc` and `churn` are the sums of
/// its children, computed once while the tree is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Path from the repository root, empty for the root itself.
    pub path: String,
    /// Last path component, empty for the root.
    pub name: String,
    /// Line count.
    pub loc: u64,
    /// Added plus removed lines over the file's history.
    pub churn: u64,
    /// Children ordered by path. Empty for files.
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// An empty repository root.
    #[must_use]
    pub const fn empty_root() -> Self {
        Self {
            path: String::new(),
            name: String::new(),
            loc: 0,
            churn: 0,
            children: Vec::new(),
        }
    }

    /// Returns `true` for nodes without children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// All files below (or at) this node in path order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Self>) {
        if self.is_leaf() {
            if !self.path.is_empty() {
                out.push(self);
            }
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    /// Finds the node at `path`.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Self> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .find(|c| c.path == path || path.starts_with(&format!("{}/", c.path)))
            .and_then(|c| c.find(path))
    }
}

#[derive(Debug, Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, (u64, u64)>,
}

impl DirBuilder {
    fn insert(&mut self, path: &str, loc: u64, churn: u64) {
        match path.split_once('/') {
            Some((dir, rest)) => self.dirs.entry(dir.to_string()).or_default().insert(rest, loc, churn),
            None => {
                self.files.insert(path.to_string(), (loc, churn));
            }
        }
    }

    fn finish(self, path: String, name: String) -> FileNode {
        let mut children: Vec<FileNode> = Vec::with_capacity(self.dirs.len() + self.files.len());

        for (dir_name, dir) in self.dirs {
            let child_path = join(&path, &dir_name);
            children.push(dir.finish(child_path, dir_name));
        }

        for (file_name, (loc, churn)) in self.files {
            children.push(FileNode {
                path: join(&path, &file_name),
                name: file_name,
                loc,
                churn,
                children: Vec::new(),
            });
        }

        children.sort_by(|a, b| a.path.cmp(&b.path));

        FileNode {
            loc: children.iter().map(|c| c.loc).sum(),
            churn: children.iter().map(|c| c.churn).sum(),
            path,
            name,
            children,
        }
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Assembles the tree rooted at the repository root.
///
/// Churn is merged by path; files without churn data get `0`, and churn for
/// paths absent from `files` (deleted since) is ignored.
#[must_use]
pub fn build_tree(files: &[TipFile], churn: &HashMap<String, u64>) -> FileNode {
    let mut root = DirBuilder::default();

    for file in files {
        if file.path.is_empty() {
            continue;
        }
        let file_churn = churn.get(&file.path).copied().unwrap_or(0);
        root.insert(&file.path, file.loc, file_churn);
    }

    root.finish(String::new(), String::new())
}
