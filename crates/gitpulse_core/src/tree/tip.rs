//! Tip file enumeration and line counting through the object database.

use std::path::Path;

use gix::bstr::ByteSlice as _;
use globset::GlobSet;
use tokio::task::JoinSet;
#[cfg(feature = "tracing")]
use tracing::debug;

use super::TipFile;
use crate::binary::count_lines;
use crate::error::StageError;
use crate::git::WorkerPool;

/// Blobs counted per blocking task.
const BLOB_BATCH: usize = 256;

/// Lists every regular file at `HEAD` with its line count.
///
/// Symlinks and submodules are skipped. Blob reads are spread over the
/// worker pool in fixed-size batches. Returns an empty list for a repository
/// whose `HEAD` is unborn.
pub async fn list_tip_files(git_dir: &Path, pool: &WorkerPool, exclude: &GlobSet) -> Result<Vec<TipFile>, StageError> {
    let dir = git_dir.to_path_buf();
    let exclude = exclude.clone();
    let Some((repo, entries)) = pool.run_blocking(move || enumerate(&dir, &exclude)).await?? else {
        return Ok(Vec::new());
    };

    #[cfg(feature = "tracing")]
    debug!(files = entries.len(), "counting tip lines");

    let mut tasks = JoinSet::new();
    let mut entries = entries.into_iter().peekable();
    while entries.peek().is_some() {
        let batch: Vec<(String, gix::ObjectId)> = entries.by_ref().take(BLOB_BATCH).collect();
        let repo = repo.clone();
        let pool = pool.clone();
        tasks.spawn(async move { pool.run_blocking(move || count_batch(&repo, batch)).await });
    }

    let mut files = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let counted = joined.map_err(|e| StageError::Objects(e.to_string()))???;
        files.extend(counted);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

type TipEntries = (gix::ThreadSafeRepository, Vec<(String, gix::ObjectId)>);

fn enumerate(git_dir: &Path, exclude: &GlobSet) -> Result<Option<TipEntries>, StageError> {
    let repo = gix::open(git_dir).map_err(objects)?;

    if repo.head().map_err(objects)?.is_unborn() {
        return Ok(None);
    }

    let entries = {
        let tree_id = repo.head_tree_id().map_err(objects)?;
        let tree = repo.find_tree(tree_id).map_err(objects)?;
        let mut recorder = gix::traverse::tree::Recorder::default();
        tree.traverse().breadthfirst(&mut recorder).map_err(objects)?;

        recorder
            .records
            .into_iter()
            .filter(|entry| entry.mode.is_blob())
            .filter_map(|entry| {
                let path = entry.filepath.to_str_lossy().into_owned();
                (!exclude.is_match(&path)).then_some((path, entry.oid))
            })
            .collect()
    };

    Ok(Some((repo.into_sync(), entries)))
}

fn count_batch(repo: &gix::ThreadSafeRepository, batch: Vec<(String, gix::ObjectId)>) -> Result<Vec<TipFile>, StageError> {
    let repo = repo.to_thread_local();
    batch
        .into_iter()
        .map(|(path, id)| {
            let blob = repo.find_blob(id).map_err(objects)?;
            Ok(TipFile {
                path,
                loc: count_lines(&blob.data),
            })
        })
        .collect()
}

fn objects(err: impl std::fmt::Display) -> StageError {
    StageError::Objects(err.to_string())
}
