//! High-level bucket operations
//!
//! [`BucketManager`] wires the walker, the key mapping, the lister, the
//! transfer engine and folder deletion together behind a handful of calls.
//! A batch in which any item failed is reported as [`Error::BatchFailed`];
//! callers that need per-item detail should drive [`TransferEngine`] directly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::folder::{self, DeleteSummary};
use crate::listing;
use crate::path::{
    base_name, flat_key, normalize_prefix, pattern_prefix, to_key, to_local_path, utf8_name,
};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::traits::{ObjectInfo, ObjectStore};
use crate::transfer::{BatchResult, DEFAULT_WORKERS, Direction, TransferEngine, TransferItem};
use crate::walk;

/// Synchronizes local trees with one bucket
pub struct BucketManager<S: ObjectStore> {
    store: S,
    workers: usize,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl<S: ObjectStore> BucketManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            workers: DEFAULT_WORKERS,
            sink: None,
        }
    }

    /// Set the number of concurrent transfers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Report batch progress to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Upload a file or a whole tree under `destination_prefix`
    ///
    /// Each file's key is the prefix followed by its path relative to
    /// `local_path`. A single file is uploaded under the prefix with its own
    /// name.
    pub async fn upload(
        &self,
        local_path: &Path,
        destination_prefix: Option<&str>,
    ) -> Result<BatchResult> {
        let prefix = normalize_prefix(destination_prefix);
        let (root, files) = if local_path.is_file() {
            let root = local_path.parent().unwrap_or(Path::new("")).to_path_buf();
            (root, vec![local_path.to_path_buf()])
        } else {
            (local_path.to_path_buf(), walk::list_files(local_path)?)
        };

        let items = upload_items(&root, &prefix, files)?;
        self.run(items, Direction::Upload).await
    }

    /// Upload the files below `root` whose relative path matches `pattern`
    pub async fn upload_matching(
        &self,
        root: &Path,
        pattern: &str,
        destination_prefix: Option<&str>,
    ) -> Result<BatchResult> {
        let prefix = normalize_prefix(destination_prefix);
        let files = walk::list_matching(root, pattern)?;
        let items = upload_items(root, &prefix, files)?;
        self.run(items, Direction::Upload).await
    }

    /// Download everything under `source_prefix` into `destination`
    ///
    /// Key segments after the prefix become directories below `destination`.
    /// Nothing is created locally when the prefix matches no keys.
    pub async fn download(
        &self,
        destination: &Path,
        source_prefix: Option<&str>,
    ) -> Result<BatchResult> {
        let prefix = normalize_prefix(source_prefix);
        let objects = listing::list_objects(&self.store, &prefix).await?;
        if objects.is_empty() {
            tracing::info!(
                bucket = self.store.bucket(),
                prefix = %prefix,
                "No objects to download"
            );
            return Ok(BatchResult::default());
        }

        let items = download_items(destination, &prefix, objects)?;
        self.run(items, Direction::Download).await
    }

    /// Download every object whose key matches `pattern`
    ///
    /// Keys keep their path below the last `/` of the pattern's literal part.
    pub async fn download_matching(
        &self,
        destination: &Path,
        pattern: &str,
    ) -> Result<BatchResult> {
        let objects = listing::list_matching(&self.store, pattern).await?;
        if objects.is_empty() {
            tracing::info!(bucket = self.store.bucket(), pattern, "No objects match");
            return Ok(BatchResult::default());
        }

        let literal = pattern_prefix(pattern);
        let base = match literal.rfind('/') {
            Some(idx) => &literal[..=idx],
            None => "",
        };

        let items = download_items(destination, base, objects)?;
        self.run(items, Direction::Download).await
    }

    /// Delete every object under `prefix`
    pub async fn delete_folder(&self, prefix: &str) -> Result<DeleteSummary> {
        folder::delete_all(&self.store, &normalize_prefix(Some(prefix))).await
    }

    /// List every object under `prefix`
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        listing::list_objects(&self.store, &normalize_prefix(prefix)).await
    }

    /// Upload every file below `directory` as `destination/<file name>`
    ///
    /// Subdirectory structure is dropped, so files sharing a name overwrite
    /// each other in the bucket.
    #[deprecated(note = "keys lose their directories; use `upload`")]
    pub async fn upload_all(
        &self,
        directory: &Path,
        destination: Option<&str>,
    ) -> Result<BatchResult> {
        if !directory.is_dir() {
            return Err(Error::PathNotFound(directory.to_path_buf()));
        }

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for file in walk::list_files(directory)? {
            let name = match file.file_name() {
                Some(name) => utf8_name(name, &file)?,
                None => return Err(Error::InvalidPath(file.display().to_string())),
            };
            let key = flat_key(destination, name);
            if !seen.insert(key.clone()) {
                tracing::warn!(
                    key = %key,
                    path = %file.display(),
                    "Flat upload overwrites an earlier file"
                );
            }
            let size = std::fs::metadata(&file)?.len();
            items.push(TransferItem::new(file, key, size));
        }

        self.run(items, Direction::Upload).await
    }

    /// Download every object under `folder` as `destination/<object name>`
    ///
    /// The destination directory is created up front, even when the folder
    /// turns out to be empty.
    #[deprecated(note = "local files lose their directories; use `download`")]
    pub async fn download_folder(&self, folder: &str, destination: &Path) -> Result<BatchResult> {
        tokio::fs::create_dir_all(destination).await?;

        let objects = listing::list_objects(&self.store, &normalize_prefix(Some(folder))).await?;
        let items = objects
            .into_iter()
            .filter(|o| !o.is_dir_marker())
            .map(|o| {
                let path = destination.join(base_name(&o.key));
                TransferItem::new(path, o.key, o.size_bytes)
            })
            .collect();

        self.run(items, Direction::Download).await
    }

    async fn run(&self, items: Vec<TransferItem>, direction: Direction) -> Result<BatchResult> {
        let total: u64 = items.iter().map(|i| i.size_bytes).sum();
        let tracker = match &self.sink {
            Some(sink) => ProgressTracker::with_sink(total, Arc::clone(sink)),
            None => ProgressTracker::new(total),
        };

        TransferEngine::new(&self.store, self.workers)
            .run(items, direction, &tracker)
            .await
            .into_result()
    }
}

fn upload_items(root: &Path, prefix: &str, files: Vec<PathBuf>) -> Result<Vec<TransferItem>> {
    files
        .into_iter()
        .map(|file| {
            let key = to_key(root, prefix, &file)?;
            let size = std::fs::metadata(&file)?.len();
            Ok(TransferItem::new(file, key, size))
        })
        .collect()
}

fn download_items(
    destination: &Path,
    prefix: &str,
    objects: Vec<ObjectInfo>,
) -> Result<Vec<TransferItem>> {
    let mut items = Vec::with_capacity(objects.len());
    for object in objects {
        if object.is_dir_marker() {
            tracing::debug!(key = %object.key, "Skipping folder marker");
            continue;
        }
        // A key equal to the prefix is a single object requested by its full key
        let local_path = if object.key == prefix {
            destination.join(base_name(&object.key))
        } else {
            let (directory, name) = to_local_path(destination, prefix, &object.key)?;
            directory.join(name)
        };
        items.push(TransferItem::new(local_path, object.key, object.size_bytes));
    }
    Ok(items)
}
