//! Bounded-concurrency transfer engine
//!
//! Drives a batch of uploads or downloads through an [`ObjectStore`] with at
//! most `worker_limit` transfers in flight. Bytes reported by the store feed a
//! shared [`ProgressTracker`]; per-item outcomes are folded into a
//! [`BatchResult`].
//!
//! A failing item never cancels its siblings. Every item is attempted, the
//! first error is kept and the batch as a whole counts as failed.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::traits::ObjectStore;

/// Default number of concurrent transfers
pub const DEFAULT_WORKERS: usize = 20;

/// Which way bytes move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local file to bucket
    Upload,
    /// Bucket to local file
    Download,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// One file to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size_bytes: u64,
}

impl TransferItem {
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_key: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
            size_bytes,
        }
    }
}

/// Aggregated outcome of one batch
#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,

    /// The first item failure observed, as [`Error::TransferItem`]
    pub first_error: Option<Error>,

    pub total_bytes: u64,
    pub completed_bytes: u64,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Turn a batch with failed items into [`Error::BatchFailed`]
    pub fn into_result(self) -> Result<BatchResult> {
        if self.is_success() {
            return Ok(self);
        }
        let first = self
            .first_error
            .unwrap_or_else(|| Error::General("transfer failed".to_string()));
        Err(Error::BatchFailed {
            succeeded: self.succeeded,
            failed: self.failed,
            first: Box::new(first),
        })
    }
}

/// Runs transfer batches against one store
pub struct TransferEngine<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    worker_limit: usize,
}

impl<'a, S: ObjectStore + ?Sized> TransferEngine<'a, S> {
    /// A `worker_limit` of zero is treated as one
    pub fn new(store: &'a S, worker_limit: usize) -> Self {
        Self {
            store,
            worker_limit: worker_limit.max(1),
        }
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Transfer every item, returning once all of them have been attempted
    pub async fn run(
        &self,
        items: Vec<TransferItem>,
        direction: Direction,
        tracker: &ProgressTracker,
    ) -> BatchResult {
        let count = items.len();
        let mut result = BatchResult {
            total_bytes: tracker.total_bytes(),
            ..Default::default()
        };

        tracing::info!(
            bucket = self.store.bucket(),
            %direction,
            items = count,
            bytes = tracker.total_bytes(),
            workers = self.worker_limit,
            "Starting transfer batch"
        );

        let mut outcomes = stream::iter(items)
            .map(|item| async move {
                let outcome = self.transfer_one(&item, direction, tracker).await;
                (item, outcome)
            })
            .buffer_unordered(self.worker_limit);

        while let Some((item, outcome)) = outcomes.next().await {
            match outcome {
                Ok(bytes) => {
                    result.succeeded += 1;
                    tracing::debug!(key = %item.remote_key, bytes, "Transferred");
                }
                Err(e) => {
                    result.failed += 1;
                    tracing::warn!(
                        path = %item.local_path.display(),
                        key = %item.remote_key,
                        error = %e,
                        "Transfer failed"
                    );
                    if result.first_error.is_none() {
                        result.first_error = Some(Error::TransferItem {
                            path: item.local_path,
                            key: item.remote_key,
                            source: Box::new(e),
                        });
                    }
                }
            }
        }

        tracker.finish();
        result.completed_bytes = tracker.completed_bytes();

        tracing::info!(
            %direction,
            succeeded = result.succeeded,
            failed = result.failed,
            bytes = result.completed_bytes,
            "Transfer batch finished"
        );

        result
    }

    async fn transfer_one(
        &self,
        item: &TransferItem,
        direction: Direction,
        tracker: &ProgressTracker,
    ) -> Result<u64> {
        match direction {
            Direction::Upload => {
                self.store
                    .put_file(&item.remote_key, &item.local_path, tracker)
                    .await
            }
            Direction::Download => {
                if let Some(parent) = item.local_path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
                self.store
                    .get_file(&item.remote_key, &item.local_path, tracker)
                    .await
            }
        }
    }
}
