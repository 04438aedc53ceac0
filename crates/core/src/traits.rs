//! The store capability the core is written against
//!
//! `ObjectStore` abstracts one bucket of an S3-compatible service. The core
//! never talks to the network itself; `bkt-s3` provides the production
//! implementation and the tests provide in-memory fakes.

use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::Result;
use crate::progress::BytesTransferred;

/// Largest number of entries a single listing call may return
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Largest number of keys a single batched delete may carry
pub const MAX_DELETE_BATCH: usize = 1000;

/// An object descriptor produced by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Object key, slash-delimited, no leading slash
    pub key: String,

    /// Size in bytes
    pub size_bytes: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            last_modified: None,
            etag: None,
        }
    }

    /// Whether this key is a zero-byte "folder" marker such as `photos/`
    pub fn is_dir_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Options for one listing page request
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only keys starting with this literal string
    pub prefix: Option<String>,

    /// Upper bound on entries in this page
    pub max_keys: Option<i32>,

    /// Token returned by the previous page
    pub continuation_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub items: Vec<ObjectInfo>,

    /// Whether more pages follow
    pub truncated: bool,

    /// Token to request the next page with
    pub continuation_token: Option<String>,
}

/// A key the store refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Per-key outcome of one batched delete
#[derive(Debug, Clone, Default)]
pub struct DeleteResult {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

/// One bucket of an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store is bound to
    fn bucket(&self) -> &str;

    /// Fetch a single listing page
    async fn list_page(&self, options: ListOptions) -> Result<ListResult>;

    /// Upload a local file under `key`, reporting bytes as they are sent
    ///
    /// Returns the number of bytes uploaded.
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64>;

    /// Download `key` into a local file, reporting bytes as they are written
    ///
    /// The parent directory of `path` must already exist. Returns the number
    /// of bytes written.
    async fn get_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64>;

    /// Delete up to [`MAX_DELETE_BATCH`] keys in one call
    async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteResult>;
}
