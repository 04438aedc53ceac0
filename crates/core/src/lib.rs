//! bkt-core: Core library for the bkt bucket synchronization tool
//!
//! This crate provides the SDK-independent parts of bkt:
//! - Mapping between local paths and bucket keys
//! - Local tree enumeration
//! - Paginated listing behind a single cursor
//! - The bounded-concurrency transfer engine and its progress accounting
//! - Batched deletion of key prefixes
//! - Configuration management
//!
//! Everything talks to storage through the [`ObjectStore`] trait, so the
//! engine can be tested against in-memory stores and driven by any backend.

pub mod config;
pub mod error;
pub mod folder;
pub mod listing;
pub mod manager;
pub mod path;
pub mod progress;
pub mod traits;
pub mod transfer;
pub mod walk;

pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use folder::{DeleteSummary, delete_all};
pub use listing::{ObjectLister, list_objects};
pub use manager::BucketManager;
pub use progress::{BytesTransferred, ProgressSink, ProgressTracker};
pub use traits::{
    DeleteFailure, DeleteResult, ListOptions, ListResult, MAX_DELETE_BATCH, MAX_PAGE_SIZE,
    ObjectInfo, ObjectStore,
};
pub use transfer::{BatchResult, DEFAULT_WORKERS, Direction, TransferEngine, TransferItem};
