//! Error types for bkt-core
//!
//! One error enum covers the local walk, key mapping, listing, transfers and
//! deletion. Each variant maps to a CLI exit code through [`Error::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by bkt-core and the store adapters
#[derive(Debug, Error)]
pub enum Error {
    /// The local root handed to an upload does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A path lies outside the root it was declared under, or a pattern is malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A key was reverse-mapped against a prefix it does not start with
    #[error("Key '{key}' does not start with prefix '{prefix}'")]
    KeyPrefixMismatch { key: String, prefix: String },

    /// A key carries no object name after its prefix
    #[error("Key '{0}' has no object name")]
    EmptyObjectName(String),

    /// A listing page request failed
    #[error("Listing failed: {0}")]
    Listing(#[source] Box<Error>),

    /// A single put or get failed
    #[error("Transfer of '{}' <-> '{key}' failed: {source}", .path.display())]
    TransferItem {
        path: PathBuf,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// A batched delete reported keys it could not remove
    #[error("{} object(s) were not deleted: {}", .keys.len(), .keys.join(", "))]
    PartialDeletion { keys: Vec<String> },

    /// At least one item of an upload or download batch failed
    #[error("{failed} of {} transfer(s) failed, first error: {first}", .succeeded + .failed)]
    BatchFailed {
        succeeded: usize,
        failed: usize,
        first: Box<Error>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Exit code the CLI reports for this error
    ///
    /// 1 general, 2 usage, 3 network, 4 auth, 5 not found.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::TomlParse(_) => 2,
            Error::Network(_) => 3,
            Error::Auth(_) => 4,
            Error::PathNotFound(_) | Error::NotFound(_) => 5,
            Error::Listing(inner) => inner.exit_code(),
            Error::TransferItem { source, .. } => source.exit_code(),
            _ => 1,
        }
    }

    /// Wrap a store error raised while fetching a listing page
    pub fn listing(source: Error) -> Self {
        match source {
            already @ Error::Listing(_) => already,
            other => Error::Listing(Box::new(other)),
        }
    }
}
