//! bkt-s3: S3 adapter for bkt
//!
//! Implements the `ObjectStore` trait from bkt-core on top of aws-sdk-s3 and
//! resolves credential profiles through aws-config.

pub mod client;
pub mod credentials;

pub use client::{MULTIPART_THRESHOLD, PART_SIZE, S3Client, StoreConfig};
pub use credentials::resolve_profile;
