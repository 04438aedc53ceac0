//! Deleting every key under a prefix
//!
//! The store accepts at most [`MAX_DELETE_BATCH`] keys per delete call, so the
//! listing is split into chunks and each chunk is sent separately.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::listing::list_objects;
use crate::traits::{DeleteResult, MAX_DELETE_BATCH, ObjectStore};

/// Outcome of a successful folder deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    /// Keys the store confirmed deleted
    pub deleted: usize,

    /// Delete calls issued
    pub batches: usize,
}

/// Delete all objects whose key starts with `prefix`
///
/// An empty listing is a success with nothing deleted. Any key the store
/// does not confirm as deleted, in any batch, fails the whole operation with
/// [`Error::PartialDeletion`] once every batch has been sent.
pub async fn delete_all<S: ObjectStore + ?Sized>(store: &S, prefix: &str) -> Result<DeleteSummary> {
    let objects = list_objects(store, prefix).await?;
    if objects.is_empty() {
        tracing::info!(bucket = store.bucket(), prefix, "Nothing to delete");
        return Ok(DeleteSummary::default());
    }

    let keys: Vec<String> = objects.into_iter().map(|o| o.key).collect();
    let mut summary = DeleteSummary::default();
    let mut failed_keys = Vec::new();

    for chunk in keys.chunks(MAX_DELETE_BATCH) {
        let result = store.delete_objects(chunk.to_vec()).await?;
        summary.batches += 1;
        summary.deleted += result.deleted.len();

        for failure in &result.errors {
            tracing::warn!(key = %failure.key, error = %failure.message, "Object was not deleted");
        }
        failed_keys.extend(unconfirmed(chunk, &result));
    }

    tracing::info!(
        bucket = store.bucket(),
        prefix,
        deleted = summary.deleted,
        batches = summary.batches,
        failed = failed_keys.len(),
        "Folder deletion finished"
    );

    if !failed_keys.is_empty() {
        return Err(Error::PartialDeletion { keys: failed_keys });
    }

    Ok(summary)
}

/// Keys of `requested` the store did not confirm, in request order
fn unconfirmed(requested: &[String], result: &DeleteResult) -> Vec<String> {
    let confirmed: HashSet<&str> = result.deleted.iter().map(String::as_str).collect();
    let refused: HashSet<&str> = result.errors.iter().map(|f| f.key.as_str()).collect();

    requested
        .iter()
        .filter(|key| refused.contains(key.as_str()) || !confirmed.contains(key.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DeleteFailure;

    #[test]
    fn test_unconfirmed_keys() {
        let requested: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let result = DeleteResult {
            deleted: vec!["a".to_string(), "c".to_string()],
            errors: vec![DeleteFailure {
                key: "b".to_string(),
                message: "AccessDenied".to_string(),
            }],
        };
        assert_eq!(unconfirmed(&requested, &result), vec!["b", "d"]);
    }

    #[test]
    fn test_all_confirmed() {
        let requested = vec!["x".to_string()];
        let result = DeleteResult {
            deleted: vec!["x".to_string()],
            errors: vec![],
        };
        assert!(unconfirmed(&requested, &result).is_empty());
    }
}
