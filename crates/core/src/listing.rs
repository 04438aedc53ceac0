//! Paginated listing hidden behind a single cursor
//!
//! Stores return at most [`MAX_PAGE_SIZE`] entries per call together with a
//! continuation token. [`ObjectLister`] follows the tokens so callers see one
//! uninterrupted sequence of objects.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::path::pattern_prefix;
use crate::traits::{ListOptions, MAX_PAGE_SIZE, ObjectInfo, ObjectStore};
use crate::walk::{compile_pattern, match_options};

/// Single-pass cursor over every object under a prefix
///
/// Pages are fetched lazily, one at a time. After an error or the last page
/// the cursor is exhausted; start a new lister to list again.
pub struct ObjectLister<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    prefix: String,
    buffer: VecDeque<ObjectInfo>,
    continuation_token: Option<String>,
    pages: usize,
    done: bool,
}

impl<'a, S: ObjectStore + ?Sized> ObjectLister<'a, S> {
    pub fn new(store: &'a S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            buffer: VecDeque::new(),
            continuation_token: None,
            pages: 0,
            done: false,
        }
    }

    /// Next object, fetching another page when the buffered one runs out
    pub async fn next(&mut self) -> Option<Result<ObjectInfo>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_page().await {
                self.done = true;
                return Some(Err(e));
            }
        }
    }

    /// Drain the cursor into a vector
    pub async fn collect_all(mut self) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        while let Some(item) = self.next().await {
            objects.push(item?);
        }
        Ok(objects)
    }

    /// Number of pages requested so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let options = ListOptions {
            prefix: (!self.prefix.is_empty()).then(|| self.prefix.clone()),
            max_keys: Some(MAX_PAGE_SIZE),
            continuation_token: self.continuation_token.take(),
        };

        let page = self
            .store
            .list_page(options)
            .await
            .map_err(Error::listing)?;
        self.pages += 1;

        tracing::debug!(
            bucket = self.store.bucket(),
            prefix = %self.prefix,
            page = self.pages,
            items = page.items.len(),
            truncated = page.truncated,
            "Fetched listing page"
        );

        self.buffer.extend(page.items);

        match page.continuation_token {
            Some(token) if page.truncated => self.continuation_token = Some(token),
            None if page.truncated => {
                return Err(Error::listing(Error::General(
                    "store reported more pages without a continuation token".to_string(),
                )));
            }
            _ => self.done = true,
        }

        Ok(())
    }
}

/// List every object under `prefix`
pub async fn list_objects<S: ObjectStore + ?Sized>(
    store: &S,
    prefix: &str,
) -> Result<Vec<ObjectInfo>> {
    ObjectLister::new(store, prefix).collect_all().await
}

/// List every object whose key matches a glob `pattern`
///
/// Only the literal part of the pattern before its first wildcard is sent to
/// the store as a prefix; the rest is matched locally.
pub async fn list_matching<S: ObjectStore + ?Sized>(
    store: &S,
    pattern: &str,
) -> Result<Vec<ObjectInfo>> {
    let compiled = compile_pattern(pattern)?;
    let options = match_options();

    let mut lister = ObjectLister::new(store, pattern_prefix(pattern));
    let mut matches = Vec::new();
    while let Some(item) = lister.next().await {
        let item = item?;
        if compiled.matches_with(&item.key, options) {
            matches.push(item);
        }
    }
    Ok(matches)
}
