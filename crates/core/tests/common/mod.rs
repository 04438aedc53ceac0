//! In-memory object store shared by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bkt_core::{
    BytesTransferred, DeleteFailure, DeleteResult, Error, ListOptions, ListResult, MAX_DELETE_BATCH,
    ObjectInfo, ObjectStore, Result,
};

/// Bytes reported per progress callback
const REPORT_CHUNK: usize = 4;

pub struct FakeStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
    delay: Duration,
    fail_keys: Mutex<HashSet<String>>,
    refuse_delete: Mutex<HashSet<String>>,
    fail_list_page: Option<usize>,
    pub list_calls: AtomicUsize,
    pub delete_batches: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: 1000,
            delay: Duration::ZERO,
            fail_keys: Mutex::new(HashSet::new()),
            refuse_delete: Mutex::new(HashSet::new()),
            fail_list_page: None,
            list_calls: AtomicUsize::new(0),
            delete_batches: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Serve smaller pages than the caller asks for
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Hold every transfer for `delay` so concurrency can be observed
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the listing call with this 1-based page number
    pub fn fail_on_list_page(mut self, page: usize) -> Self {
        self.fail_list_page = Some(page);
        self
    }

    /// Store `count` objects named `{prefix}{index:05}` of `size` bytes each
    pub fn with_objects(self, prefix: &str, count: usize, size: usize) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            for i in 0..count {
                objects.insert(format!("{prefix}{i:05}"), vec![b'x'; size]);
            }
        }
        self
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_string(), data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Make transfers of `key` fail
    pub fn fail_key(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(key.to_string());
    }

    /// Make the store report `key` as not deleted
    pub fn refuse_delete(&self, key: &str) {
        self.refuse_delete.lock().unwrap().insert(key.to_string());
    }

    async fn enter(&self, key: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_keys.lock().unwrap().contains(key) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Network(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn report(data: &[u8], progress: &dyn BytesTransferred) {
    for chunk in data.chunks(REPORT_CHUNK) {
        progress.on_bytes_transferred(chunk.len() as u64);
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn bucket(&self) -> &str {
        "fake-bucket"
    }

    async fn list_page(&self, options: ListOptions) -> Result<ListResult> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_list_page == Some(call) {
            return Err(Error::Network("listing connection reset".to_string()));
        }

        let prefix = options.prefix.unwrap_or_default();
        let start: usize = match options.continuation_token {
            Some(token) => token
                .parse()
                .map_err(|_| Error::General(format!("bad token {token}")))?,
            None => 0,
        };
        let limit = options
            .max_keys
            .map(|m| m as usize)
            .unwrap_or(1000)
            .min(self.page_size);

        let matching: Vec<ObjectInfo> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| ObjectInfo::new(k.clone(), v.len() as u64))
            .collect();

        let end = (start + limit).min(matching.len());
        let items = matching[start.min(end)..end].to_vec();
        let truncated = end < matching.len();

        Ok(ListResult {
            items,
            truncated,
            continuation_token: truncated.then(|| end.to_string()),
        })
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        self.enter(key).await?;
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => {
                self.leave();
                return Err(e.into());
            }
        };
        report(&data, progress);
        let len = data.len() as u64;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        self.leave();
        Ok(len)
    }

    async fn get_file(
        &self,
        key: &str,
        path: &Path,
        progress: &dyn BytesTransferred,
    ) -> Result<u64> {
        self.enter(key).await?;
        let data = self.get(key);
        let result = match data {
            Some(data) => match tokio::fs::write(path, &data).await {
                Ok(()) => {
                    report(&data, progress);
                    Ok(data.len() as u64)
                }
                Err(e) => Err(e.into()),
            },
            None => Err(Error::NotFound(key.to_string())),
        };
        self.leave();
        result
    }

    async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteResult> {
        if keys.len() > MAX_DELETE_BATCH {
            return Err(Error::General(format!(
                "MalformedXML: {} keys in one delete",
                keys.len()
            )));
        }
        self.delete_batches.lock().unwrap().push(keys.len());

        let refused = self.refuse_delete.lock().unwrap().clone();
        let mut objects = self.objects.lock().unwrap();
        let mut result = DeleteResult::default();
        for key in keys {
            if refused.contains(&key) {
                result.errors.push(DeleteFailure {
                    key,
                    message: "AccessDenied".to_string(),
                });
            } else {
                objects.remove(&key);
                result.deleted.push(key);
            }
        }
        Ok(result)
    }
}
