//! In-memory object store.
//!
//! Buckets are keyed by name alone (bucket names are globally unique; the
//! region argument is accepted for interface parity and ignored). Object
//! bodies are held as [`Bytes`] in a sorted map so prefix listings come out
//! in lexicographic order, page by page, like the real store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use regsync_core::Region;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::request::CopyObjectRequest;
use crate::store::{ListPage, ObjectStore};

/// Default number of keys returned per listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Per-bucket state: the hosting region and the sorted object map.
#[derive(Debug)]
struct BucketState {
    #[allow(dead_code)]
    region: Region,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

/// Thread-safe in-memory [`ObjectStore`].
///
/// Used by the hermetic test suites and by dry runs. Copies are recorded in
/// an operation log so callers can audit copy traffic, and individual
/// target keys can be poisoned to force copy failures.
#[derive(Debug)]
pub struct MemoryObjectStore {
    buckets: DashMap<String, Arc<BucketState>>,
    page_size: usize,
    copy_log: Mutex<Vec<CopyObjectRequest>>,
    poisoned: DashMap<(String, String), ()>,
}

impl MemoryObjectStore {
    /// Create an empty store with the default listing page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store returning at most `page_size` keys per
    /// listing page.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: DashMap::new(),
            page_size: page_size.max(1),
            copy_log: Mutex::new(Vec::new()),
            poisoned: DashMap::new(),
        }
    }

    /// Create a bucket in `region`. Creating an existing bucket is a no-op.
    pub fn create_bucket(&self, bucket: impl Into<String>, region: Region) {
        self.buckets
            .entry(bucket.into())
            .or_insert_with(|| {
                Arc::new(BucketState {
                    region,
                    objects: RwLock::new(BTreeMap::new()),
                })
            });
    }

    /// Write an object body.
    ///
    /// # Errors
    /// Returns [`StoreError::NoSuchBucket`] when the bucket does not exist.
    pub fn put_object(
        &self,
        bucket: &str,
        key: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> StoreResult<()> {
        let state = self.bucket(bucket)?;
        state.objects.write().insert(key.into(), body.into());
        Ok(())
    }

    /// Read an object body, if present.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.buckets.get(bucket)?;
        let body = state.objects.read().get(key).cloned();
        body
    }

    /// Number of objects currently stored in `bucket`.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .get(bucket)
            .map_or(0, |state| state.objects.read().len())
    }

    /// Every completed copy request so far, in completion order.
    #[must_use]
    pub fn copy_log(&self) -> Vec<CopyObjectRequest> {
        self.copy_log.lock().clone()
    }

    /// Every completed copy so far, as `target-bucket/key`, in completion
    /// order.
    #[must_use]
    pub fn copied_keys(&self) -> Vec<String> {
        self.copy_log
            .lock()
            .iter()
            .map(|request| format!("{}/{}", request.target_bucket, request.key))
            .collect()
    }

    /// Force every subsequent copy into `target_bucket/key` to fail.
    pub fn poison_copy(&self, target_bucket: impl Into<String>, key: impl Into<String>) {
        self.poisoned.insert((target_bucket.into(), key.into()), ());
    }

    fn bucket(&self, bucket: &str) -> StoreResult<Arc<BucketState>> {
        self.buckets
            .get(bucket)
            .map(|entry| Arc::clone(&entry))
            .ok_or_else(|| StoreError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head_exists(&self, _region: &Region, bucket: &str, key: &str) -> StoreResult<bool> {
        let Some(state) = self.buckets.get(bucket) else {
            return Ok(false);
        };
        let exists = state.objects.read().contains_key(key);
        Ok(exists)
    }

    async fn get_object(&self, _region: &Region, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let state = self.bucket(bucket)?;
        let body = state.objects.read().get(key).cloned();
        body.ok_or_else(|| StoreError::NoSuchKey {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    async fn list_page(
        &self,
        _region: &Region,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let state = self.bucket(bucket)?;
        let objects = state.objects.read();

        let start = match token {
            Some(t) => Bound::Excluded(t.to_owned()),
            None => Bound::Included(prefix.to_owned()),
        };
        let mut keys: Vec<String> = objects
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();

        let next_token = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn copy_object(&self, request: &CopyObjectRequest) -> StoreResult<()> {
        let poisoned = self
            .poisoned
            .contains_key(&(request.target_bucket.clone(), request.key.clone()));
        if poisoned {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "copy of {}/{} rejected by poison marker",
                request.target_bucket,
                request.key
            )));
        }

        let source = self.bucket(&request.source_bucket)?;
        let body = source.objects.read().get(&request.key).cloned();
        let body = body.ok_or_else(|| StoreError::NoSuchKey {
            bucket: request.source_bucket.clone(),
            key: request.key.clone(),
        })?;

        let target = self.bucket(&request.target_bucket)?;
        target.objects.write().insert(request.key.clone(), body);

        trace!(
            source_bucket = %request.source_bucket,
            target_bucket = %request.target_bucket,
            key = %request.key,
            "copied object"
        );
        self.copy_log.lock().push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ObjectAcl;

    fn copy_request(key: &str) -> CopyObjectRequest {
        CopyObjectRequest {
            source_bucket: "src".to_owned(),
            key: key.to_owned(),
            target_region: Region::default(),
            target_bucket: "dst".to_owned(),
            acl: ObjectAcl::BucketOwnerFullControl,
            server_side_encryption: None,
            copy_source_sse: None,
        }
    }

    fn seeded_store() -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        store.create_bucket("src", Region::default());
        store.create_bucket("dst", Region::default());
        store.put_object("src", "a/1", "one").unwrap();
        store.put_object("src", "a/2", "two").unwrap();
        store.put_object("src", "b/1", "other").unwrap();
        store
    }

    #[tokio::test]
    async fn test_should_report_existence() {
        let store = seeded_store();
        let region = Region::default();
        assert!(store.head_exists(&region, "src", "a/1").await.unwrap());
        assert!(!store.head_exists(&region, "src", "a/9").await.unwrap());
        assert!(!store.head_exists(&region, "missing", "a/1").await.unwrap());
    }

    #[tokio::test]
    async fn test_should_get_object_body() {
        let store = seeded_store();
        let body = store
            .get_object(&Region::default(), "src", "a/1")
            .await
            .unwrap();
        assert_eq!(body, Bytes::from("one"));
    }

    #[tokio::test]
    async fn test_should_error_on_missing_key() {
        let store = seeded_store();
        let err = store
            .get_object(&Region::default(), "src", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchKey { .. }));
    }

    #[tokio::test]
    async fn test_should_list_only_prefix_matches() {
        let store = seeded_store();
        let page = store
            .list_page(&Region::default(), "src", "a/", None)
            .await
            .unwrap();
        assert_eq!(page.keys, vec!["a/1", "a/2"]);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_should_paginate_with_continuation_tokens() {
        let store = MemoryObjectStore::with_page_size(2);
        store.create_bucket("src", Region::default());
        for i in 0..5 {
            store.put_object("src", format!("p/{i}"), "x").unwrap();
        }

        let region = Region::default();
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = store
                .list_page(&region, "src", "p/", token.as_deref())
                .await
                .unwrap();
            keys.extend(page.keys);
            pages += 1;
            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        assert_eq!(pages, 3);
        assert_eq!(keys, vec!["p/0", "p/1", "p/2", "p/3", "p/4"]);
    }

    #[tokio::test]
    async fn test_should_copy_between_buckets() {
        let store = seeded_store();
        store.copy_object(&copy_request("a/1")).await.unwrap();
        assert_eq!(store.object("dst", "a/1").unwrap(), Bytes::from("one"));
        assert_eq!(store.copied_keys(), vec!["dst/a/1"]);
    }

    #[tokio::test]
    async fn test_should_fail_poisoned_copies() {
        let store = seeded_store();
        store.poison_copy("dst", "a/1");
        assert!(store.copy_object(&copy_request("a/1")).await.is_err());
        assert!(store.object("dst", "a/1").is_none());
    }
}
