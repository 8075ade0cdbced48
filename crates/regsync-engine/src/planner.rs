//! Sync planning: turning a replication intent into enqueued copy tasks.
//!
//! The planner runs on the caller's task, synchronously enumerating the
//! source store while the session's dispatcher consumes what it enqueues.
//! A planning failure aborts the current call and is reported as a local
//! failure; tasks already enqueued before the failure point are not
//! retracted and may still execute.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error};

use regsync_core::layout;
use regsync_core::{BucketLocation, SyncTarget};
use regsync_store::{CopyObjectRequest, ObjectAcl, ObjectStore, ServerSideEncryption};

use crate::dedup::DedupCache;
use crate::error::PlanError;
use crate::session::SyncSession;

/// Pause after each enqueue. Deliberate pacing so a large enumeration
/// does not saturate the target API; not a correctness requirement.
const ENQUEUE_THROTTLE: Duration = Duration::from_millis(100);

/// One record of a repository's image index document.
#[derive(Debug, serde::Deserialize)]
struct ImageIndexEntry {
    id: String,
}

/// Plans one sync call against one target, pushing copy tasks into the
/// running session.
#[derive(Debug)]
pub(crate) struct Planner<'a> {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) session: &'a SyncSession,
    pub(crate) dedup: &'a Mutex<DedupCache>,
    pub(crate) source: BucketLocation,
    pub(crate) target: SyncTarget,
    pub(crate) use_sse: bool,
    pub(crate) source_sse: bool,
}

impl Planner<'_> {
    /// Replicate one tag: its metadata keys, then the layer ancestry of
    /// the image the tag points at.
    pub(crate) async fn sync_tag(&self, image: &str, tag: &str) -> bool {
        match self.try_sync_tag(image, tag).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    image = %image,
                    tag = %tag,
                    destination = %self.target,
                    error = %e,
                    "tag sync failed"
                );
                false
            }
        }
    }

    /// Replicate a whole repository: every key under its prefix, then the
    /// ancestry of every image in its index.
    pub(crate) async fn sync_repo(&self, repo: &str) -> bool {
        match self.try_sync_repo(repo).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    repo = %repo,
                    destination = %self.target,
                    error = %e,
                    "repository sync failed"
                );
                false
            }
        }
    }

    async fn try_sync_tag(&self, image: &str, tag: &str) -> Result<(), PlanError> {
        let tag_pointer = layout::tag_key(image, tag);
        self.dispatch_keys(vec![
            layout::tag_json_key(image, tag),
            tag_pointer.clone(),
            layout::image_index_key(image),
        ])
        .await;

        // The tag pointer's body is the resolved image id.
        let body = self
            .store
            .get_object(&self.source.region, &self.source.bucket, &tag_pointer)
            .await?;
        let image_id = String::from_utf8_lossy(&body).trim().to_owned();
        self.try_sync_image(&image_id).await
    }

    async fn try_sync_repo(&self, repo: &str) -> Result<(), PlanError> {
        self.sync_prefix(&layout::repository_prefix(repo)).await?;

        let body = self
            .store
            .get_object(
                &self.source.region,
                &self.source.bucket,
                &layout::image_index_key(repo),
            )
            .await?;
        let index: Vec<ImageIndexEntry> = serde_json::from_slice(&body)?;
        for entry in index {
            self.try_sync_image(&entry.id).await?;
        }
        Ok(())
    }

    /// Walk the image's ancestry in document order, copying each ancestor
    /// not yet recorded for this target. Ancestors already in the dedup
    /// cache are skipped entirely.
    async fn try_sync_image(&self, image_id: &str) -> Result<(), PlanError> {
        let body = self
            .store
            .get_object(
                &self.source.region,
                &self.source.bucket,
                &layout::ancestry_key(image_id),
            )
            .await?;
        // The ancestry document includes the image itself.
        let ancestry: Vec<String> = serde_json::from_slice(&body)?;

        for ancestor in ancestry {
            let key = DedupCache::layer_key(
                &ancestor,
                self.target.region.as_str(),
                &self.target.bucket,
            );
            if self.dedup.lock().contains(&key) {
                debug!(layer = %ancestor, destination = %self.target, "layer already mirrored, skipping");
                continue;
            }
            self.sync_prefix(&layout::image_prefix(&ancestor)).await?;
            self.dedup.lock().insert(key);
        }
        Ok(())
    }

    /// Enumerate every key under `prefix`, following continuation tokens
    /// until the listing is exhausted, then enqueue the full key set.
    async fn sync_prefix(&self, prefix: &str) -> Result<(), PlanError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_page(
                    &self.source.region,
                    &self.source.bucket,
                    prefix,
                    token.as_deref(),
                )
                .await?;
            keys.extend(page.keys);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        self.dispatch_keys(keys).await;
        Ok(())
    }

    /// Build one fully-determined copy task per key and push it onto the
    /// session's queue.
    async fn dispatch_keys(&self, keys: Vec<String>) {
        for key in keys {
            debug!(
                key = %key,
                source_bucket = %self.source.bucket,
                target_bucket = %self.target.bucket,
                "queueing key"
            );
            self.session.push_task(CopyObjectRequest {
                source_bucket: self.source.bucket.clone(),
                key,
                target_region: self.target.region.clone(),
                target_bucket: self.target.bucket.clone(),
                acl: ObjectAcl::BucketOwnerFullControl,
                server_side_encryption: (self.use_sse || self.target.sse)
                    .then_some(ServerSideEncryption::Aes256),
                copy_source_sse: self.source_sse.then_some(ServerSideEncryption::Aes256),
            });
            tokio::time::sleep(ENQUEUE_THROTTLE).await;
        }
    }
}
