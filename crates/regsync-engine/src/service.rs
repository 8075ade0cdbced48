//! The long-lived sync service facade.
//!
//! [`SyncService`] owns the collaborators that outlive any single session:
//! the process configuration, the store and broker capabilities, the
//! process-wide dedup cache, and the cancellation token. It exposes the
//! three run modes: one-shot [`SyncService::sync`],
//! [`SyncService::enqueue`], and the queue poller in [`crate::poll`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use regsync_broker::{DEFAULT_RETRY_BUDGET, MessageBroker, submit_batch};
use regsync_core::{BucketLocation, CancelToken, SyncConfig, SyncJob, SyncTarget, layout};
use regsync_store::ObjectStore;

use crate::dedup::DedupCache;
use crate::error::EngineError;
use crate::planner::Planner;
use crate::session::SyncSession;

/// What one session should replicate.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SyncOp<'a> {
    /// One tag and the ancestry of the image it points at.
    Tag {
        /// Repository name.
        image: &'a str,
        /// Tag name.
        tag: &'a str,
    },
    /// A whole repository.
    Repo {
        /// Repository name.
        image: &'a str,
    },
}

/// Long-lived facade over the sync engine.
///
/// The dedup cache is created once here and shared by every session the
/// process runs; it is not per-session state.
#[derive(Debug)]
pub struct SyncService {
    pub(crate) config: Arc<SyncConfig>,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) broker: Option<Arc<dyn MessageBroker>>,
    pub(crate) dedup: Mutex<DedupCache>,
    pub(crate) cancel: CancelToken,
}

impl SyncService {
    /// Create a service over `store` with no broker attached.
    #[must_use]
    pub fn new(config: SyncConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            broker: None,
            dedup: Mutex::new(DedupCache::with_default_capacity()),
            cancel: CancelToken::new(),
        }
    }

    /// Attach the work-queue broker used by the enqueue and poll modes.
    #[must_use]
    pub fn with_broker(mut self, broker: Arc<dyn MessageBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Token observed by every session and by the poller. Wire it to the
    /// process signal handler to request a graceful shutdown.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// One-shot replication of `image:tag` to every configured target, in
    /// configured order.
    ///
    /// A target that already mirrors the repository's image index receives
    /// a tag sync; otherwise the whole repository is synced. Returns
    /// whether every target succeeded.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] when the source or target list is
    /// missing. Per-target sync failures are folded into the returned
    /// boolean, not raised.
    pub async fn sync(&self, image: &str, tag: &str) -> Result<bool, EngineError> {
        let source = self.config.require_source()?.clone();
        if self.config.targets.is_empty() {
            return Err(EngineError::Config("TARGET_BUCKETS is required".into()));
        }

        let mut all_ok = true;
        for target in &self.config.targets {
            let ok = match self.target_has_index(target, image).await {
                Ok(true) => {
                    info!(image = %image, tag = %tag, destination = %target, "syncing tag");
                    self.run_session(&source, target, SyncOp::Tag { image, tag })
                        .await
                }
                Ok(false) => {
                    info!(image = %image, destination = %target, "syncing repository");
                    self.run_session(&source, target, SyncOp::Repo { image })
                        .await
                }
                Err(e) => {
                    error!(destination = %target, error = %e, "failed to probe target index");
                    false
                }
            };
            all_ok &= ok;
        }
        Ok(all_ok)
    }

    /// Serialize one sync job per configured target and hand the batch to
    /// the broker.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] when the source, targets, or broker
    /// are missing, and [`EngineError::Submit`] when the batch could not
    /// be delivered within the retry budget.
    pub async fn enqueue(&self, image: &str, tag: Option<&str>) -> Result<(), EngineError> {
        let source = self.config.require_source()?;
        if self.config.targets.is_empty() {
            return Err(EngineError::Config("TARGET_BUCKETS is required".into()));
        }
        let broker = self.require_broker()?;

        let mut bodies = Vec::with_capacity(self.config.targets.len());
        for target in &self.config.targets {
            let job = SyncJob::new(image, tag.map(str::to_owned), source, target);
            bodies.push(job.to_json()?);
        }
        info!(image = %image, tag = ?tag, jobs = bodies.len(), "enqueuing sync jobs");
        submit_batch(broker.as_ref(), &bodies, DEFAULT_RETRY_BUDGET).await?;
        Ok(())
    }

    pub(crate) fn require_broker(&self) -> Result<&Arc<dyn MessageBroker>, EngineError> {
        self.broker
            .as_ref()
            .ok_or_else(|| EngineError::Config("no message broker configured".into()))
    }

    /// Whether the repository's image index is already mirrored to the
    /// target.
    pub(crate) async fn target_has_index(
        &self,
        target: &SyncTarget,
        image: &str,
    ) -> Result<bool, EngineError> {
        let exists = self
            .store
            .head_exists(
                &target.region,
                &target.bucket,
                &layout::image_index_key(image),
            )
            .await?;
        Ok(exists)
    }

    /// Run one full session executing `op` from `source` into `target`.
    ///
    /// The session is finalized on every path, so a caller can never leak
    /// a running dispatcher.
    pub(crate) async fn run_session(
        &self,
        source: &BucketLocation,
        target: &SyncTarget,
        op: SyncOp<'_>,
    ) -> bool {
        let mut session = SyncSession::new(
            Arc::clone(&self.store),
            self.config.pool_size,
            self.cancel.clone(),
        );
        session.start();
        let planner = Planner {
            store: Arc::clone(&self.store),
            session: &session,
            dedup: &self.dedup,
            source: source.clone(),
            target: target.clone(),
            use_sse: self.config.use_sse,
            source_sse: self.config.source_sse,
        };
        let planned = match op {
            SyncOp::Tag { image, tag } => planner.sync_tag(image, tag).await,
            SyncOp::Repo { image } => planner.sync_repo(image).await,
        };
        drop(planner);
        let copied = session.finalize().await;
        planned && copied
    }
}
