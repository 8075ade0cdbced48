//! The queue poller: a long-running loop that leases one job at a time.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use regsync_core::{SyncJob, layout};

use crate::error::EngineError;
use crate::service::{SyncOp, SyncService};

/// Exclusive-processing window requested for each leased message; one
/// sync gets fifteen minutes before the queue may redeliver it.
const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(900);

/// Bounded long-poll wait for a message to arrive.
const RECEIVE_WAIT: Duration = Duration::from_secs(10);

/// Result of one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The queue had no visible message.
    Empty,
    /// A job ran to success and its message was deleted.
    Acknowledged,
    /// A job failed; its message stays leased and the queue redelivers it
    /// once the visibility window lapses.
    LeftOnQueue,
}

impl SyncService {
    /// Poll the queue until cancellation is requested.
    ///
    /// Routine per-message sync failures leave the message for redelivery
    /// and keep the loop alive; that lease-expiry redelivery is the only
    /// retry mechanism on this path. Any error escaping an iteration is
    /// fatal and stops the poller. A failed iteration cannot leak a
    /// running session: [`SyncService::run_session`] finalizes on every
    /// path before returning.
    ///
    /// # Errors
    /// Returns the first loop-fatal error (broker transport failure,
    /// malformed message, target probe failure).
    pub async fn poll(&self) -> Result<(), EngineError> {
        info!("polling queue for images to sync");
        loop {
            if self.cancel.is_cancelled() {
                info!("shutdown requested, stopping poller");
                return Ok(());
            }
            if let Err(e) = self.poll_once().await {
                error!(error = %e, "unrecoverable error while monitoring queue, exiting");
                return Err(e);
            }
            if !self.cancel.is_cancelled() {
                tokio::select! {
                    () = tokio::time::sleep(self.config.empty_queue_sleep()) => {}
                    () = self.cancel.cancelled() => {}
                }
            }
        }
    }

    /// One poll iteration: lease at most one message, run the matching
    /// session, and acknowledge the message only if the session succeeded.
    ///
    /// The job's own source and target override the process configuration
    /// for the session it drives.
    ///
    /// # Errors
    /// Returns an error when the broker call fails, the message body does
    /// not decode, or the target index probe fails. Sync failures inside
    /// the session are reported as [`PollOutcome::LeftOnQueue`], not as
    /// errors.
    pub async fn poll_once(&self) -> Result<PollOutcome, EngineError> {
        let broker = self.require_broker()?;
        let Some(message) = broker.receive_one(VISIBILITY_TIMEOUT, RECEIVE_WAIT).await? else {
            debug!("queue returned no messages");
            return Ok(PollOutcome::Empty);
        };

        let job = SyncJob::from_json(&message.body)?;
        info!(
            image = %job.image,
            tag = ?job.tag,
            target_bucket = %job.target.bucket,
            target_region = %job.target.region,
            retries = job.retries,
            "received sync job"
        );

        let source = job.source_location();
        let target = job.target_spec();
        let index_exists = self
            .store
            .head_exists(
                &target.region,
                &target.bucket,
                &layout::image_index_key(&job.image),
            )
            .await?;

        let success = if index_exists {
            if let Some(tag) = &job.tag {
                info!(image = %job.image, tag = %tag, destination = %target, "syncing tag");
                self.run_session(
                    &source,
                    &target,
                    SyncOp::Tag {
                        image: &job.image,
                        tag,
                    },
                )
                .await
            } else {
                warn!(
                    image = %job.image,
                    "job carries no tag but the target index exists, syncing whole repository"
                );
                self.run_session(&source, &target, SyncOp::Repo { image: &job.image })
                    .await
            }
        } else {
            info!(image = %job.image, destination = %target, "syncing repository");
            self.run_session(&source, &target, SyncOp::Repo { image: &job.image })
                .await
        };

        if success {
            broker.delete_message(&message.receipt_handle).await?;
            info!(image = %job.image, "finished sync, acknowledged message");
            Ok(PollOutcome::Acknowledged)
        } else {
            warn!(
                image = %job.image,
                "sync failed, leaving message on queue for redelivery"
            );
            Ok(PollOutcome::LeftOnQueue)
        }
    }
}
