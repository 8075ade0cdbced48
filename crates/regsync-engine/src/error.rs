//! Engine error types.

use regsync_broker::{BatchSubmitError, BrokerError};
use regsync_core::RegsyncError;
use regsync_store::StoreError;

/// Errors that escape an engine entry point.
///
/// Per-task copy failures and per-call planning failures never surface
/// here; they are logged and folded into the session's boolean result.
/// An `EngineError` out of the poller is loop-fatal and terminates the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required collaborator or setting is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// Shared-type failure (job decoding, config access).
    #[error(transparent)]
    Core(#[from] RegsyncError),

    /// Object-store failure outside any session.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Broker receive/delete failure.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Batch submission gave up.
    #[error(transparent)]
    Submit(#[from] BatchSubmitError),
}

/// Planner-local failure: listing or metadata fetch errors that abort one
/// `sync_tag`/`sync_repo`/`sync_image` call.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PlanError {
    /// The source store refused a listing or metadata read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A registry document (index, ancestry) failed to parse.
    #[error("malformed registry document: {0}")]
    Document(#[from] serde_json::Error),
}
