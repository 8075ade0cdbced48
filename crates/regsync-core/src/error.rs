//! Error types for the regsync core.

/// Core error type for regsync configuration and shared types.
#[derive(Debug, thiserror::Error)]
pub enum RegsyncError {
    /// A bucket specification could not be parsed.
    #[error("invalid bucket spec: {0} (expected region:bucket)")]
    InvalidBucketSpec(String),

    /// A target bucket specification could not be parsed.
    #[error("invalid target spec: {0} (expected region:bucket or region:bucket:sse)")]
    InvalidTargetSpec(String),

    /// A queue specification could not be parsed.
    #[error("invalid queue spec: {0} (expected region:host/path)")]
    InvalidQueueSpec(String),

    /// A required configuration value is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A job message body could not be encoded or decoded.
    #[error("malformed job message: {0}")]
    MalformedJob(#[from] serde_json::Error),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for regsync core operations.
pub type RegsyncResult<T> = Result<T, RegsyncError>;
