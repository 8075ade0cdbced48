//! Object-store error types.

/// Errors surfaced by an [`crate::ObjectStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed bucket does not exist.
    #[error("no such bucket: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The addressed key does not exist.
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey {
        /// The bucket that was searched.
        bucket: String,
        /// The key that was not found.
        key: String,
    },

    /// Any other store API failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for object-store operations.
pub type StoreResult<T> = Result<T, StoreError>;
