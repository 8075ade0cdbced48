//! Message-broker error types.

/// Errors surfaced by a [`crate::MessageBroker`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A receipt handle did not match any in-flight message.
    #[error("invalid receipt handle: {0}")]
    InvalidReceiptHandle(String),

    /// Any other broker API failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
