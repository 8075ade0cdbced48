//! Message-broker capability interface for regsync.
//!
//! The engine's enqueue and poll paths consume the [`MessageBroker`] trait
//! defined here. Two implementations exist: [`MemoryBroker`] (this crate),
//! used by the hermetic test suites, and the AWS adapter in `regsync-aws`.
//! One `MessageBroker` instance is scoped to one configured queue.

mod batch;
mod broker;
mod error;
mod memory;

pub use batch::{BatchSubmitError, DEFAULT_RETRY_BUDGET, entry_id, submit_batch};
pub use broker::{BatchEntry, MessageBroker, ReceivedMessage};
pub use error::{BrokerError, BrokerResult};
pub use memory::MemoryBroker;
