//! Concurrent sync engine for regsync.
//!
//! The engine replicates registry artifacts from a source bucket into
//! target buckets through a bounded worker pool:
//!
//! ```text
//! Planner (enumerates keys)          Dispatcher (one per session)
//!     |                                   |
//!     v                                   v
//! Copy Task Queue  ----------------> Worker slots [0..pool_size)
//!                                        |
//!                                        v
//!                                   Status Queue --> session result
//! ```
//!
//! [`SyncService`] is the long-lived facade: it owns the process-lifetime
//! dedup cache and drives the three modes (one-shot sync, batch enqueue,
//! queue poller). Each unit of work runs inside a [`SyncSession`], which
//! owns a fresh task queue, status queue, and slot array.

mod dedup;
mod error;
mod planner;
mod poll;
mod service;
mod session;

pub use dedup::DedupCache;
pub use error::EngineError;
pub use poll::PollOutcome;
pub use service::SyncService;
pub use session::SyncSession;
