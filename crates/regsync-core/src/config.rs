//! Configuration for the regsync agent.
//!
//! All configuration is driven by environment variables. Compound values
//! use the `region:bucket` syntax inherited from the registry tooling this
//! agent mirrors for.

use std::time::Duration;

use crate::error::{RegsyncError, RegsyncResult};
use crate::types::{BucketLocation, Region, SyncTarget};

/// Work-queue identity: the region the queue lives in and its URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    /// Region hosting the queue.
    pub region: Region,
    /// Full queue URL.
    pub url: String,
}

impl QueueConfig {
    /// Parse a `region:host/path` queue specification.
    ///
    /// The scheme is fixed to `https`, matching the queue URLs handed out
    /// by the broker console.
    ///
    /// # Errors
    /// Returns [`RegsyncError::InvalidQueueSpec`] when either component is
    /// missing or empty.
    pub fn parse(spec: &str) -> RegsyncResult<Self> {
        let (region, uri) = spec
            .split_once(':')
            .ok_or_else(|| RegsyncError::InvalidQueueSpec(spec.to_owned()))?;
        if region.is_empty() || uri.is_empty() {
            return Err(RegsyncError::InvalidQueueSpec(spec.to_owned()));
        }
        Ok(Self {
            region: Region::new(region),
            url: format!("https://{uri}"),
        })
    }
}

/// Immutable per-process settings, built once at startup and shared
/// read-only by every component.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Source bucket and region the registry writes to.
    pub source: Option<BucketLocation>,
    /// Ordered list of replication targets.
    pub targets: Vec<SyncTarget>,
    /// Work-queue identity for the enqueue and poll modes.
    pub queue: Option<QueueConfig>,
    /// Number of concurrent copy workers per session.
    pub pool_size: usize,
    /// Request server-side encryption on every target write.
    pub use_sse: bool,
    /// Attach source-side decryption parameters to every copy.
    pub source_sse: bool,
    /// Seconds to sleep between poll iterations when the queue is idle.
    pub empty_queue_sleep_secs: u64,
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: None,
            targets: Vec::new(),
            queue: None,
            pool_size: 4,
            use_sse: false,
            source_sse: false,
            empty_queue_sleep_secs: 5,
            log_level: "info".to_owned(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SOURCE_BUCKET` | *(unset)* |
    /// | `TARGET_BUCKETS` | *(unset)* |
    /// | `SQS_QUEUE` | *(unset)* |
    /// | `POOL_SIZE` | `4` |
    /// | `USE_SSE` | `false` |
    /// | `SOURCE_SSE` | `false` |
    /// | `EMPTY_QUEUE_SLEEP_SECS` | `5` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    /// Returns an error when a compound value fails to parse.
    pub fn from_env() -> RegsyncResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SOURCE_BUCKET") {
            config.source = Some(BucketLocation::parse(&v)?);
        }
        if let Ok(v) = std::env::var("TARGET_BUCKETS") {
            config.targets = SyncTarget::parse_list(&v)?;
        }
        if let Ok(v) = std::env::var("SQS_QUEUE") {
            config.queue = Some(QueueConfig::parse(&v)?);
        }
        if let Ok(v) = std::env::var("POOL_SIZE") {
            config.pool_size = v
                .parse()
                .map_err(|_| RegsyncError::Config(format!("invalid POOL_SIZE: {v}")))?;
        }
        if let Ok(v) = std::env::var("USE_SSE") {
            config.use_sse = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SOURCE_SSE") {
            config.source_sse = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("EMPTY_QUEUE_SLEEP_SECS") {
            config.empty_queue_sleep_secs = v.parse().map_err(|_| {
                RegsyncError::Config(format!("invalid EMPTY_QUEUE_SLEEP_SECS: {v}"))
            })?;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        if config.pool_size == 0 {
            return Err(RegsyncError::Config("POOL_SIZE must be at least 1".into()));
        }

        Ok(config)
    }

    /// The idle-poll sleep interval as a [`Duration`].
    #[must_use]
    pub fn empty_queue_sleep(&self) -> Duration {
        Duration::from_secs(self.empty_queue_sleep_secs)
    }

    /// The configured source bucket.
    ///
    /// # Errors
    /// Returns [`RegsyncError::Config`] when `SOURCE_BUCKET` was not set.
    pub fn require_source(&self) -> RegsyncResult<&BucketLocation> {
        self.source
            .as_ref()
            .ok_or_else(|| RegsyncError::Config("SOURCE_BUCKET is required".into()))
    }

    /// The configured queue.
    ///
    /// # Errors
    /// Returns [`RegsyncError::Config`] when `SQS_QUEUE` was not set.
    pub fn require_queue(&self) -> RegsyncResult<&QueueConfig> {
        self.queue
            .as_ref()
            .ok_or_else(|| RegsyncError::Config("SQS_QUEUE is required".into()))
    }
}

/// Parse a boolean environment value (`1`/`true`, case-insensitive).
fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
