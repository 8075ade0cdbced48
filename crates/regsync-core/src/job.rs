//! Wire schema for queue-driven sync work.

use crate::error::RegsyncResult;
use crate::types::{BucketLocation, Region, SyncTarget};

/// Source half of a [`SyncJob`]: the bucket to copy from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobBucket {
    /// Bucket name.
    pub bucket: String,
    /// Region hosting the bucket.
    pub region: String,
}

/// Target half of a [`SyncJob`]: the bucket to copy into.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobTarget {
    /// Bucket name.
    pub bucket: String,
    /// Region hosting the bucket.
    pub region: String,
    /// Whether writes to this target must request server-side encryption.
    #[serde(default)]
    pub sse: bool,
}

/// One unit of queue-driven sync work, serialized as JSON on the wire.
///
/// Produced by the enqueue mode (one message per configured target) and
/// consumed by the poller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncJob {
    /// Delivery attempt counter carried for operators inspecting the queue.
    /// Redelivery is governed by the queue's visibility timeout, not by
    /// this field.
    pub retries: u32,
    /// Image (repository) name.
    pub image: String,
    /// Tag to sync, or `null` for a whole-repository sync.
    #[serde(default)]
    pub tag: Option<String>,
    /// Bucket to copy from.
    pub source: JobBucket,
    /// Bucket to copy into.
    pub target: JobTarget,
}

impl SyncJob {
    /// Build the job describing a sync of `image`(`:tag`) from `source`
    /// into `target`.
    #[must_use]
    pub fn new(
        image: impl Into<String>,
        tag: Option<String>,
        source: &BucketLocation,
        target: &SyncTarget,
    ) -> Self {
        Self {
            retries: 0,
            image: image.into(),
            tag,
            source: JobBucket {
                bucket: source.bucket.clone(),
                region: source.region.to_string(),
            },
            target: JobTarget {
                bucket: target.bucket.clone(),
                region: target.region.to_string(),
                sse: target.sse,
            },
        }
    }

    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    /// Returns an error when serialization fails.
    pub fn to_json(&self) -> RegsyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the JSON wire form.
    ///
    /// # Errors
    /// Returns [`crate::RegsyncError::MalformedJob`] on malformed input.
    pub fn from_json(body: &str) -> RegsyncResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// The job's source as a [`BucketLocation`].
    #[must_use]
    pub fn source_location(&self) -> BucketLocation {
        BucketLocation {
            region: Region::new(self.source.region.clone()),
            bucket: self.source.bucket.clone(),
        }
    }

    /// The job's target as a [`SyncTarget`].
    #[must_use]
    pub fn target_spec(&self) -> SyncTarget {
        SyncTarget {
            region: Region::new(self.target.region.clone()),
            bucket: self.target.bucket.clone(),
            sse: self.target.sse,
        }
    }
}
