//! Bucket and region value types shared across services.

use std::fmt;

use crate::error::{RegsyncError, RegsyncResult};

/// Object-store region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region(String);

impl Region {
    /// Default region assumed when none is configured.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bucket pinned to the region that hosts it.
///
/// Parsed from the `region:bucket` syntax used by the CLI environment
/// variables, e.g. `us-west-2:registry-backing-store`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BucketLocation {
    /// Region hosting the bucket.
    pub region: Region,
    /// Bucket name.
    pub bucket: String,
}

impl BucketLocation {
    /// Parse a `region:bucket` specification.
    ///
    /// # Errors
    /// Returns [`RegsyncError::InvalidBucketSpec`] when either component is
    /// missing or empty.
    pub fn parse(spec: &str) -> RegsyncResult<Self> {
        let (region, bucket) = spec
            .split_once(':')
            .ok_or_else(|| RegsyncError::InvalidBucketSpec(spec.to_owned()))?;
        if region.is_empty() || bucket.is_empty() {
            return Err(RegsyncError::InvalidBucketSpec(spec.to_owned()));
        }
        Ok(Self {
            region: Region::new(region),
            bucket: bucket.to_owned(),
        })
    }
}

impl fmt::Display for BucketLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.bucket)
    }
}

/// One replication target: a bucket, its region, and whether objects
/// written to it must request server-side encryption.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncTarget {
    /// Region hosting the target bucket.
    pub region: Region,
    /// Target bucket name.
    pub bucket: String,
    /// Per-target server-side-encryption flag.
    pub sse: bool,
}

impl SyncTarget {
    /// Parse a `region:bucket` or `region:bucket:sse` specification.
    ///
    /// # Errors
    /// Returns [`RegsyncError::InvalidTargetSpec`] when the spec has the
    /// wrong number of components or an unrecognized trailing flag.
    pub fn parse(spec: &str) -> RegsyncResult<Self> {
        let mut parts = spec.split(':');
        let (Some(region), Some(bucket)) = (parts.next(), parts.next()) else {
            return Err(RegsyncError::InvalidTargetSpec(spec.to_owned()));
        };
        if region.is_empty() || bucket.is_empty() {
            return Err(RegsyncError::InvalidTargetSpec(spec.to_owned()));
        }
        let sse = match parts.next() {
            None => false,
            Some("sse") => true,
            Some(_) => return Err(RegsyncError::InvalidTargetSpec(spec.to_owned())),
        };
        if parts.next().is_some() {
            return Err(RegsyncError::InvalidTargetSpec(spec.to_owned()));
        }
        Ok(Self {
            region: Region::new(region),
            bucket: bucket.to_owned(),
            sse,
        })
    }

    /// Parse a comma-separated list of target specifications.
    ///
    /// # Errors
    /// Returns the first parse error encountered.
    pub fn parse_list(specs: &str) -> RegsyncResult<Vec<Self>> {
        specs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.bucket)
    }
}
