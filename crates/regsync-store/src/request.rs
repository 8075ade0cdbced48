//! Copy-request model types.

use regsync_core::Region;

/// Canned access-control directive applied to copied objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    /// Grant the target bucket's owner full control of the copy.
    BucketOwnerFullControl,
}

impl ObjectAcl {
    /// Wire form of the ACL directive.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Server-side-encryption algorithm requested on a read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSideEncryption {
    /// AES-256, the only algorithm the registry store uses.
    Aes256,
}

impl ServerSideEncryption {
    /// Wire form of the algorithm name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes256 => "AES256",
        }
    }
}

/// One object-copy instruction, fully determined before it is enqueued.
///
/// The key path is identical on both sides; only the bucket (and possibly
/// region) changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyObjectRequest {
    /// Bucket to copy from.
    pub source_bucket: String,
    /// Object key, identical in source and target.
    pub key: String,
    /// Region hosting the target bucket.
    pub target_region: Region,
    /// Bucket to copy into.
    pub target_bucket: String,
    /// Access-control directive applied to the copy.
    pub acl: ObjectAcl,
    /// Encryption requested on the target write, if any.
    pub server_side_encryption: Option<ServerSideEncryption>,
    /// Decryption algorithm attached for the source read, if any.
    pub copy_source_sse: Option<ServerSideEncryption>,
}
