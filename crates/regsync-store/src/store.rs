//! The object-store capability trait.

use async_trait::async_trait;
use bytes::Bytes;
use regsync_core::Region;

use crate::error::StoreResult;
use crate::request::CopyObjectRequest;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Keys in this page, in lexicographic order.
    pub keys: Vec<String>,
    /// Continuation token for the next page, `None` when exhausted.
    pub next_token: Option<String>,
}

/// Capability interface over the registry's backing object store.
///
/// Uses `#[async_trait]` because the engine holds implementations as
/// `Arc<dyn ObjectStore>` for dynamic dispatch across worker tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Whether `bucket/key` exists. A missing bucket reads as `false`.
    async fn head_exists(&self, region: &Region, bucket: &str, key: &str) -> StoreResult<bool>;

    /// Read the full body of `bucket/key`.
    async fn get_object(&self, region: &Region, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// List one page of keys under `prefix`, resuming from `token` when
    /// given. Callers follow [`ListPage::next_token`] until it is `None`.
    async fn list_page(
        &self,
        region: &Region,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> StoreResult<ListPage>;

    /// Server-side copy of a single object.
    async fn copy_object(&self, request: &CopyObjectRequest) -> StoreResult<()>;
}
