//! S3 implementation of the object-store capability.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::types::{ObjectCannedAcl, ServerSideEncryption as S3Encryption};
use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;

use regsync_core::Region;
use regsync_store::{
    CopyObjectRequest, ListPage, ObjectAcl, ObjectStore, ServerSideEncryption, StoreError,
    StoreResult,
};

/// Object store backed by S3, with one client per region.
///
/// Clients are built lazily from the shared SDK configuration and cached;
/// every copy is a server-side `CopyObject` against the target region's
/// client, exactly how the registry's own tooling writes its mirrors.
#[derive(Debug)]
pub struct AwsObjectStore {
    base: SdkConfig,
    clients: DashMap<String, Client>,
}

impl AwsObjectStore {
    /// Create a store over the shared SDK configuration.
    #[must_use]
    pub fn new(base: SdkConfig) -> Self {
        Self {
            base,
            clients: DashMap::new(),
        }
    }

    fn client(&self, region: &Region) -> Client {
        if let Some(client) = self.clients.get(region.as_str()) {
            return client.clone();
        }
        trace!(region = %region, "building S3 client");
        let config = aws_sdk_s3::config::Builder::from(&self.base)
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .build();
        let client = Client::from_conf(config);
        self.clients
            .insert(region.as_str().to_owned(), client.clone());
        client
    }
}

fn to_canned_acl(acl: ObjectAcl) -> ObjectCannedAcl {
    match acl {
        ObjectAcl::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
    }
}

fn to_s3_encryption(sse: ServerSideEncryption) -> S3Encryption {
    match sse {
        ServerSideEncryption::Aes256 => S3Encryption::Aes256,
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn head_exists(&self, region: &Region, bucket: &str, key: &str) -> StoreResult<bool> {
        let result = self
            .client(region)
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(HeadObjectError::is_not_found) => {
                Ok(false)
            }
            Err(err) => Err(StoreError::Internal(
                anyhow::Error::new(err).context(format!("head {bucket}/{key}")),
            )),
        }
    }

    async fn get_object(&self, region: &Region, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let output = self
            .client(region)
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    StoreError::NoSuchKey {
                        bucket: bucket.to_owned(),
                        key: key.to_owned(),
                    }
                } else {
                    StoreError::Internal(
                        anyhow::Error::new(err).context(format!("get {bucket}/{key}")),
                    )
                }
            })?;

        let data = output.body.collect().await.map_err(|err| {
            StoreError::Internal(
                anyhow::Error::new(err).context(format!("read body of {bucket}/{key}")),
            )
        })?;
        Ok(data.into_bytes())
    }

    async fn list_page(
        &self,
        region: &Region,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let mut request = self
            .client(region)
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix);
        if let Some(token) = token {
            request = request.continuation_token(token);
        }
        let output = request.send().await.map_err(|err| {
            StoreError::Internal(
                anyhow::Error::new(err).context(format!("list {bucket}/{prefix}")),
            )
        })?;

        let keys = output
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();
        Ok(ListPage {
            keys,
            next_token: output.next_continuation_token,
        })
    }

    async fn copy_object(&self, request: &CopyObjectRequest) -> StoreResult<()> {
        let mut operation = self
            .client(&request.target_region)
            .copy_object()
            .copy_source(format!("{}/{}", request.source_bucket, request.key))
            .bucket(&request.target_bucket)
            .key(&request.key)
            .acl(to_canned_acl(request.acl));
        if let Some(sse) = request.server_side_encryption {
            operation = operation.server_side_encryption(to_s3_encryption(sse));
        }
        if let Some(sse) = request.copy_source_sse {
            operation = operation.copy_source_sse_customer_algorithm(sse.as_str());
        }

        operation.send().await.map_err(|err| {
            StoreError::Internal(anyhow::Error::new(err).context(format!(
                "copy {}/{} to {}",
                request.source_bucket, request.key, request.target_bucket
            )))
        })?;
        Ok(())
    }
}
