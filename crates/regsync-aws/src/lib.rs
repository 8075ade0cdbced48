//! AWS adapters for the regsync capability interfaces.
//!
//! [`AwsObjectStore`] implements `regsync_store::ObjectStore` over
//! `aws-sdk-s3`, keeping one client per region, and [`AwsMessageBroker`]
//! implements `regsync_broker::MessageBroker` over `aws-sdk-sqs`, scoped
//! to the configured queue.

mod s3;
mod sqs;

pub use s3::AwsObjectStore;
pub use sqs::AwsMessageBroker;

/// Load the shared AWS SDK configuration (credentials, default region)
/// from the environment.
pub async fn load_base_config() -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await
}
