//! End-to-end tests for the regsync engine.
//!
//! Everything here runs hermetically against the in-memory object store
//! and broker; no credentials or network access required. The fixture
//! models a small registry with two repositories sharing a base layer:
//!
//! ```text
//! app  -> index [img-a]        img-a ancestry [img-a, base]
//! dee  -> index [img-d]        img-d ancestry [img-d, base]
//! ```

use std::sync::Arc;

use regsync_broker::{MemoryBroker, MessageBroker};
use regsync_core::{BucketLocation, Region, SyncConfig, SyncJob, SyncTarget, layout};
use regsync_engine::SyncService;
use regsync_store::{MemoryObjectStore, ObjectStore};

/// Source bucket every fixture syncs from.
pub const SOURCE_BUCKET: &str = "registry-backing-store";
/// Region hosting the source bucket.
pub const SOURCE_REGION: &str = "us-west-2";
/// Default target bucket.
pub const TARGET_BUCKET: &str = "registry-mirror";
/// Region hosting the targets.
pub const TARGET_REGION: &str = "eu-west-1";

/// A repository-prefix key that only a whole-repository sync copies;
/// used to tell the two poll branches apart.
pub const REPO_ONLY_KEY: &str = "registry/repositories/app/images_list";

/// Seed the registry fixture into `SOURCE_BUCKET` and create the default
/// target bucket.
pub fn seed_registry(store: &MemoryObjectStore) {
    store.create_bucket(SOURCE_BUCKET, Region::new(SOURCE_REGION));
    store.create_bucket(TARGET_BUCKET, Region::new(TARGET_REGION));

    let put = |key: String, body: &str| {
        store
            .put_object(SOURCE_BUCKET, key.clone(), body.to_owned())
            .unwrap_or_else(|e| panic!("failed to seed {key}: {e}"));
    };

    // Repository "app" with tag v1 -> img-a.
    put(layout::image_index_key("app"), r#"[{"id":"img-a"}]"#);
    put(layout::tag_key("app", "v1"), "img-a");
    put(layout::tag_json_key("app", "v1"), "\"img-a\"");
    put(REPO_ONLY_KEY.to_owned(), r#"["v1"]"#);

    // Repository "dee" with tag v1 -> img-d.
    put(layout::image_index_key("dee"), r#"[{"id":"img-d"}]"#);
    put(layout::tag_key("dee", "v1"), "img-d");
    put(layout::tag_json_key("dee", "v1"), "\"img-d\"");

    // Image objects; both images stack on the shared base layer.
    put(layout::ancestry_key("img-a"), r#"["img-a","base"]"#);
    put("registry/images/img-a/layer".to_owned(), "layer-a");
    put("registry/images/img-a/json".to_owned(), "{}");
    put(layout::ancestry_key("img-d"), r#"["img-d","base"]"#);
    put("registry/images/img-d/layer".to_owned(), "layer-d");
    put("registry/images/img-d/json".to_owned(), "{}");
    put(layout::ancestry_key("base"), r#"["base"]"#);
    put("registry/images/base/layer".to_owned(), "layer-base");
    put("registry/images/base/json".to_owned(), "{}");
}

/// The fixture's source location.
#[must_use]
pub fn source_location() -> BucketLocation {
    BucketLocation {
        region: Region::new(SOURCE_REGION),
        bucket: SOURCE_BUCKET.to_owned(),
    }
}

/// A target spec for `bucket` in the fixture's target region.
#[must_use]
pub fn target(bucket: &str) -> SyncTarget {
    SyncTarget {
        region: Region::new(TARGET_REGION),
        bucket: bucket.to_owned(),
        sse: false,
    }
}

/// Process configuration pointing at the fixture source and `targets`.
#[must_use]
pub fn test_config(targets: Vec<SyncTarget>) -> SyncConfig {
    SyncConfig {
        source: Some(source_location()),
        targets,
        pool_size: 3,
        ..SyncConfig::default()
    }
}

/// A service over `store` with the default single-target configuration.
#[must_use]
pub fn test_service(store: &Arc<MemoryObjectStore>) -> SyncService {
    SyncService::new(
        test_config(vec![target(TARGET_BUCKET)]),
        Arc::clone(store) as Arc<dyn ObjectStore>,
    )
}

/// A service over `store` and `broker` with the default configuration.
#[must_use]
pub fn test_service_with_broker(
    store: &Arc<MemoryObjectStore>,
    broker: &Arc<MemoryBroker>,
) -> SyncService {
    test_service(store).with_broker(Arc::clone(broker) as Arc<dyn MessageBroker>)
}

/// Wire body of a job syncing `image` (optionally one tag) into `bucket`.
#[must_use]
pub fn job_body(image: &str, tag: Option<&str>, bucket: &str) -> String {
    SyncJob::new(
        image,
        tag.map(str::to_owned),
        &source_location(),
        &target(bucket),
    )
    .to_json()
    .unwrap_or_else(|e| panic!("failed to encode job: {e}"))
}

/// How many times `key` was copied into `bucket`.
#[must_use]
pub fn copies_into(store: &MemoryObjectStore, bucket: &str, key: &str) -> usize {
    let wanted = format!("{bucket}/{key}");
    store
        .copied_keys()
        .iter()
        .filter(|copied| **copied == wanted)
        .count()
}

mod test_dedup;
mod test_enqueue;
mod test_poll;
mod test_sync;
