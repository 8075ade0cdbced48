//! Ancestry dedup across sessions.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regsync_core::Region;
    use regsync_engine::SyncService;
    use regsync_store::{MemoryObjectStore, ObjectStore};

    use crate::{TARGET_BUCKET, copies_into, seed_registry, target, test_config, test_service};

    #[tokio::test(start_paused = true)]
    async fn test_should_copy_shared_base_layer_only_once_across_syncs() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let service = test_service(&store);

        // "app" (img-a over base) then "dee" (img-d over base): the cache
        // outlives both sessions, so the second sync only copies img-d's
        // own prefix.
        assert!(service.sync("app", "v1").await.unwrap());
        assert!(service.sync("dee", "v1").await.unwrap());

        assert_eq!(
            copies_into(&store, TARGET_BUCKET, "registry/images/base/layer"),
            1
        );
        assert_eq!(
            copies_into(&store, TARGET_BUCKET, "registry/images/img-d/layer"),
            1
        );
        assert!(
            store
                .object(TARGET_BUCKET, "registry/images/img-d/layer")
                .is_some()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_copy_shared_layer_once_per_target() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store.create_bucket("second-mirror", Region::new("ap-southeast-2"));

        let service = SyncService::new(
            test_config(vec![target(TARGET_BUCKET), target("second-mirror")]),
            Arc::clone(&store) as Arc<dyn ObjectStore>,
        );
        assert!(service.sync("app", "v1").await.unwrap());

        // Distinct (layer, region, bucket) coordinates are tracked
        // independently; each target received its own copy, exactly once.
        assert_eq!(
            copies_into(&store, TARGET_BUCKET, "registry/images/base/layer"),
            1
        );
        assert_eq!(
            copies_into(&store, "second-mirror", "registry/images/base/layer"),
            1
        );
    }
}
