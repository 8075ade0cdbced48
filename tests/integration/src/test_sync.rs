//! Direct (one-shot) sync integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regsync_core::{Region, layout};
    use regsync_engine::SyncService;
    use regsync_store::{MemoryObjectStore, ObjectStore};

    use crate::{
        REPO_ONLY_KEY, TARGET_BUCKET, seed_registry, target, test_config, test_service,
    };

    #[tokio::test(start_paused = true)]
    async fn test_should_mirror_whole_repository_to_fresh_target() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let service = test_service(&store);

        assert!(service.sync("app", "v1").await.unwrap());

        // The fresh target had no image index, so the whole repository
        // prefix and every ancestor's objects were mirrored.
        for key in [
            layout::image_index_key("app"),
            layout::tag_key("app", "v1"),
            layout::tag_json_key("app", "v1"),
            REPO_ONLY_KEY.to_owned(),
            "registry/images/img-a/layer".to_owned(),
            "registry/images/img-a/json".to_owned(),
            "registry/images/base/layer".to_owned(),
            "registry/images/base/json".to_owned(),
        ] {
            assert!(
                store.object(TARGET_BUCKET, &key).is_some(),
                "missing {key} in target"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_sync_only_tag_when_target_index_exists() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        // The target already mirrors the repository index.
        store
            .put_object(TARGET_BUCKET, layout::image_index_key("app"), "[]")
            .unwrap();
        let service = test_service(&store);

        assert!(service.sync("app", "v1").await.unwrap());

        assert!(
            store
                .object(TARGET_BUCKET, &layout::tag_key("app", "v1"))
                .is_some()
        );
        assert!(
            store
                .object(TARGET_BUCKET, "registry/images/img-a/layer")
                .is_some()
        );
        // Repository-prefix keys outside the tag metadata were not touched.
        assert!(store.object(TARGET_BUCKET, REPO_ONLY_KEY).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_sync_every_configured_target_in_order() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store.create_bucket("second-mirror", Region::new("ap-southeast-2"));

        let service = SyncService::new(
            test_config(vec![target(TARGET_BUCKET), target("second-mirror")]),
            Arc::clone(&store) as Arc<dyn ObjectStore>,
        );
        assert!(service.sync("app", "v1").await.unwrap());

        for bucket in [TARGET_BUCKET, "second-mirror"] {
            assert!(
                store
                    .object(bucket, "registry/images/base/layer")
                    .is_some(),
                "missing base layer in {bucket}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_report_failure_but_still_sync_healthy_targets() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store.create_bucket("second-mirror", Region::new("ap-southeast-2"));
        store.poison_copy(TARGET_BUCKET, "registry/images/base/layer");

        let service = SyncService::new(
            test_config(vec![target(TARGET_BUCKET), target("second-mirror")]),
            Arc::clone(&store) as Arc<dyn ObjectStore>,
        );

        // Aggregate result is failure, but the second target completed.
        assert!(!service.sync("app", "v1").await.unwrap());
        assert!(
            store
                .object("second-mirror", "registry/images/base/layer")
                .is_some()
        );
    }
}
