//! Queue-driven sync integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regsync_broker::MemoryBroker;
    use regsync_core::layout;
    use regsync_engine::PollOutcome;
    use regsync_store::MemoryObjectStore;

    use crate::{
        REPO_ONLY_KEY, TARGET_BUCKET, job_body, seed_registry, test_service_with_broker,
    };

    #[tokio::test(start_paused = true)]
    async fn test_should_acknowledge_message_after_successful_sync() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let broker = Arc::new(MemoryBroker::new());
        broker.push_message(job_body("app", Some("v1"), TARGET_BUCKET));
        let service = test_service_with_broker(&store, &broker);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        assert!(broker.is_empty());
        assert!(
            store
                .object(TARGET_BUCKET, "registry/images/base/layer")
                .is_some()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_leave_message_on_queue_after_failed_sync() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store.poison_copy(TARGET_BUCKET, "registry/images/base/layer");
        let broker = Arc::new(MemoryBroker::new());
        broker.push_message(job_body("app", Some("v1"), TARGET_BUCKET));
        let service = test_service_with_broker(&store, &broker);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::LeftOnQueue
        );
        // The message is still leased on the queue; once its visibility
        // window lapses the broker redelivers it. That lease expiry is the
        // only retry mechanism on this path.
        assert_eq!(broker.len(), 1);
        assert_eq!(broker.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_branch_to_tag_sync_when_target_index_exists() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store
            .put_object(TARGET_BUCKET, layout::image_index_key("app"), "[]")
            .unwrap();
        let broker = Arc::new(MemoryBroker::new());
        broker.push_message(job_body("app", Some("v1"), TARGET_BUCKET));
        let service = test_service_with_broker(&store, &broker);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        // Tag branch: tag metadata and ancestry only, not the whole
        // repository prefix.
        assert!(
            store
                .object(TARGET_BUCKET, &layout::tag_key("app", "v1"))
                .is_some()
        );
        assert!(store.object(TARGET_BUCKET, REPO_ONLY_KEY).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_branch_to_repository_sync_when_target_index_is_missing() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let broker = Arc::new(MemoryBroker::new());
        broker.push_message(job_body("app", Some("v1"), TARGET_BUCKET));
        let service = test_service_with_broker(&store, &broker);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        // Repository branch: the full prefix came over.
        assert!(store.object(TARGET_BUCKET, REPO_ONLY_KEY).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_sync_whole_repository_for_tagless_job() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let broker = Arc::new(MemoryBroker::new());
        broker.push_message(job_body("app", None, TARGET_BUCKET));
        let service = test_service_with_broker(&store, &broker);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        assert!(store.object(TARGET_BUCKET, REPO_ONLY_KEY).is_some());
    }
}
