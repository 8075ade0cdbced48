//! Batch enqueue and producer-to-consumer round trips.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regsync_broker::{MemoryBroker, MessageBroker, entry_id};
    use regsync_core::{Region, SyncJob, layout};
    use regsync_engine::{EngineError, PollOutcome, SyncService};
    use regsync_store::{MemoryObjectStore, ObjectStore};

    use crate::{
        TARGET_BUCKET, seed_registry, source_location, target, test_config,
        test_service_with_broker,
    };

    #[tokio::test(start_paused = true)]
    async fn test_should_round_trip_enqueue_and_poll() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let broker = Arc::new(MemoryBroker::new());
        let service = test_service_with_broker(&store, &broker);

        service.enqueue("app", Some("v1")).await.unwrap();
        assert_eq!(broker.len(), 1);

        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        assert!(broker.is_empty());
        assert!(
            store
                .object(TARGET_BUCKET, "registry/images/img-a/layer")
                .is_some()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_enqueue_one_message_per_target() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        store.create_bucket("second-mirror", Region::new("ap-southeast-2"));
        let broker = Arc::new(MemoryBroker::new());
        let service = SyncService::new(
            test_config(vec![target(TARGET_BUCKET), target("second-mirror")]),
            Arc::clone(&store) as Arc<dyn ObjectStore>,
        )
        .with_broker(Arc::clone(&broker) as Arc<dyn MessageBroker>);

        service.enqueue("app", Some("v1")).await.unwrap();
        assert_eq!(broker.len(), 2);

        // Both jobs are routable; draining the queue populates both
        // mirrors.
        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        assert_eq!(
            service.poll_once().await.unwrap(),
            PollOutcome::Acknowledged
        );
        for bucket in [TARGET_BUCKET, "second-mirror"] {
            assert!(
                store
                    .object(bucket, &layout::image_index_key("app"))
                    .is_some(),
                "missing index in {bucket}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_surface_exhausted_batch_as_error() {
        let store = Arc::new(MemoryObjectStore::new());
        seed_registry(&store);
        let broker = Arc::new(MemoryBroker::new());

        // Reject this job's entry on every attempt.
        let body = SyncJob::new(
            "app",
            Some("v1".to_owned()),
            &source_location(),
            &target(TARGET_BUCKET),
        )
        .to_json()
        .unwrap();
        broker.fail_next_sends(&entry_id(&body), u32::MAX);

        let service = test_service_with_broker(&store, &broker);
        let err = service.enqueue("app", Some("v1")).await.unwrap_err();
        assert!(matches!(err, EngineError::Submit(_)));
        assert_eq!(broker.send_batch_calls().len(), 5);
    }
}
