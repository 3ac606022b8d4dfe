//! End-to-end observer scenarios against the scriptable facade.

use std::sync::Arc;
use std::time::Duration;

use larimar_client::{
    BestEffortRetry, DurabilityObserver, FailFastRetry, FixedDelay, ObserveError,
};
use larimar_protocol::mock::MockFacade;
use larimar_protocol::{FacadeError, ObserveStatus};
use larimar_types::{BucketConfig, ClusterConfig, KV_SERVICE, NodeInfo, PersistTo, ReplicateTo};

const CAS: u64 = 0x1234;

fn cluster_with(bucket: &str, num_replicas: u32) -> ClusterConfig {
    let node = NodeInfo::new("localhost").with_service(KV_SERVICE, 11210);
    let mut cluster = ClusterConfig::new();
    cluster.insert(BucketConfig::new(bucket, vec![node], num_replicas));
    cluster
}

fn delay() -> FixedDelay {
    FixedDelay::new(Duration::from_millis(10))
}

#[tokio::test]
async fn persist_to_one_resolves_on_master_persist() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 0));
    facade.script_observe(true, 0, ObserveStatus::FoundPersisted, CAS);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::One,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert_eq!(facade.observe_requests().len(), 1);
    assert_eq!(facade.max_live_references(), 0);
}

#[tokio::test]
async fn master_cas_divergence_fails_the_operation() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 0));
    facade.script_observe(true, 0, ObserveStatus::FoundPersisted, CAS + 1);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let result = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::One,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await;

    assert_eq!(result, Err(ObserveError::DocumentConcurrentlyModified));
    assert_eq!(facade.max_live_references(), 0);
}

#[tokio::test]
async fn persisted_deletion_accepts_cas_zero_from_the_master() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 0));
    facade.script_observe(true, 0, ObserveStatus::NotFoundPersisted, 0);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            true,
            PersistTo::Master,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert_eq!(facade.max_live_references(), 0);
}

#[tokio::test]
async fn empty_criterion_resolves_without_polling() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 0));

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::None,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert!(facade.observe_requests().is_empty());
}

#[tokio::test]
async fn replicate_criterion_beyond_the_bucket_fails_fast() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 1));

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let result = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::None,
            ReplicateTo::Three,
            &delay(),
            &BestEffortRetry,
        )
        .await;

    assert_eq!(
        result,
        Err(ObserveError::ReplicaNotConfigured {
            requested: 3,
            configured: 1,
        })
    );
    assert!(facade.observe_requests().is_empty());
}

#[tokio::test]
async fn persist_criterion_beyond_the_bucket_fails_fast() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 1));

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let result = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::Four,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await;

    assert_eq!(
        result,
        Err(ObserveError::ReplicaNotConfigured {
            requested: 3,
            configured: 1,
        })
    );
}

#[tokio::test]
async fn unknown_bucket_fails_fast() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 0));

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let result = observer
        .observe(
            "missing",
            "doc",
            CAS,
            false,
            PersistTo::One,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await;

    assert_eq!(result, Err(ObserveError::BucketNotFound("missing".into())));
}

#[tokio::test]
async fn master_only_criterion_does_not_touch_replicas() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 2));
    facade.script_observe(true, 0, ObserveStatus::FoundPersisted, CAS);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::One,
            ReplicateTo::None,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    // Replicas exist but the criterion never addressed them
    let requests = facade.observe_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].master);
}

#[tokio::test(start_paused = true)]
async fn best_effort_retry_swallows_a_replica_failure() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 1));

    // Round 1: master answers, the replica errors. Round 2: both answer and
    // the replica confirms the replicate.
    facade.script_observe(true, 0, ObserveStatus::FoundNotPersisted, CAS);
    facade.script_observe(true, 0, ObserveStatus::FoundNotPersisted, CAS);
    facade.script_observe_error(false, 1, FacadeError::Transport("connection reset".into()));
    facade.script_observe(false, 1, ObserveStatus::FoundNotPersisted, CAS);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::None,
            ReplicateTo::One,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    // Two rounds of master + replica fan-out
    assert_eq!(facade.observe_requests().len(), 4);
    assert_eq!(facade.max_live_references(), 0);
}

#[tokio::test]
async fn fail_fast_retry_surfaces_a_replica_failure() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 1));
    facade.script_observe(true, 0, ObserveStatus::FoundNotPersisted, CAS);
    facade.script_observe_error(false, 1, FacadeError::Transport("connection reset".into()));

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let result = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::None,
            ReplicateTo::One,
            &delay(),
            &FailFastRetry,
        )
        .await;

    assert_eq!(
        result,
        Err(ObserveError::Facade(FacadeError::Transport(
            "connection reset".into()
        )))
    );
    assert_eq!(facade.max_live_references(), 0);
}

#[tokio::test(start_paused = true)]
async fn replica_persist_counts_toward_both_criteria() {
    let facade = Arc::new(MockFacade::new());
    facade.set_cluster_config(cluster_with("bucket", 1));
    facade.script_observe(true, 0, ObserveStatus::FoundPersisted, CAS);
    facade.script_observe(false, 1, ObserveStatus::FoundPersisted, CAS);

    let observer = DurabilityObserver::new(Arc::clone(&facade));
    let confirmed = observer
        .observe(
            "bucket",
            "doc",
            CAS,
            false,
            PersistTo::Two,
            ReplicateTo::One,
            &delay(),
            &BestEffortRetry,
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert_eq!(facade.max_live_references(), 0);
}
