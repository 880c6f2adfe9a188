//! Resource lifecycle state machine: idempotent create, gated delete,
//! out-of-band polling.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use lakegate_core::{GatewayError, ProviderResourceState, ResourceSpec, ResourceState};
use lakegate_gateway::LifecycleController;
use tests::FakeResourceProvider;

fn controller(provider: &Arc<FakeResourceProvider>) -> Arc<LifecycleController> {
    Arc::new(LifecycleController::new(
        provider.clone(),
        ResourceSpec::new("test-instance"),
    ))
}

#[tokio::test]
async fn bootstrap_discovers_existing_resource() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    let lifecycle = controller(&provider);

    lifecycle.bootstrap().await;
    assert_eq!(lifecycle.current().await.state, ResourceState::Ready);
}

#[tokio::test]
async fn bootstrap_probe_failure_leaves_state_absent() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    provider
        .fail_status
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let lifecycle = controller(&provider);

    lifecycle.bootstrap().await;
    assert_eq!(lifecycle.current().await.state, ResourceState::Absent);
}

#[tokio::test]
async fn create_is_idempotent_while_in_flight() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);

    let first = lifecycle.request_create(None).await.unwrap();
    assert_eq!(first, ResourceState::Creating);

    // Impatient retries collapse into the in-flight creation.
    let second = lifecycle.request_create(None).await.unwrap();
    let third = lifecycle.request_create(None).await.unwrap();
    assert_eq!(second, ResourceState::Creating);
    assert_eq!(third, ResourceState::Creating);
    assert_eq!(provider.create_count(), 1);
}

#[tokio::test]
async fn create_while_ready_is_a_no_op() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    let lifecycle = controller(&provider);
    lifecycle.bootstrap().await;

    let state = lifecycle.request_create(None).await.unwrap();
    assert_eq!(state, ResourceState::Ready);
    assert_eq!(provider.create_count(), 0);
}

#[tokio::test]
async fn create_overrides_replace_the_default_spec() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);

    let mut spec = ResourceSpec::new("test-instance");
    spec.capacity = "CU_2".to_string();
    spec.node_count = 3;
    lifecycle.request_create(Some(spec)).await.unwrap();

    let sent = provider.last_spec().unwrap();
    assert_eq!(sent.capacity, "CU_2");
    assert_eq!(sent.node_count, 3);
}

#[tokio::test]
async fn concurrent_create_requests_issue_one_provider_call() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let lc = lifecycle.clone();
        tasks.push(tokio::spawn(async move { lc.request_create(None).await }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap().unwrap(), ResourceState::Creating);
    }
    assert_eq!(provider.create_count(), 1);
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    let lifecycle = controller(&provider);
    lifecycle.bootstrap().await;

    let err = lifecycle.request_delete(false).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::ResourceTransitionConflict { .. }
    ));

    // The unconfirmed request touched nothing.
    assert_eq!(lifecycle.current().await.state, ResourceState::Ready);
    assert_eq!(provider.delete_count(), 0);

    let state = lifecycle.request_delete(true).await.unwrap();
    assert_eq!(state, ResourceState::Deleting);
    assert_eq!(provider.delete_count(), 1);
}

#[tokio::test]
async fn delete_from_absent_is_a_conflict() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);

    let err = lifecycle.request_delete(true).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::ResourceTransitionConflict { .. }
    ));
}

#[tokio::test]
async fn repeated_delete_while_deleting_is_a_no_op() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    let lifecycle = controller(&provider);
    lifecycle.bootstrap().await;

    lifecycle.request_delete(true).await.unwrap();
    let state = lifecycle.request_delete(true).await.unwrap();
    assert_eq!(state, ResourceState::Deleting);
    assert_eq!(provider.delete_count(), 1);
}

#[tokio::test]
async fn poll_advances_creating_to_ready() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);
    lifecycle.request_create(None).await.unwrap();

    // Still provisioning: no transition.
    assert_eq!(lifecycle.poll().await.unwrap(), ResourceState::Creating);

    provider.set_status(ProviderResourceState::Available);
    assert_eq!(lifecycle.poll().await.unwrap(), ResourceState::Ready);
}

#[tokio::test]
async fn poll_advances_deleting_to_absent() {
    let provider = FakeResourceProvider::new(ProviderResourceState::Available);
    let lifecycle = controller(&provider);
    lifecycle.bootstrap().await;
    lifecycle.request_delete(true).await.unwrap();

    provider.set_status(ProviderResourceState::NotFound);
    assert_eq!(lifecycle.poll().await.unwrap(), ResourceState::Absent);
    assert!(lifecycle.current().await.handle.is_none());
}

#[tokio::test]
async fn poll_records_provisioning_failure() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);
    lifecycle.request_create(None).await.unwrap();

    provider.set_status(ProviderResourceState::Failed);
    assert_eq!(lifecycle.poll().await.unwrap(), ResourceState::Failed);
}

#[tokio::test]
async fn failed_resource_can_be_recreated() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);
    lifecycle.request_create(None).await.unwrap();
    provider.set_status(ProviderResourceState::Failed);
    lifecycle.poll().await.unwrap();

    let state = lifecycle.request_create(None).await.unwrap();
    assert_eq!(state, ResourceState::Creating);
    assert_eq!(provider.create_count(), 2);
}

#[tokio::test]
async fn create_failure_surfaces_and_leaves_state_absent() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    provider
        .fail_create
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let lifecycle = controller(&provider);

    let err = lifecycle.request_create(None).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::ResourceProvisioningFailed(_)
    ));
    assert_eq!(lifecycle.current().await.state, ResourceState::Absent);
}

#[tokio::test(start_paused = true)]
async fn background_poller_completes_a_creation() {
    let provider = FakeResourceProvider::new(ProviderResourceState::NotFound);
    let lifecycle = controller(&provider);
    lifecycle.request_create(None).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = lifecycle.spawn_poll_task(Duration::from_secs(15), cancel.clone());
    // The poller registers its timer on first poll; let it run before
    // the clock moves.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    provider.set_status(ProviderResourceState::Available);
    tokio::time::advance(Duration::from_secs(16)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert_eq!(lifecycle.current().await.state, ResourceState::Ready);

    cancel.cancel();
    handle.await.unwrap();
}
