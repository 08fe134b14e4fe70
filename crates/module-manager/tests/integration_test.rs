use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Semaphore;
use worker_framework::mock::MockRegistry;
use worker_framework::{WorkerClient, WorkerRegistry};

use module_manager::clients::fake::{
    ConfigCall, DeploymentCall, FakeConfigService, FakeDeploymentService,
};
use module_manager::clients::ServiceState;
use module_manager::model::{Module, ResourceState};
use module_manager::service::{worker_name, KindSettings};
use module_manager::store::{MemoryStore, ResourceStore};
use module_manager::{KindBackends, ManagerError, ResourceService, Transition};

struct Harness {
    service: ResourceService<Module>,
    config: Arc<FakeConfigService>,
    deployment: Arc<FakeDeploymentService>,
    store: Arc<MemoryStore>,
    workers: WorkerClient,
}

fn harness(deployment: FakeDeploymentService, settings: KindSettings) -> Harness {
    let (registry, workers) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let config = Arc::new(FakeConfigService::new());
    let deployment = Arc::new(deployment);
    let store = Arc::new(MemoryStore::new());
    let backends = KindBackends {
        config: config.clone(),
        deployment: deployment.clone(),
        store: store.clone(),
    };

    Harness {
        service: ResourceService::new(backends, workers.clone(), settings),
        config,
        deployment,
        store,
        workers,
    }
}

fn definition() -> Value {
    json!({
        "id": "m1",
        "name": "X",
        "description": "d",
        "hash": "abc",
        "services": {"svcA": {"hash": "h1", "image": "x"}}
    })
}

async fn finish(transition: Transition) {
    match transition {
        Transition::Started(handle) => handle.await.unwrap(),
        Transition::Unchanged => panic!("expected a workflow to start"),
    }
}

#[tokio::test]
async fn test_submit_activate_then_delete_while_active() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());

    // Submit: configs go to config storage without hashes, the slim document is stored.
    h.service.submit(definition()).await.unwrap();
    assert_eq!(
        serde_json::to_value(h.store.get("m1").await.unwrap()).unwrap(),
        json!({
            "name": "X",
            "description": "d",
            "hash": "abc",
            "services": {"svcA": {"hash": "h1"}},
            "state": "inactive"
        })
    );
    assert_eq!(
        Value::Object(h.config.stored("m1").unwrap()),
        json!({"svcA": {"image": "x"}})
    );

    // Activate.
    let transition = h
        .service
        .set_state("m1", &json!({"state": "active"}))
        .await
        .unwrap();
    finish(transition).await;
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Active);
    assert_eq!(
        h.deployment.calls(),
        vec![
            DeploymentCall::Create("svcA".into()),
            DeploymentCall::SetState("svcA".into(), ServiceState::Running),
        ]
    );

    // Deleting an active module is refused without touching the deployment service.
    let err = h.service.remove("m1").await.unwrap_err();
    assert!(matches!(err, ManagerError::Conflict(_)));
    assert_eq!(h.deployment.calls().len(), 2);
    assert!(!h.config.calls().contains(&ConfigCall::Delete("m1".into())));
}

#[tokio::test]
async fn test_second_operation_is_busy_until_first_completes() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeDeploymentService::new().with_gate(gate.clone()),
        KindSettings::default(),
    );
    h.service.submit(definition()).await.unwrap();

    let first = h
        .service
        .set_state("m1", &json!({"state": "active"}))
        .await
        .unwrap();

    let busy = h.workers.busy().await.unwrap();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].name, worker_name::<Module>("m1"));

    let second = h.service.set_state("m1", &json!({"state": "inactive"})).await;
    assert!(matches!(second, Err(ManagerError::Busy(_))));
    assert!(matches!(h.service.remove("m1").await, Err(ManagerError::Busy(_))));
    assert!(matches!(
        h.service.submit(definition()).await,
        Err(ManagerError::Busy(_))
    ));

    gate.add_permits(16);
    finish(first).await;
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Active);

    // Once the first workflow is done the id accepts a new operation.
    let third = h
        .service
        .set_state("m1", &json!({"state": "inactive"}))
        .await
        .unwrap();
    finish(third).await;
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Inactive);
}

#[tokio::test]
async fn test_other_ids_are_not_blocked() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeDeploymentService::new().with_gate(gate.clone()),
        KindSettings::default(),
    );
    h.service.submit(definition()).await.unwrap();
    let mut other = definition();
    other["id"] = json!("m2");
    h.service.submit(other).await.unwrap();

    let first = h
        .service
        .set_state("m1", &json!({"state": "active"}))
        .await
        .unwrap();
    let second = h
        .service
        .set_state("m2", &json!({"state": "active"}))
        .await
        .unwrap();
    assert_eq!(h.workers.busy().await.unwrap().len(), 2);

    gate.add_permits(16);
    finish(first).await;
    finish(second).await;
    assert!(h.workers.busy().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_workflows_leave_state_unchanged() {
    let deployment = FakeDeploymentService::new();
    deployment.fail_on(DeploymentCall::SetState("svcA".into(), ServiceState::Running));
    let h = harness(deployment, KindSettings::default());
    h.service.submit(definition()).await.unwrap();

    // Activation fails in the start pass.
    let transition = h
        .service
        .set_state("m1", &json!({"state": "active"}))
        .await
        .unwrap();
    finish(transition).await;
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Inactive);

    // Removal fails on the first delete; the slot was released after the failed activation.
    h.deployment.fail_on(DeploymentCall::Delete {
        service: "svcA".into(),
        purge: false,
    });
    h.service.remove("m1").await.unwrap().await.unwrap();
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Inactive);
}

#[tokio::test]
async fn test_failed_deactivation_keeps_module_active() {
    let deployment = FakeDeploymentService::new();
    deployment.fail_on(DeploymentCall::SetState("svcA".into(), ServiceState::Stopped));
    let h = harness(deployment, KindSettings::default());
    h.service.submit(definition()).await.unwrap();
    finish(
        h.service
            .set_state("m1", &json!({"state": "active"}))
            .await
            .unwrap(),
    )
    .await;

    finish(
        h.service
            .set_state("m1", &json!({"state": "inactive"}))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(h.store.get("m1").await.unwrap().state, ResourceState::Active);
}

#[tokio::test]
async fn test_reserved_id_is_always_a_conflict() {
    let settings = KindSettings {
        reserved_id: Some("manager".into()),
        ..KindSettings::default()
    };
    let h = harness(FakeDeploymentService::new(), settings);

    let bare = h.service.submit(json!({"id": "manager"})).await;
    assert!(matches!(bare, Err(ManagerError::Conflict(_))));

    let mut full = definition();
    full["id"] = json!("manager");
    let full = h.service.submit(full).await;
    assert!(matches!(full, Err(ManagerError::Conflict(_))));

    assert!(h.config.calls().is_empty());
    assert!(h.store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_active_module_cannot_be_resubmitted() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();
    finish(
        h.service
            .set_state("m1", &json!({"state": "active"}))
            .await
            .unwrap(),
    )
    .await;
    let config_calls = h.config.calls().len();
    let deployment_calls = h.deployment.calls().len();

    let mut changed = definition();
    changed["hash"] = json!("def");
    let err = h.service.submit(changed).await.unwrap_err();

    assert!(matches!(err, ManagerError::Conflict(_)));
    assert_eq!(h.config.calls().len(), config_calls);
    assert_eq!(h.deployment.calls().len(), deployment_calls);
    assert_eq!(h.store.get("m1").await.unwrap().hash, "abc");
}

#[tokio::test]
async fn test_inactive_module_can_be_resubmitted() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();

    let mut changed = definition();
    changed["hash"] = json!("def");
    h.service.submit(changed).await.unwrap();

    assert_eq!(h.store.get("m1").await.unwrap().hash, "def");
    assert_eq!(
        h.config.calls(),
        vec![ConfigCall::Put("m1".into()), ConfigCall::Put("m1".into())]
    );
}

#[tokio::test]
async fn test_requesting_current_state_launches_nothing() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();

    let transition = h
        .service
        .set_state("m1", &json!({"state": "inactive"}))
        .await
        .unwrap();

    assert!(matches!(transition, Transition::Unchanged));
    assert!(h.deployment.calls().is_empty());
    assert!(h.workers.busy().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_change_rejections() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();

    let unknown = h.service.set_state("m1", &json!({"state": "paused"})).await;
    assert!(matches!(unknown, Err(ManagerError::Validation(_))));

    let missing = h.service.set_state("m1", &json!({})).await;
    assert!(matches!(missing, Err(ManagerError::Validation(_))));

    let absent = h.service.set_state("m9", &json!({"state": "active"})).await;
    assert!(matches!(absent, Err(ManagerError::NotFound(_))));

    // The slot of an absent id is not left behind.
    assert!(h.workers.busy().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_config_retrieval_failure_launches_nothing() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();
    h.config.fail_on(ConfigCall::Get("m1".into()));

    let err = h
        .service
        .set_state("m1", &json!({"state": "active"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Downstream { .. }));
    assert!(h.deployment.calls().is_empty());
    assert!(h.workers.busy().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_deletes_configs_services_and_document() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();

    h.service.remove("m1").await.unwrap().await.unwrap();

    assert!(h.config.stored("m1").is_none());
    assert_eq!(
        h.deployment.calls(),
        vec![DeploymentCall::Delete {
            service: "svcA".into(),
            purge: false,
        }]
    );
    assert!(matches!(h.service.get("m1").await, Err(ManagerError::NotFound(_))));
    assert!(matches!(h.service.remove("m1").await, Err(ManagerError::NotFound(_))));
}

#[tokio::test]
async fn test_config_delete_failure_keeps_module() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();
    h.config.fail_on(ConfigCall::Delete("m1".into()));

    let err = h.service.remove("m1").await.unwrap_err();

    assert!(matches!(err, ManagerError::Downstream { .. }));
    assert!(h.deployment.calls().is_empty());
    assert!(h.store.get("m1").await.is_ok());
}

#[tokio::test]
async fn test_list_returns_documents_by_id() {
    let h = harness(FakeDeploymentService::new(), KindSettings::default());
    h.service.submit(definition()).await.unwrap();
    let mut other = definition();
    other["id"] = json!("m0");
    h.service.submit(other).await.unwrap();

    let documents = h.service.list().await.unwrap();
    let ids: Vec<&str> = documents.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["m0", "m1"]);
}

#[tokio::test]
async fn test_rejected_slot_stops_submission_before_any_call() {
    let mock = MockRegistry::new();
    mock.expect_acquire("worker-module-m1").reject();
    mock.expect_acquire("worker-module-m1").grant();

    let config = Arc::new(FakeConfigService::new());
    let store = Arc::new(MemoryStore::new());
    let service = ResourceService::<Module>::new(
        KindBackends {
            config: config.clone(),
            deployment: Arc::new(FakeDeploymentService::new()),
            store: store.clone(),
        },
        mock.client(),
        KindSettings::default(),
    );

    let busy = service.submit(definition()).await;
    assert!(matches!(busy, Err(ManagerError::Busy(_))));
    assert!(config.calls().is_empty());
    assert!(store.keys().await.unwrap().is_empty());

    service.submit(definition()).await.unwrap();
    assert_eq!(config.calls(), vec![ConfigCall::Put("m1".into())]);
    mock.verify();
}
