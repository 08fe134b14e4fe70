use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use worker_framework::{FrameworkError, WorkerRegistry};

#[tokio::test]
async fn test_second_acquire_is_rejected_until_task_completes() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let gate = Arc::new(Notify::new());
    let worker = client.acquire("worker-m1").await.unwrap();
    let task_gate = gate.clone();
    let handle = worker.run(async move {
        task_gate.notified().await;
        Ok::<(), String>(())
    });

    // While the task is blocked the name stays busy.
    let second = client.acquire("worker-m1").await;
    assert_eq!(
        second.unwrap_err(),
        FrameworkError::WorkerBusy("worker-m1".to_string())
    );

    let busy = client.busy().await.unwrap();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].name, "worker-m1");

    gate.notify_one();
    handle.await.unwrap();

    // After completion the same name is accepted again.
    let third = client.acquire("worker-m1").await;
    assert!(third.is_ok());
}

#[tokio::test]
async fn test_different_names_run_concurrently() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let (release_a, wait_a) = oneshot::channel::<()>();
    let (release_b, wait_b) = oneshot::channel::<()>();
    let first = client.acquire("worker-a").await.unwrap();
    let second = client.acquire("worker-b").await.unwrap();

    let h1 = first.run(async move { wait_a.await.map_err(|e| e.to_string()) });
    let h2 = second.run(async move { wait_b.await.map_err(|e| e.to_string()) });

    let names: Vec<String> = client
        .busy()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["worker-a", "worker-b"]);

    release_b.send(()).unwrap();
    h2.await.unwrap();
    let names: Vec<String> = client
        .busy()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["worker-a"]);

    release_a.send(()).unwrap();
    h1.await.unwrap();
    assert!(client.busy().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_task_releases_slot() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let worker = client.acquire("worker-m1").await.unwrap();
    worker
        .run(async { Err::<(), _>("deployment service returned 500".to_string()) })
        .await
        .unwrap();

    assert!(client.acquire("worker-m1").await.is_ok());
}

#[tokio::test]
async fn test_panicking_task_releases_slot() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let worker = client.acquire("worker-m1").await.unwrap();
    let handle = worker.run(async {
        if true {
            panic!("workflow blew up");
        }
        Ok::<(), String>(())
    });

    // The panic is contained inside the worker; the outer handle completes normally.
    handle.await.unwrap();

    assert!(client.acquire("worker-m1").await.is_ok());
}

#[tokio::test]
async fn test_unused_worker_is_released_on_drop() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let worker = client.acquire("worker-m1").await.unwrap();
    assert_eq!(worker.name(), "worker-m1");
    drop(worker);

    assert!(client.acquire("worker-m1").await.is_ok());
}

#[tokio::test]
async fn test_back_to_back_acquires_yield_exactly_one_grant() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.acquire("worker-m1").await }));
    }

    let mut granted = Vec::new();
    let mut busy = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(worker) => granted.push(worker),
            Err(FrameworkError::WorkerBusy(_)) => busy += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(granted.len(), 1, "Exactly one acquire should win");
    assert_eq!(busy, 9);
}

#[tokio::test]
async fn test_registry_stops_after_clients_and_workers_are_gone() {
    let (registry, client) = WorkerRegistry::new();
    let registry_handle = tokio::spawn(registry.run());

    let worker = client.acquire("worker-m1").await.unwrap();
    drop(client);

    // The outstanding worker keeps the registry alive until it is released.
    assert!(!registry_handle.is_finished());
    worker.run(async { Ok::<(), String>(()) }).await.unwrap();

    registry_handle.await.unwrap();
}

#[tokio::test]
async fn test_aborted_handle_keeps_slot_until_task_ends() {
    let (registry, client) = WorkerRegistry::new();
    tokio::spawn(registry.run());

    let (release, wait) = oneshot::channel::<()>();
    let worker = client.acquire("worker-m1").await.unwrap();
    let handle = worker.run(async move { wait.await.map_err(|e| e.to_string()) });

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    // The task itself is still running, so the name stays taken.
    assert_eq!(
        client.acquire("worker-m1").await.unwrap_err(),
        FrameworkError::WorkerBusy("worker-m1".to_string())
    );

    release.send(()).unwrap();
    for _ in 0..100 {
        if client.busy().await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(client.acquire("worker-m1").await.is_ok());
}
