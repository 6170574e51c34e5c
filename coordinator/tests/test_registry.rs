mod mock;

use coordinator::registry::ConnectionRegistry;
use mock::MockChannel;
use std::sync::Arc;

#[tokio::test]
async fn test_reregistration_replaces_in_place() {
    let registry = ConnectionRegistry::new();
    registry
        .register("machine-a", "10.0.0.1", MockChannel::new("a1"))
        .await;
    registry
        .register("machine-b", "10.0.0.2", MockChannel::new("b"))
        .await;
    registry
        .register("machine-a", "10.0.0.11", MockChannel::new("a2"))
        .await;

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.machine_names(), vec!["machine-a", "machine-b"]);
    let a = snapshot.get("machine-a").unwrap();
    assert_eq!(a.address, "10.0.0.11");
    assert_eq!(a.channel.remote_address(), "a2:4433");
}

#[tokio::test]
async fn test_stale_deregister_keeps_newer_connection() {
    let registry = ConnectionRegistry::new();
    let old = registry
        .register("machine-a", "10.0.0.1", MockChannel::new("a1"))
        .await;
    let new = registry
        .register("machine-a", "10.0.0.1", MockChannel::new("a2"))
        .await;

    assert!(!registry.deregister("machine-a", old).await);
    assert!(registry.lookup("machine-a").await.is_some());
    assert!(registry.deregister("machine-a", new).await);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_require_unknown_machine() {
    let registry = ConnectionRegistry::new();
    assert_eq!(
        registry.require("machine-z").await.unwrap_err(),
        common::FleetError::NotConnected("machine-z".to_string())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_keeps_snapshot_aligned() {
    let registry = Arc::new(ConnectionRegistry::new());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let name = format!("machine-{}", i % 8);
            let id = registry
                .register(&name, "10.0.0.1", MockChannel::new(&name))
                .await;
            let snapshot = registry.snapshot().await;
            let names = snapshot.machine_names();
            let channels = snapshot.channels();
            assert_eq!(names.len(), channels.len());
            for (name, channel) in names.iter().zip(channels) {
                assert_eq!(channel.remote_address(), format!("{name}:4433"));
            }
            id
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 8);
    let mut names = snapshot.machine_names();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 8);
}
