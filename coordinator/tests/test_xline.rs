use common::{ShareDefinition, SharePoint};
use coordinator::config::XlineConfig;
use coordinator::store::{ShareStore, StoreError, XlineShareStore};
use serial_test::serial;
use std::path::Path;

/// Needs a running xline; set `FLEET_TEST_XLINE_ENDPOINTS=127.0.0.1:2379`.
async fn store() -> Option<XlineShareStore> {
    let endpoints = std::env::var("FLEET_TEST_XLINE_ENDPOINTS").ok()?;
    let config = XlineConfig {
        endpoints: endpoints.split(',').map(str::to_string).collect(),
        prefix: "/test/fleet-shares".to_string(),
        username: None,
        password: None,
    };
    Some(
        XlineShareStore::new(&config)
            .await
            .expect("Failed to connect Xline"),
    )
}

fn share(machine: &str, folder: &str) -> ShareDefinition {
    let point = SharePoint {
        machine_name: machine.to_string(),
        folder_path: folder.to_string(),
    };
    ShareDefinition::derive(&point, "10.0.0.1", Path::new("/mnt/fleet"))
}

#[tokio::test]
#[serial]
async fn test_xline_share_crud() {
    let Some(store) = store().await else {
        eprintln!("FLEET_TEST_XLINE_ENDPOINTS not set, skipping");
        return;
    };
    for s in store.all().await.unwrap() {
        store.remove(&s.machine_name, &s.folder_path).await.unwrap();
    }

    let x = share("machine-a", "/srv/x");
    let y = share("machine-b", "/data");
    store.add(&x).await.expect("Insert share failed");
    store.add(&y).await.expect("Insert share failed");

    assert!(matches!(
        store.add(&x).await,
        Err(StoreError::Duplicate { .. })
    ));
    assert_eq!(store.get("machine-a").await.unwrap(), vec![x.clone()]);
    assert_eq!(store.find("machine-b", "/data").await.unwrap(), Some(y));

    let mut machines = store.machines_with_shares().await.unwrap();
    machines.sort();
    assert_eq!(machines, vec!["machine-a", "machine-b"]);

    assert!(store.remove("machine-a", "/srv/x").await.unwrap());
    assert!(!store.remove("machine-a", "/srv/x").await.unwrap());
    assert!(!store.exists("machine-a", "/srv/x").await.unwrap());
    store.remove("machine-b", "/data").await.unwrap();
}
