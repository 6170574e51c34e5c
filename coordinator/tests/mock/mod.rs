#![allow(dead_code)]

use async_trait::async_trait;
use common::{FleetError, MountSpec, ShareDefinition, SharePoint};
use coordinator::channel::WorkerChannel;
use coordinator::store::{MemoryShareStore, ShareStore, StoreError};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const MOUNT_ROOT: &str = "/mnt/fleet";

/// Records every call it receives; optionally fails export calls.
#[derive(Default)]
pub struct MockChannel {
    name: String,
    calls: Mutex<Vec<String>>,
    fail_exports: bool,
}

impl MockChannel {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn failing_exports(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_exports: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl WorkerChannel for MockChannel {
    fn remote_address(&self) -> String {
        format!("{}:4433", self.name)
    }

    async fn create_export(&self, path: &str) -> Result<(), FleetError> {
        self.record(format!("export {path}"));
        if self.fail_exports {
            return Err(FleetError::command_failed("exportfs -ra", "exportfs: bad line"));
        }
        Ok(())
    }

    async fn remove_export(&self, path: &str) -> Result<(), FleetError> {
        self.record(format!("unexport {path}"));
        Ok(())
    }

    async fn mount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        self.record(format!("mount {spec}"));
        Ok(())
    }

    async fn unmount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        self.record(format!("unmount {spec}"));
        Ok(())
    }

    async fn notify(&self, text: &str) -> Result<(), FleetError> {
        self.record(format!("notify {text}"));
        Ok(())
    }
}

pub fn point(machine: &str, folder: &str) -> SharePoint {
    SharePoint {
        machine_name: machine.to_string(),
        folder_path: folder.to_string(),
    }
}

pub fn share(machine: &str, addr: &str, folder: &str) -> ShareDefinition {
    ShareDefinition::derive(&point(machine, folder), addr, Path::new(MOUNT_ROOT))
}

/// In-memory store whose `get` fails for one owner.
pub struct UnreadableOwnerStore {
    inner: MemoryShareStore,
    unreadable: String,
}

impl UnreadableOwnerStore {
    pub fn new(shares: Vec<ShareDefinition>, unreadable: &str) -> Self {
        Self {
            inner: MemoryShareStore::with_shares(shares),
            unreadable: unreadable.to_string(),
        }
    }
}

#[async_trait]
impl ShareStore for UnreadableOwnerStore {
    async fn get(&self, machine_name: &str) -> Result<Vec<ShareDefinition>, StoreError> {
        if machine_name == self.unreadable {
            let corrupt = serde_yaml::from_str::<ShareDefinition>("not a share").unwrap_err();
            return Err(StoreError::Yaml(corrupt));
        }
        self.inner.get(machine_name).await
    }

    async fn machines_with_shares(&self) -> Result<Vec<String>, StoreError> {
        self.inner.machines_with_shares().await
    }

    async fn all(&self) -> Result<Vec<ShareDefinition>, StoreError> {
        self.inner.all().await
    }

    async fn add(&self, share: &ShareDefinition) -> Result<(), StoreError> {
        self.inner.add(share).await
    }

    async fn remove(&self, machine_name: &str, folder_path: &str) -> Result<bool, StoreError> {
        self.inner.remove(machine_name, folder_path).await
    }

    async fn find(
        &self,
        machine_name: &str,
        folder_path: &str,
    ) -> Result<Option<ShareDefinition>, StoreError> {
        self.inner.find(machine_name, folder_path).await
    }
}
