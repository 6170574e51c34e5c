use common::{ConnectionInfo, FleetError};
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::channel::WorkerChannel;

/// One live worker connection.
#[derive(Clone)]
pub struct ConnectionEntry {
    /// distinguishes successive registrations of the same machine
    pub id: u64,
    pub machine_name: String,
    pub address: String,
    pub channel: Arc<dyn WorkerChannel>,
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("id", &self.id)
            .field("machine_name", &self.machine_name)
            .field("address", &self.address)
            .field("remote", &self.channel.remote_address())
            .finish()
    }
}

/// Workers that currently hold a control channel to the coordinator.
///
/// At most one entry per machine name. The registry never probes liveness;
/// entries leave when their connection closes.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<Vec<ConnectionEntry>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `machine_name` and returns its id.
    ///
    /// A repeat registration supersedes the previous channel in place.
    pub async fn register(
        &self,
        machine_name: &str,
        address: &str,
        channel: Arc<dyn WorkerChannel>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = ConnectionEntry {
            id,
            machine_name: machine_name.to_string(),
            address: address.to_string(),
            channel,
        };

        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.machine_name == machine_name) {
            Some(existing) => {
                info!(
                    "[registry] {machine_name} re-registered from {address}, superseding connection #{}",
                    existing.id
                );
                *existing = entry;
            }
            None => {
                info!("[registry] {machine_name} registered from {address}");
                entries.push(entry);
            }
        }
        id
    }

    /// Removes `machine_name` only if it is still the registration `id`.
    pub async fn deregister(&self, machine_name: &str, id: u64) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !(e.machine_name == machine_name && e.id == id));
        let removed = entries.len() != before;
        if removed {
            info!("[registry] {machine_name} deregistered (connection #{id})");
        }
        removed
    }

    pub async fn lookup(&self, machine_name: &str) -> Option<ConnectionEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.machine_name == machine_name)
            .cloned()
    }

    /// Like [`lookup`](Self::lookup), failing with `NotConnected`.
    pub async fn require(&self, machine_name: &str) -> Result<ConnectionEntry, FleetError> {
        self.lookup(machine_name)
            .await
            .ok_or_else(|| FleetError::NotConnected(machine_name.to_string()))
    }

    /// Copies every entry under the lock. Callers make remote calls on the
    /// copy, never while holding the lock.
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.read().await.clone(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// A consistent, ordered view of the registry at one instant.
#[derive(Clone, Default, Debug)]
pub struct Snapshot {
    entries: Vec<ConnectionEntry>,
}

impl Snapshot {
    pub fn get(&self, machine_name: &str) -> Option<&ConnectionEntry> {
        self.entries.iter().find(|e| e.machine_name == machine_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEntry> {
        self.entries.iter()
    }

    /// Every entry except `machine_name`'s.
    pub fn others<'a>(&'a self, machine_name: &'a str) -> impl Iterator<Item = &'a ConnectionEntry> {
        self.entries
            .iter()
            .filter(move |e| e.machine_name != machine_name)
    }

    /// Channels, index-aligned with [`machine_names`](Self::machine_names).
    pub fn channels(&self) -> Vec<Arc<dyn WorkerChannel>> {
        self.entries.iter().map(|e| e.channel.clone()).collect()
    }

    /// Machine names, index-aligned with [`channels`](Self::channels).
    pub fn machine_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.machine_name.clone()).collect()
    }

    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.entries
            .iter()
            .map(|e| ConnectionInfo {
                machine_name: e.machine_name.clone(),
                address: e.address.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
