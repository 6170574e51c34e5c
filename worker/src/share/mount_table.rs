use common::MountSpec;
use tokio::sync::RwLock;

/// Mounts this worker established and keeps healthy, unique by target.
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: RwLock<Vec<MountSpec>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `spec`, replacing any entry for the same target.
    pub async fn add(&self, spec: MountSpec) {
        let mut mounts = self.mounts.write().await;
        match mounts.iter_mut().find(|m| m.target == spec.target) {
            Some(existing) => *existing = spec,
            None => mounts.push(spec),
        }
    }

    pub async fn remove(&self, target: &str) -> Option<MountSpec> {
        let mut mounts = self.mounts.write().await;
        let idx = mounts.iter().position(|m| m.target == target)?;
        Some(mounts.remove(idx))
    }

    pub async fn get(&self, target: &str) -> Option<MountSpec> {
        self.mounts
            .read()
            .await
            .iter()
            .find(|m| m.target == target)
            .cloned()
    }

    pub async fn snapshot(&self) -> Vec<MountSpec> {
        self.mounts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.mounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mounts.read().await.is_empty()
    }
}
