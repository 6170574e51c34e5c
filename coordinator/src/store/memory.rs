use async_trait::async_trait;
use common::ShareDefinition;
use tokio::sync::RwLock;

use super::{ShareStore, StoreError};

/// Non-persistent store, enumerated in insertion order.
#[derive(Default)]
pub struct MemoryShareStore {
    shares: RwLock<Vec<ShareDefinition>>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shares(shares: Vec<ShareDefinition>) -> Self {
        Self {
            shares: RwLock::new(shares),
        }
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn get(&self, machine_name: &str) -> Result<Vec<ShareDefinition>, StoreError> {
        Ok(self
            .shares
            .read()
            .await
            .iter()
            .filter(|s| s.machine_name == machine_name)
            .cloned()
            .collect())
    }

    async fn machines_with_shares(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = Vec::new();
        for share in self.shares.read().await.iter() {
            if !names.contains(&share.machine_name) {
                names.push(share.machine_name.clone());
            }
        }
        Ok(names)
    }

    async fn all(&self) -> Result<Vec<ShareDefinition>, StoreError> {
        Ok(self.shares.read().await.clone())
    }

    async fn add(&self, share: &ShareDefinition) -> Result<(), StoreError> {
        let mut shares = self.shares.write().await;
        if shares.iter().any(|s| s.key() == share.key()) {
            return Err(StoreError::Duplicate {
                machine: share.machine_name.clone(),
                path: share.folder_path.clone(),
            });
        }
        shares.push(share.clone());
        Ok(())
    }

    async fn remove(&self, machine_name: &str, folder_path: &str) -> Result<bool, StoreError> {
        let mut shares = self.shares.write().await;
        let before = shares.len();
        shares.retain(|s| s.key() != (machine_name, folder_path));
        Ok(shares.len() != before)
    }

    async fn find(
        &self,
        machine_name: &str,
        folder_path: &str,
    ) -> Result<Option<ShareDefinition>, StoreError> {
        Ok(self
            .shares
            .read()
            .await
            .iter()
            .find(|s| s.key() == (machine_name, folder_path))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(machine: &str, path: &str) -> ShareDefinition {
        ShareDefinition {
            machine_name: machine.to_string(),
            folder_path: path.to_string(),
            source: format!("10.0.0.1:{path}"),
            target: format!("/mnt/fleet/shared/{machine}"),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let store = MemoryShareStore::new();
        store.add(&share("b", "/srv/one")).await.unwrap();
        store.add(&share("a", "/srv/two")).await.unwrap();
        store.add(&share("b", "/srv/three")).await.unwrap();

        assert_eq!(store.machines_with_shares().await.unwrap(), vec!["b", "a"]);
        assert_eq!(store.get("b").await.unwrap().len(), 2);
        assert!(store.exists("a", "/srv/two").await.unwrap());
        assert!(!store.exists("a", "/srv/one").await.unwrap());

        assert!(store.remove("b", "/srv/one").await.unwrap());
        assert!(!store.remove("b", "/srv/one").await.unwrap());
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_add_rejected() {
        let store = MemoryShareStore::new();
        store.add(&share("a", "/srv")).await.unwrap();
        let err = store.add(&share("a", "/srv")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }
}
