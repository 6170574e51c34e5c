//! Persistence of the desired share set.
//!
//! The orchestrator only needs exact-match CRUD; enumeration order is whatever
//! the backend naturally yields.

mod memory;
mod xline;

pub use memory::MemoryShareStore;
pub use xline::XlineShareStore;

use async_trait::async_trait;
use common::{FleetError, ShareDefinition};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("share {path} on {machine} already stored")]
    Duplicate { machine: String, path: String },
    #[error(transparent)]
    Xline(#[from] Box<etcd_client::Error>),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<etcd_client::Error> for StoreError {
    fn from(e: etcd_client::Error) -> Self {
        StoreError::Xline(Box::new(e))
    }
}

impl From<StoreError> for FleetError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { machine, path } => FleetError::AlreadyExists { machine, path },
            other => FleetError::Store(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Shares owned by `machine_name`.
    async fn get(&self, machine_name: &str) -> Result<Vec<ShareDefinition>, StoreError>;

    /// Distinct owners, in enumeration order.
    async fn machines_with_shares(&self) -> Result<Vec<String>, StoreError>;

    async fn all(&self) -> Result<Vec<ShareDefinition>, StoreError>;

    async fn add(&self, share: &ShareDefinition) -> Result<(), StoreError>;

    /// Returns whether anything was removed.
    async fn remove(&self, machine_name: &str, folder_path: &str) -> Result<bool, StoreError>;

    async fn find(
        &self,
        machine_name: &str,
        folder_path: &str,
    ) -> Result<Option<ShareDefinition>, StoreError>;

    async fn exists(&self, machine_name: &str, folder_path: &str) -> Result<bool, StoreError> {
        Ok(self.find(machine_name, folder_path).await?.is_some())
    }
}
