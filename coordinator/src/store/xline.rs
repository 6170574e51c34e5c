use async_trait::async_trait;
use common::ShareDefinition;
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, GetOptions, Txn, TxnOp};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ShareStore, StoreError};
use crate::config::XlineConfig;

/// like etcd, k:{prefix}/{machine}/{folder path} v:yaml of the share definition
#[derive(Clone)]
pub struct XlineShareStore {
    client: Arc<RwLock<Client>>,
    prefix: String,
}

impl XlineShareStore {
    pub async fn new(config: &XlineConfig) -> Result<Self, StoreError> {
        let opts = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some(ConnectOptions::default().with_user(user.clone(), pass.clone())),
            _ => None,
        };
        let client = Client::connect(config.endpoints.clone(), opts).await?;
        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            prefix: config.prefix.trim_end_matches('/').to_string(),
        })
    }

    fn machine_prefix(&self, machine_name: &str) -> String {
        format!("{}/{machine_name}/", self.prefix)
    }

    fn share_key(&self, machine_name: &str, folder_path: &str) -> String {
        format!("{}{folder_path}", self.machine_prefix(machine_name))
    }

    async fn list_prefix(&self, prefix: String) -> Result<Vec<ShareDefinition>, StoreError> {
        let mut client = self.client.write().await;
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;
        let mut shares = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            shares.push(serde_yaml::from_slice::<ShareDefinition>(kv.value())?);
        }
        Ok(shares)
    }
}

#[async_trait]
impl ShareStore for XlineShareStore {
    async fn get(&self, machine_name: &str) -> Result<Vec<ShareDefinition>, StoreError> {
        self.list_prefix(self.machine_prefix(machine_name)).await
    }

    async fn machines_with_shares(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = Vec::new();
        for share in self.all().await? {
            if !names.contains(&share.machine_name) {
                names.push(share.machine_name);
            }
        }
        Ok(names)
    }

    async fn all(&self) -> Result<Vec<ShareDefinition>, StoreError> {
        self.list_prefix(format!("{}/", self.prefix)).await
    }

    async fn add(&self, share: &ShareDefinition) -> Result<(), StoreError> {
        let key = self.share_key(&share.machine_name, &share.folder_path);
        let value = serde_yaml::to_string(share)?;

        // put only if the key has never been written
        let txn = Txn::new()
            .when([Compare::version(key.clone(), CompareOp::Equal, 0)])
            .and_then([TxnOp::put(key, value, None)]);
        let mut client = self.client.write().await;
        let resp = client.txn(txn).await?;
        if !resp.succeeded() {
            return Err(StoreError::Duplicate {
                machine: share.machine_name.clone(),
                path: share.folder_path.clone(),
            });
        }
        Ok(())
    }

    async fn remove(&self, machine_name: &str, folder_path: &str) -> Result<bool, StoreError> {
        let key = self.share_key(machine_name, folder_path);
        let mut client = self.client.write().await;
        let resp = client.delete(key, None).await?;
        Ok(resp.deleted() > 0)
    }

    async fn find(
        &self,
        machine_name: &str,
        folder_path: &str,
    ) -> Result<Option<ShareDefinition>, StoreError> {
        let key = self.share_key(machine_name, folder_path);
        let mut client = self.client.write().await;
        let resp = client.get(key, None).await?;
        match resp.kvs().first() {
            Some(kv) => Ok(Some(serde_yaml::from_slice(kv.value())?)),
            None => Ok(None),
        }
    }
}
