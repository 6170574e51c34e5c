use anyhow::{Result, anyhow};
use common::quic::{SERVER_NAME, make_client_endpoint, request};
use common::{ConnectionInfo, FleetMessage, ShareDefinition, SharePoint, SyncReport};
use log::warn;
use quinn::{Connection, Endpoint};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time;

const CONNECT_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Operator-side connection to a running coordinator.
pub struct AdminClient {
    // keeps the client socket alive for the connection's lifetime
    _endpoint: Endpoint,
    conn: Connection,
}

impl AdminClient {
    pub async fn connect(server_addr: SocketAddr) -> Result<Self> {
        let endpoint = make_client_endpoint()?;

        let mut attempt = 0;
        let conn = loop {
            attempt += 1;
            match endpoint.connect(server_addr, SERVER_NAME)?.await {
                Ok(conn) => break conn,
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!("[admin] connect to {server_addr} failed: {e}, retrying in 2s");
                    time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(anyhow!("cannot reach coordinator at {server_addr}: {e}")),
            }
        };
        Ok(Self {
            _endpoint: endpoint,
            conn,
        })
    }

    pub async fn create_share(&self, machine_name: &str, folder_path: &str) -> Result<()> {
        let msg = FleetMessage::CreateShare(SharePoint {
            machine_name: machine_name.to_string(),
            folder_path: folder_path.to_string(),
        });
        request(&self.conn, &msg).await?.expect_ack()?;
        Ok(())
    }

    pub async fn remove_share(&self, machine_name: &str, folder_path: &str) -> Result<()> {
        let msg = FleetMessage::RemoveShare(SharePoint {
            machine_name: machine_name.to_string(),
            folder_path: folder_path.to_string(),
        });
        request(&self.conn, &msg).await?.expect_ack()?;
        Ok(())
    }

    pub async fn list_shares(&self) -> Result<Vec<ShareDefinition>> {
        match request(&self.conn, &FleetMessage::ListShares).await? {
            FleetMessage::Shares(shares) => Ok(shares),
            other => Err(anyhow!("unexpected response {}", other.kind())),
        }
    }

    pub async fn list_connections(&self) -> Result<Vec<ConnectionInfo>> {
        match request(&self.conn, &FleetMessage::ListConnections).await? {
            FleetMessage::Connections(conns) => Ok(conns),
            other => Err(anyhow!("unexpected response {}", other.kind())),
        }
    }

    pub async fn sync(&self) -> Result<SyncReport> {
        match request(&self.conn, &FleetMessage::SyncShares).await? {
            FleetMessage::Synced(report) => Ok(report),
            other => Err(anyhow!("unexpected response {}", other.kind())),
        }
    }

    pub fn close(&self) {
        self.conn.close(0u32.into(), b"done");
    }
}
