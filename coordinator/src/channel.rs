use async_trait::async_trait;
use common::quic::{request, request_with_timeout};
use common::{FleetError, FleetMessage, MountSpec};
use quinn::Connection;
use std::time::Duration;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Calls a worker can serve over its control channel.
#[async_trait]
pub trait WorkerChannel: Send + Sync {
    fn remote_address(&self) -> String;

    async fn create_export(&self, path: &str) -> Result<(), FleetError>;

    async fn remove_export(&self, path: &str) -> Result<(), FleetError>;

    async fn mount(&self, spec: &MountSpec) -> Result<(), FleetError>;

    async fn unmount(&self, spec: &MountSpec) -> Result<(), FleetError>;

    async fn notify(&self, text: &str) -> Result<(), FleetError>;
}

/// A worker reached over the QUIC connection it opened to us.
///
/// Export and mount calls carry no RPC deadline: the worker's own command
/// timeouts bound them.
#[derive(Clone)]
pub struct QuicWorkerChannel {
    conn: Connection,
}

impl QuicWorkerChannel {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn call(&self, msg: FleetMessage) -> Result<(), FleetError> {
        request(&self.conn, &msg).await?.expect_ack()
    }
}

#[async_trait]
impl WorkerChannel for QuicWorkerChannel {
    fn remote_address(&self) -> String {
        self.conn.remote_address().to_string()
    }

    async fn create_export(&self, path: &str) -> Result<(), FleetError> {
        self.call(FleetMessage::CreateExport(path.to_string()))
            .await
    }

    async fn remove_export(&self, path: &str) -> Result<(), FleetError> {
        self.call(FleetMessage::RemoveExport(path.to_string()))
            .await
    }

    async fn mount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        self.call(FleetMessage::Mount(spec.clone())).await
    }

    async fn unmount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        self.call(FleetMessage::Unmount(spec.clone())).await
    }

    async fn notify(&self, text: &str) -> Result<(), FleetError> {
        request_with_timeout(
            &self.conn,
            &FleetMessage::Notify(text.to_string()),
            NOTIFY_TIMEOUT,
        )
        .await?
        .expect_ack()
    }
}
