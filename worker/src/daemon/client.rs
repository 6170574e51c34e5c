use anyhow::{Result, anyhow};
use common::FleetMessage;
use common::quic::{SERVER_NAME, make_client_endpoint, request_with_timeout};
use quinn::{Connection, Endpoint};
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

use crate::config::WorkerConfig;

const DIAL_TIMEOUT: Duration = Duration::from_secs(60);
const REGISTER_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Dials the coordinator and registers, retrying until both succeed.
pub async fn connect_and_register(cfg: &WorkerConfig) -> Result<(Endpoint, Connection)> {
    let endpoint = make_client_endpoint()?;
    loop {
        match connect_once(&endpoint, cfg).await {
            Ok(conn) => {
                info!(
                    "registered as {} with coordinator {}",
                    cfg.machine_name, cfg.coordinator_addr
                );
                return Ok((endpoint, conn));
            }
            Err(e) => {
                warn!("connect to {} failed: {e}, retrying in 3s", cfg.coordinator_addr);
                time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

async fn connect_once(endpoint: &Endpoint, cfg: &WorkerConfig) -> Result<Connection> {
    let connecting = endpoint.connect(cfg.coordinator_addr, SERVER_NAME)?;
    let conn = time::timeout(DIAL_TIMEOUT, connecting)
        .await
        .map_err(|_| anyhow!("dial timed out"))??;

    let register = FleetMessage::SetConnection {
        addr: cfg.advertise_addr.clone(),
        machine_name: cfg.machine_name.clone(),
    };
    if let Err(e) = request_with_timeout(&conn, &register, REGISTER_TIMEOUT)
        .await
        .and_then(FleetMessage::expect_ack)
    {
        conn.close(0u32.into(), b"registration failed");
        return Err(e.into());
    }
    Ok(conn)
}
