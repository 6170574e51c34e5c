use common::quic::{make_server_endpoint, recv_message, send_message};
use common::{FleetError, FleetMessage};
use log::{debug, error, info, warn};
use quinn::Connection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::channel::QuicWorkerChannel;
use crate::sync::ShareService;

/// launch the server to listen for incoming QUIC connections.
/// spawn a new task for each accepted connection (either worker or admin).
pub async fn serve(
    addr: SocketAddr,
    service: Arc<ShareService>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let endpoint = make_server_endpoint(addr)?;
    info!("[server] listening on {addr}");

    loop {
        let incoming = tokio::select! {
            incoming = endpoint.accept() => incoming,
            _ = shutdown.cancelled() => break,
        };
        let Some(incoming) = incoming else { break };

        let service = service.clone();
        tokio::spawn(async move {
            match incoming.await {
                Ok(conn) => {
                    info!("[server] connection accepted: addr={}", conn.remote_address());
                    handle_connection(conn, service).await;
                }
                Err(e) => warn!("[server] failed to establish connection: {e}"),
            }
        });
    }

    endpoint.close(0u32.into(), b"coordinator shutting down");
    Ok(())
}

/// Serve one connection until it closes.
///
/// Every stream carries one request. A `SetConnection` request marks the
/// connection as a worker; its registry entry is dropped when the connection
/// goes away.
async fn handle_connection(conn: Connection, service: Arc<ShareService>) {
    let mut registered: Option<(String, u64)> = None;

    loop {
        let (mut send, mut recv) = match conn.accept_bi().await {
            Ok(streams) => streams,
            Err(e) => {
                info!("[server] connection {} closed: {e}", conn.remote_address());
                break;
            }
        };

        let msg = match recv_message(&mut recv).await {
            Ok(msg) => msg,
            Err(e) => {
                warn!("[server] bad request from {}: {e}", conn.remote_address());
                let _ = send_message(&mut send, &FleetMessage::Error(e)).await;
                continue;
            }
        };
        debug!("[server] {} from {}", msg.kind(), conn.remote_address());

        let response = match msg {
            FleetMessage::SetConnection { machine_name, .. }
                if registered
                    .as_ref()
                    .is_some_and(|(name, _)| *name != machine_name) =>
            {
                FleetMessage::Error(FleetError::InvalidArgument(format!(
                    "connection already registered as another machine, not {machine_name}"
                )))
            }
            FleetMessage::SetConnection { addr, machine_name } => {
                match register_worker(&conn, &service, &addr, &machine_name).await {
                    Ok(id) => {
                        registered = Some((machine_name, id));
                        FleetMessage::Ack
                    }
                    Err(e) => FleetMessage::Error(e),
                }
            }
            other => dispatch(other, &service).await,
        };

        if let Err(e) = send_message(&mut send, &response).await {
            warn!("[server] failed to respond to {}: {e}", conn.remote_address());
        }
    }

    if let Some((machine_name, id)) = registered {
        service.registry().deregister(&machine_name, id).await;
    }
}

async fn register_worker(
    conn: &Connection,
    service: &Arc<ShareService>,
    addr: &str,
    machine_name: &str,
) -> Result<u64, FleetError> {
    if machine_name.trim().is_empty() {
        return Err(FleetError::InvalidArgument(
            "machine name is required".to_string(),
        ));
    }
    // fall back to the address the worker dialed from
    let address = match addr.trim() {
        "" => conn.remote_address().ip().to_string(),
        a => a.to_string(),
    };

    let channel = Arc::new(QuicWorkerChannel::new(conn.clone()));
    let id = service
        .registry()
        .register(machine_name, &address, channel)
        .await;

    // a (re)joining worker gets every share without operator action
    let service = service.clone();
    let name = machine_name.to_string();
    tokio::spawn(async move {
        match service.reconcile().await {
            Ok(report) => info!(
                "[server] reconciled after {name} joined: {} owners synced",
                report.synced.len()
            ),
            Err(e) => warn!("[server] reconcile after {name} joined: {e}"),
        }
    });
    Ok(id)
}

/// handle requests that are not a registration.
pub async fn dispatch(msg: FleetMessage, service: &ShareService) -> FleetMessage {
    match msg {
        FleetMessage::Notify(text) => {
            debug!("[server] notify: {text}");
            FleetMessage::Ack
        }
        FleetMessage::CreateShare(point) => match service.create_share(&point).await {
            Ok(_) => FleetMessage::Ack,
            Err(e) => {
                error!(
                    "[admin] create share {} on {} failed: {e}",
                    point.folder_path, point.machine_name
                );
                FleetMessage::Error(e)
            }
        },
        FleetMessage::RemoveShare(point) => service.remove_share(&point).await.into(),
        FleetMessage::ListShares => match service.list_shares().await {
            Ok(shares) => FleetMessage::Shares(shares),
            Err(e) => FleetMessage::Error(e),
        },
        FleetMessage::ListConnections => FleetMessage::Connections(service.connections().await),
        FleetMessage::SyncShares => match service.reconcile().await {
            Ok(report) => FleetMessage::Synced(report),
            Err(e) => FleetMessage::Error(e),
        },
        other => {
            warn!("[server] unexpected message {}", other.kind());
            FleetMessage::Error(FleetError::InvalidArgument(format!(
                "unexpected message {}",
                other.kind()
            )))
        }
    }
}
