use common::quic::{recv_message, send_message};
use common::{FleetError, FleetMessage};
use quinn::Connection;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::share::ShareOps;

/// Serves the coordinator's calls on the control connection until it closes.
pub async fn serve(conn: Connection, ops: Arc<ShareOps>) {
    loop {
        let (mut send, mut recv) = match conn.accept_bi().await {
            Ok(streams) => streams,
            Err(e) => {
                info!("inbound server stopped: {e}");
                return;
            }
        };

        let ops = ops.clone();
        tokio::spawn(async move {
            let response = match recv_message(&mut recv).await {
                Ok(msg) => dispatch(msg, &ops).await,
                Err(e) => {
                    warn!("bad request from coordinator: {e}");
                    FleetMessage::Error(e)
                }
            };
            if let Err(e) = send_message(&mut send, &response).await {
                warn!("failed to respond to coordinator: {e}");
            }
        });
    }
}

pub async fn dispatch(msg: FleetMessage, ops: &ShareOps) -> FleetMessage {
    let kind = msg.kind();
    let res = match msg {
        FleetMessage::CreateExport(path) => ops.create_export(&path).await,
        FleetMessage::RemoveExport(path) => ops.remove_export(&path).await,
        FleetMessage::Mount(spec) => ops.mount(&spec).await,
        FleetMessage::Unmount(spec) => ops.unmount(&spec).await,
        FleetMessage::Notify(text) => {
            debug!("notify: {text}");
            Ok(())
        }
        other => Err(FleetError::InvalidArgument(format!(
            "unexpected message {}",
            other.kind()
        ))),
    };
    if let Err(e) = &res {
        error!("{kind} failed: {e}");
    }
    res.into()
}
