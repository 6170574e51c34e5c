use common::FleetMessage;
use common::quic::request_with_timeout;
use quinn::Connection;
use std::time::Duration;
use tracing::{debug, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends a no-op notification to the coordinator every `interval` until the
/// connection closes. Failures are only logged.
pub async fn run_pinger(conn: Connection, machine_name: String, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if conn.close_reason().is_some() {
            break;
        }
        let msg = FleetMessage::Notify(format!("ping from {machine_name}"));
        match request_with_timeout(&conn, &msg, PING_TIMEOUT).await {
            Ok(_) => debug!("ping acknowledged"),
            Err(e) => warn!("ping to coordinator failed: {e}"),
        }
    }
}
