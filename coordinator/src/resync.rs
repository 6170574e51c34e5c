use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sync::ShareService;

/// Background loops that keep the fleet converged without operator action.
pub struct Resync {
    service: Arc<ShareService>,
    resync_interval: Option<Duration>,
    ping_interval: Duration,
}

impl Resync {
    pub fn new(
        service: Arc<ShareService>,
        resync_interval: Option<Duration>,
        ping_interval: Duration,
    ) -> Self {
        Self {
            service,
            resync_interval,
            ping_interval,
        }
    }

    /// Spawns the periodic reconcile (if enabled) and the worker heartbeat.
    ///
    /// Both loops stop when `shutdown` is cancelled.
    pub fn run(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(every) = self.resync_interval {
            let service = self.service.clone();
            let token = shutdown.clone();
            handles.push(tokio::spawn(async move {
                debug!("[resync] reconciling every {}s", every.as_secs());
                let mut ticker = tokio::time::interval(every);
                // the first tick fires immediately; registration already reconciles
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = token.cancelled() => break,
                    }
                    match service.reconcile().await {
                        Ok(report) => info!(
                            "[resync] {} owners synced, {} failed calls",
                            report.synced.len(),
                            report.failures.len()
                        ),
                        Err(e) => warn!("[resync] {e}"),
                    }
                }
            }));
        }

        let service = self.service.clone();
        let every = self.ping_interval;
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.cancelled() => break,
                }
                let failed = service.ping_workers("heartbeat from coordinator").await;
                if !failed.is_empty() {
                    debug!("[ping] {} workers did not answer", failed.len());
                }
            }
        }));

        handles
    }
}
