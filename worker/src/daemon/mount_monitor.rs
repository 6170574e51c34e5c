use common::MountSpec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::share::ShareOps;

pub const MAX_REMOUNT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountHealth {
    Healthy,
    Recovered { attempts: u32 },
    /// remediation gave up and the mount was dropped
    Disabled,
}

/// Periodically probes every tracked mount and repairs or drops dead ones.
pub struct MountMonitor {
    ops: Arc<ShareOps>,
    interval: Duration,
}

impl MountMonitor {
    pub fn new(ops: Arc<ShareOps>, interval: Duration) -> Self {
        Self { ops, interval }
    }

    pub async fn run(self) {
        debug!("mount monitor checking every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }

    /// Checks every mount once and returns what happened to each target.
    pub async fn check_once(&self) -> Vec<(String, MountHealth)> {
        // copy under the lock, remediation below takes it exclusively
        let mounts = self.ops.mounts().snapshot().await;
        let mut results = Vec::with_capacity(mounts.len());
        for spec in mounts {
            let health = if self.ops.probe(&spec.target).await {
                MountHealth::Healthy
            } else {
                warn!("mount {spec} is not healthy");
                self.remediate(&spec).await
            };
            results.push((spec.target, health));
        }
        results
    }

    async fn remediate(&self, spec: &MountSpec) -> MountHealth {
        for attempt in 1..=MAX_REMOUNT_ATTEMPTS {
            match self.ops.remount(spec).await {
                Ok(()) => {
                    info!("recovered {spec} after {attempt} attempt(s)");
                    return MountHealth::Recovered { attempts: attempt };
                }
                Err(e) => {
                    warn!("remount {spec} attempt {attempt}/{MAX_REMOUNT_ATTEMPTS} failed: {e}");
                }
            }
            if attempt < MAX_REMOUNT_ATTEMPTS {
                tokio::time::sleep(self.interval).await;
            }
        }

        if let Err(e) = self.ops.unmount(spec).await {
            warn!("unmount of dead share {} failed: {e}", spec.target);
        }
        self.ops.mounts().remove(&spec.target).await;
        error!("share {spec} disabled after {MAX_REMOUNT_ATTEMPTS} failed remounts");
        MountHealth::Disabled
    }
}
