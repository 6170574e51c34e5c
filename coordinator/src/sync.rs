use common::{
    CallFailure, ConnectionInfo, FleetError, MountSpec, ShareDefinition, SharePoint, SyncAction,
    SyncReport, normalize_folder,
};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::registry::{ConnectionEntry, ConnectionRegistry};
use crate::store::ShareStore;

/// Makes the live fleet match the desired share set.
pub struct ShareService {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn ShareStore>,
    mount_root: PathBuf,
}

impl ShareService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn ShareStore>,
        mount_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            store,
            mount_root: mount_root.into(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    pub async fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.snapshot().await.connection_infos()
    }

    pub async fn list_shares(&self) -> Result<Vec<ShareDefinition>, FleetError> {
        Ok(self.store.all().await?)
    }

    /// Exports `point` on its owner, persists it, then pushes it fleet-wide.
    ///
    /// The share stays persisted even if the follow-up sync reports
    /// unreachable machines; that failure is still returned.
    pub async fn create_share(&self, point: &SharePoint) -> Result<ShareDefinition, FleetError> {
        validate_point(point)?;
        let owner = self.registry.require(&point.machine_name).await?;
        let folder = normalize_folder(&point.folder_path);

        if self.store.exists(&point.machine_name, folder).await? {
            return Err(FleetError::AlreadyExists {
                machine: point.machine_name.clone(),
                path: folder.to_string(),
            });
        }

        let share = ShareDefinition::derive(point, &owner.address, &self.mount_root);
        owner
            .channel
            .create_export(&share.folder_path)
            .await
            .inspect_err(|e| {
                error!(
                    "[share] create export {} on {} failed: {e}",
                    share.folder_path, share.machine_name
                )
            })?;
        self.store.add(&share).await?;
        info!(
            "[share] created {} on {} -> {}",
            share.folder_path, share.machine_name, share.target
        );

        let synced = self.sync_all().await;
        if let Err(e) = &synced {
            warn!("[share] sync after create: {e}");
        }
        let mounted = self.mount_all().await?;
        log_failures("mount pass", &mounted);
        synced.map(|_| share)
    }

    /// Unexports `point` on its owner and forgets it.
    ///
    /// Other workers keep their mounts until their monitors notice the export
    /// is gone or a later sync runs.
    pub async fn remove_share(&self, point: &SharePoint) -> Result<(), FleetError> {
        let owner = self.registry.require(&point.machine_name).await?;
        let folder = normalize_folder(&point.folder_path);

        if !self.store.exists(&point.machine_name, folder).await? {
            return Err(FleetError::NotFound {
                machine: point.machine_name.clone(),
                path: folder.to_string(),
            });
        }

        owner.channel.remove_export(folder).await?;
        self.store.remove(&point.machine_name, folder).await?;
        info!("[share] removed {} on {}", folder, point.machine_name);
        Ok(())
    }

    /// Pushes every owner's shares: exports on the owner, mounts on every
    /// other connected worker.
    ///
    /// Unreachable owners never stop the pass; they are reported together
    /// as `PartialSyncFailure` once everything reachable was attempted. An
    /// owner whose shares cannot be read from the store counts as unreachable.
    pub async fn sync_all(&self) -> Result<SyncReport, FleetError> {
        let report = self.sync_report().await?;
        if report.unreachable.is_empty() {
            Ok(report)
        } else {
            Err(FleetError::PartialSyncFailure(report.unreachable))
        }
    }

    /// [`sync_all`](Self::sync_all) without turning unreachable owners into an error.
    pub async fn sync_report(&self) -> Result<SyncReport, FleetError> {
        let machines = self.store.machines_with_shares().await?;
        let snapshot = self.registry.snapshot().await;
        let mut report = SyncReport::default();

        for machine in machines {
            let Some(owner) = snapshot.get(&machine) else {
                warn!("[sync] {machine} owns shares but is not connected");
                report.unreachable.push(machine);
                continue;
            };

            let shares = match self.store.get(&machine).await {
                Ok(shares) => shares,
                Err(e) => {
                    error!("[sync] failed to read shares of {machine}: {e}");
                    report.failures.push(CallFailure {
                        machine_name: machine.clone(),
                        action: SyncAction::ReadShares,
                        share: String::new(),
                        error: e.to_string(),
                    });
                    report.unreachable.push(machine);
                    continue;
                }
            };

            for share in &shares {
                export_on(owner, share, &mut report).await;
            }
            for other in snapshot.others(&machine) {
                for share in &shares {
                    mount_on(other, share, &mut report).await;
                }
            }
            report.synced.push(machine);
        }

        log_failures("sync", &report);
        Ok(report)
    }

    /// Full mount pass: every share exported on its connected owner and
    /// mounted on every connected worker, owner included.
    ///
    /// Shares whose owner is offline are skipped and the owner is listed as
    /// unreachable; per-call failures are collected, never fatal.
    pub async fn mount_all(&self) -> Result<SyncReport, FleetError> {
        let shares = self.store.all().await?;
        let snapshot = self.registry.snapshot().await;
        let mut report = SyncReport::default();

        info!(
            "[mount] pushing {} shares to {} workers",
            shares.len(),
            snapshot.len()
        );
        let live: Vec<&ShareDefinition> = shares
            .iter()
            .filter(|share| match snapshot.get(&share.machine_name) {
                Some(_) => true,
                None => {
                    if !report.unreachable.contains(&share.machine_name) {
                        report.unreachable.push(share.machine_name.clone());
                    }
                    false
                }
            })
            .collect();

        for share in &live {
            if let Some(owner) = snapshot.get(&share.machine_name) {
                export_on(owner, share, &mut report).await;
                if !report.synced.contains(&share.machine_name) {
                    report.synced.push(share.machine_name.clone());
                }
            }
        }
        for entry in snapshot.iter() {
            for share in &live {
                mount_on(entry, share, &mut report).await;
            }
        }
        Ok(report)
    }

    /// `sync_all` followed by `mount_all`. Runs on worker registration and on
    /// the periodic resync.
    pub async fn reconcile(&self) -> Result<SyncReport, FleetError> {
        let synced = self.sync_all().await;
        let mut report = self.mount_all().await?;
        log_failures("mount pass", &report);
        match synced {
            Ok(sync_report) => {
                report.merge(sync_report);
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }

    /// Sends a liveness ping to every connected worker.
    pub async fn ping_workers(&self, text: &str) -> Vec<(String, FleetError)> {
        let snapshot = self.registry.snapshot().await;
        let pings = snapshot.iter().map(|entry| async move {
            (entry.machine_name.clone(), entry.channel.notify(text).await)
        });
        futures::future::join_all(pings)
            .await
            .into_iter()
            .filter_map(|(name, res)| {
                res.err().map(|e| {
                    warn!("[ping] {name}: {e}");
                    (name, e)
                })
            })
            .collect()
    }
}

fn validate_point(point: &SharePoint) -> Result<(), FleetError> {
    if point.machine_name.trim().is_empty() {
        return Err(FleetError::InvalidArgument(
            "machine name is required".to_string(),
        ));
    }
    let folder = point.folder_path.trim();
    if folder.is_empty() || !Path::new(folder).is_absolute() {
        return Err(FleetError::InvalidArgument(format!(
            "folder path must be absolute: {:?}",
            point.folder_path
        )));
    }
    Ok(())
}

async fn export_on(owner: &ConnectionEntry, share: &ShareDefinition, report: &mut SyncReport) {
    if let Err(e) = owner.channel.create_export(&share.folder_path).await {
        report.failures.push(CallFailure {
            machine_name: owner.machine_name.clone(),
            action: SyncAction::CreateExport,
            share: share.folder_path.clone(),
            error: e.to_string(),
        });
    }
}

async fn mount_on(entry: &ConnectionEntry, share: &ShareDefinition, report: &mut SyncReport) {
    let spec: MountSpec = share.mount_spec();
    if let Err(e) = entry.channel.mount(&spec).await {
        report.failures.push(CallFailure {
            machine_name: entry.machine_name.clone(),
            action: SyncAction::Mount,
            share: spec.to_string(),
            error: e.to_string(),
        });
    }
}

fn log_failures(pass: &str, report: &SyncReport) {
    for f in &report.failures {
        warn!(
            "[{pass}] {:?} {} on {} failed: {}",
            f.action, f.share, f.machine_name, f.error
        );
    }
}
