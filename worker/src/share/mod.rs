//! The four calls a worker serves for the coordinator.
//!
//! All of them are safe to repeat and surface a failing tool's error text
//! unchanged.

pub mod command;
pub mod exports;
pub mod mount_table;
pub mod selinux;

use common::{FleetError, MountSpec};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use command::{CommandRunner, run_checked};
use exports::ExportsFile;
use mount_table::MountTable;

/// Fails fast on a dead server instead of hanging the caller.
pub const MOUNT_OPTIONS: &str = "_netdev,soft,timeo=10,retrans=2,nofail,vers=4";

pub struct ShareOps {
    runner: Arc<dyn CommandRunner>,
    exports: ExportsFile,
    // serializes read-modify-write of the exports file
    exports_lock: Mutex<()>,
    mounts: Arc<MountTable>,
}

impl ShareOps {
    pub fn new(runner: Arc<dyn CommandRunner>, exports: ExportsFile, mounts: Arc<MountTable>) -> Self {
        Self {
            runner,
            exports,
            exports_lock: Mutex::new(()),
            mounts,
        }
    }

    pub fn mounts(&self) -> &Arc<MountTable> {
        &self.mounts
    }

    pub fn exports(&self) -> &ExportsFile {
        &self.exports
    }

    pub async fn create_export(&self, path: &str) -> Result<(), FleetError> {
        require_absolute(path)?;
        tokio::fs::create_dir_all(path).await?;
        selinux::label_for_sharing(self.runner.as_ref(), path).await;

        {
            let _guard = self.exports_lock.lock().await;
            if self.exports.add(path)? {
                info!("added export {path} to {}", self.exports.path().display());
            }
        }
        self.reload_exports().await
    }

    pub async fn remove_export(&self, path: &str) -> Result<(), FleetError> {
        require_absolute(path)?;
        {
            let _guard = self.exports_lock.lock().await;
            if self.exports.remove(path)? {
                info!("removed export {path} from {}", self.exports.path().display());
            }
        }

        let client_path = format!("*:{path}");
        if let Err(e) = run_checked(self.runner.as_ref(), "exportfs", &["-u", &client_path]).await {
            debug!("ignoring unexport failure: {e}");
        }
        self.reload_exports().await
    }

    /// Mounts `spec` unless the target is already tracked and healthy.
    ///
    /// A healthy mount on an untracked target, e.g. one left behind by a
    /// previous run of this process, is adopted instead of mounted again.
    pub async fn mount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        validate_mount(spec)?;
        match self.mounts.get(&spec.target).await {
            Some(current) if current.source == spec.source => {
                if self.probe(&spec.target).await {
                    debug!("{spec} already mounted");
                    return Ok(());
                }
            }
            Some(_) => {}
            None => {
                if self.probe(&spec.target).await {
                    self.mounts.add(spec.clone()).await;
                    info!("adopted existing mount {spec}");
                    return Ok(());
                }
            }
        }
        self.remount(spec).await
    }

    /// Mounts `spec` unconditionally and tracks it.
    pub async fn remount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        validate_mount(spec)?;
        tokio::fs::create_dir_all(&spec.target).await?;
        run_checked(
            self.runner.as_ref(),
            "mount",
            &["-t", "nfs", "-o", MOUNT_OPTIONS, &spec.source, &spec.target],
        )
        .await?;
        self.mounts.add(spec.clone()).await;
        info!("mounted {spec}");
        Ok(())
    }

    pub async fn unmount(&self, spec: &MountSpec) -> Result<(), FleetError> {
        if spec.target.trim().is_empty() {
            return Err(FleetError::InvalidArgument("target is required".to_string()));
        }
        if self.is_mount_point(&spec.target).await {
            run_checked(self.runner.as_ref(), "umount", &[&spec.target]).await?;
            info!("unmounted {}", spec.target);
        } else {
            debug!("{} is not mounted", spec.target);
        }
        self.mounts.remove(&spec.target).await;
        Ok(())
    }

    /// A mount is alive when its directory can be listed and the OS reports
    /// it as a mount point.
    pub async fn probe(&self, target: &str) -> bool {
        if tokio::fs::read_dir(target).await.is_err() {
            return false;
        }
        self.is_mount_point(target).await
    }

    async fn is_mount_point(&self, target: &str) -> bool {
        match self.runner.run("mountpoint", &["-q", target]).await {
            Ok(out) => out.success,
            Err(e) => {
                warn!("mountpoint {target}: {e}");
                false
            }
        }
    }

    async fn reload_exports(&self) -> Result<(), FleetError> {
        run_checked(self.runner.as_ref(), "exportfs", &["-ra"]).await?;
        Ok(())
    }
}

fn require_absolute(path: &str) -> Result<(), FleetError> {
    if path.is_empty() || !Path::new(path).is_absolute() {
        return Err(FleetError::InvalidArgument(format!(
            "path must be absolute: {path:?}"
        )));
    }
    Ok(())
}

fn validate_mount(spec: &MountSpec) -> Result<(), FleetError> {
    if spec.source.trim().is_empty() {
        return Err(FleetError::InvalidArgument("source is required".to_string()));
    }
    if spec.target.trim().is_empty() {
        return Err(FleetError::InvalidArgument("target is required".to_string()));
    }
    Ok(())
}
