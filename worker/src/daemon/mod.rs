pub mod client;
pub mod conn_monitor;
pub mod mount_monitor;
pub mod ping;
pub mod server;

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::share::ShareOps;
use crate::share::command::SystemRunner;
use crate::share::exports::ExportsFile;
use crate::share::mount_table::MountTable;
use conn_monitor::{ConnectionMonitor, ExecRelauncher, MonitorExit, QuicControlChannel};
use mount_monitor::MountMonitor;

/// Runs the worker until its control channel is lost.
///
/// A lost channel re-executes the binary; this only returns when the
/// channel goes away without a terminal state.
pub async fn run(cfg: WorkerConfig) -> Result<()> {
    if !cfg.use_sudo && !nix::unistd::geteuid().is_root() {
        bail!("worker must run as root or with FLEET_USE_SUDO=true");
    }
    info!("starting worker {}", cfg.machine_name);

    let runner = Arc::new(SystemRunner::new(cfg.use_sudo));
    let exports = ExportsFile::new(&cfg.exports_file, &cfg.export_options);
    let ops = Arc::new(ShareOps::new(runner, exports, Arc::new(MountTable::new())));

    tokio::spawn(MountMonitor::new(ops.clone(), cfg.mount_check_interval).run());

    let (_endpoint, conn) = client::connect_and_register(&cfg).await?;
    tokio::spawn(server::serve(conn.clone(), ops.clone()));
    tokio::spawn(ping::run_pinger(
        conn.clone(),
        cfg.machine_name.clone(),
        cfg.ping_interval,
    ));

    let channel = Arc::new(QuicControlChannel::new(conn));
    match ConnectionMonitor::new(channel, Arc::new(ExecRelauncher))
        .run()
        .await
    {
        MonitorExit::ChannelGone => Ok(()),
        MonitorExit::RestartFailed(e) => {
            error!("cannot restart worker: {e}");
            std::process::exit(1);
        }
    }
}
