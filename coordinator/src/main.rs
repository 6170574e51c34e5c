mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ShareCommand};
use coordinator::commands::share;
use coordinator::config::load_config;
use coordinator::registry::ConnectionRegistry;
use coordinator::resync::Resync;
use coordinator::server::serve;
use coordinator::store::{MemoryShareStore, ShareStore, XlineShareStore};
use coordinator::sync::ShareService;
use log::{error, info, warn};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stdout)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger();

    match cli.command {
        Commands::Start { config } => {
            let path = config.to_string_lossy();
            let cfg = load_config(&path)?;
            let addr: SocketAddr = cfg
                .addr
                .parse()
                .with_context(|| format!("invalid listen address {}", cfg.addr))?;

            let store: Arc<dyn ShareStore> = match &cfg.xline_config {
                Some(xline) => {
                    info!("[coordinator] storing shares in xline {:?}", xline.endpoints);
                    Arc::new(
                        XlineShareStore::new(xline)
                            .await
                            .context("failed to connect to xline")?,
                    )
                }
                None => {
                    warn!("[coordinator] no xline_config, shares are kept in memory only");
                    Arc::new(MemoryShareStore::new())
                }
            };

            let registry = Arc::new(ConnectionRegistry::new());
            let service = Arc::new(ShareService::new(registry, store, cfg.mount_root.clone()));

            let shutdown = CancellationToken::new();
            let loops = Resync::new(service.clone(), cfg.resync_interval(), cfg.ping_interval())
                .run(shutdown.clone());

            let ctrl_c = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("[coordinator] failed to listen for ctrl-c: {e}");
                    return;
                }
                info!("[coordinator] shutting down");
                ctrl_c.cancel();
            });

            serve(addr, service, shutdown.clone()).await?;
            shutdown.cancel();
            for handle in loops {
                let _ = handle.await;
            }
        }
        Commands::Share { addr, command } => match command {
            ShareCommand::Create { machine, folder } => {
                share::create_share(addr, &machine, &folder).await?
            }
            ShareCommand::Remove { machine, folder } => {
                share::remove_share(addr, &machine, &folder).await?
            }
            ShareCommand::List => share::list_shares(addr).await?,
            ShareCommand::Sync => share::sync(addr).await?,
            ShareCommand::Connections => share::list_connections(addr).await?,
        },
    }

    Ok(())
}
