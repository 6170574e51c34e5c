use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:50051";

#[derive(Parser)]
#[command(name = "coordinator", version, about = "Fleet share coordinator CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the coordinator with config file
    Start {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Manage shares on a running coordinator
    Share {
        /// Coordinator address
        #[arg(long, env = "FLEET_COORDINATOR_ADDR", default_value = DEFAULT_COORDINATOR_ADDR)]
        addr: SocketAddr,
        #[command(subcommand)]
        command: ShareCommand,
    },
}

#[derive(Subcommand)]
pub enum ShareCommand {
    /// Export a folder of a machine and mount it on every other worker
    Create {
        #[arg(long)]
        machine: String,
        #[arg(long)]
        folder: String,
    },
    /// Stop exporting a folder and forget it
    Remove {
        #[arg(long)]
        machine: String,
        #[arg(long)]
        folder: String,
    },
    /// List stored shares
    List,
    /// Push every stored share to the connected workers now
    Sync,
    /// List connected workers
    Connections,
}
