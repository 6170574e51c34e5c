use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use worker::config::WorkerConfig;
use worker::daemon;

#[derive(Parser)]
#[command(name = "worker")]
#[command(about = "Fleet share worker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Connect to the coordinator and serve share calls")]
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            let cfg = WorkerConfig::from_env()?;
            daemon::run(cfg).await
        }
    }
}
