use anyhow::Result;
use std::net::SocketAddr;

use crate::client::AdminClient;

pub async fn create_share(addr: SocketAddr, machine: &str, folder: &str) -> Result<()> {
    let cli = AdminClient::connect(addr).await?;
    let res = cli.create_share(machine, folder).await;
    cli.close();
    res?;
    println!("share {folder} on {machine} created");
    Ok(())
}

pub async fn remove_share(addr: SocketAddr, machine: &str, folder: &str) -> Result<()> {
    let cli = AdminClient::connect(addr).await?;
    let res = cli.remove_share(machine, folder).await;
    cli.close();
    res?;
    println!("share {folder} on {machine} removed");
    Ok(())
}

pub async fn list_shares(addr: SocketAddr) -> Result<()> {
    let cli = AdminClient::connect(addr).await?;
    let shares = cli.list_shares().await;
    cli.close();

    let shares = shares?;
    if shares.is_empty() {
        println!("no shares");
        return Ok(());
    }
    println!("{:<20} {:<30} TARGET", "MACHINE", "FOLDER");
    for share in shares {
        println!(
            "{:<20} {:<30} {}",
            share.machine_name, share.folder_path, share.target
        );
    }
    Ok(())
}

pub async fn list_connections(addr: SocketAddr) -> Result<()> {
    let cli = AdminClient::connect(addr).await?;
    let conns = cli.list_connections().await;
    cli.close();

    println!("{:<20} ADDRESS", "MACHINE");
    for conn in conns? {
        println!("{:<20} {}", conn.machine_name, conn.address);
    }
    Ok(())
}

pub async fn sync(addr: SocketAddr) -> Result<()> {
    let cli = AdminClient::connect(addr).await?;
    let report = cli.sync().await;
    cli.close();

    let report = report?;
    println!("synced: {}", report.synced.join(", "));
    for f in &report.failures {
        println!(
            "failed: {:?} {} on {}: {}",
            f.action, f.share, f.machine_name, f.error
        );
    }
    Ok(())
}
