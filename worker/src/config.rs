use anyhow::{Context, Result};
use gethostname::gethostname;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_COORDINATOR_ADDR: &str = "127.0.0.1:50051";
const DEFAULT_EXPORTS_FILE: &str = "/etc/exports.d/fleet.exports";
const DEFAULT_EXPORT_OPTIONS: &str = "*(rw,sync,no_subtree_check,no_root_squash)";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_addr: SocketAddr,
    pub machine_name: String,
    /// address other machines mount from; empty lets the coordinator use
    /// the address this worker connects from
    pub advertise_addr: String,
    pub ping_interval: Duration,
    pub mount_check_interval: Duration,
    pub exports_file: PathBuf,
    pub export_options: String,
    pub use_sudo: bool,
}

impl WorkerConfig {
    /// Reads `FLEET_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let machine_name = match get("FLEET_MACHINE_NAME") {
            Some(name) => name,
            None => gethostname().to_string_lossy().into_owned(),
        };

        Ok(Self {
            coordinator_addr: parse_or(&get, "FLEET_COORDINATOR_ADDR", DEFAULT_COORDINATOR_ADDR)?,
            machine_name,
            advertise_addr: get("FLEET_ADVERTISE_ADDR").unwrap_or_default(),
            ping_interval: interval_or(&get, "FLEET_PING_INTERVAL_SECS", "30")?,
            mount_check_interval: interval_or(&get, "FLEET_MOUNT_CHECK_INTERVAL_SECS", "5")?,
            exports_file: get("FLEET_EXPORTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORTS_FILE)),
            export_options: get("FLEET_EXPORT_OPTIONS")
                .unwrap_or_else(|| DEFAULT_EXPORT_OPTIONS.to_string()),
            use_sudo: parse_or(&get, "FLEET_USE_SUDO", "false")?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {key}: {raw:?}"))
}

/// Whole seconds, at least one.
fn interval_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<Duration> {
    let secs: u64 = parse_or(get, key, default)?;
    anyhow::ensure!(secs > 0, "invalid {key}: interval must be at least 1 second");
    Ok(Duration::from_secs(secs))
}
