use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    // ip:port to listen on
    pub addr: String,
    #[serde(default = "default_mount_root")]
    pub mount_root: PathBuf,
    // 0 disables the periodic resync
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    // desired state lives in memory when absent
    #[serde(default)]
    pub xline_config: Option<XlineConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XlineConfig {
    pub endpoints: Vec<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_mount_root() -> PathBuf {
    PathBuf::from("/mnt/fleet")
}

fn default_resync_interval() -> u64 {
    60
}

fn default_ping_interval() -> u64 {
    30
}

fn default_prefix() -> String {
    "/registry/shares".to_string()
}

impl Config {
    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync_interval_secs > 0).then(|| Duration::from_secs(self.resync_interval_secs))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }
}

pub fn load_config(path: &str) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config from {path}"))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let cfg: Config = serde_yaml::from_str(content).context("Failed to parse YAML config")?;
    cfg.addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid listen address {}", cfg.addr))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = parse_config("addr: 0.0.0.0:50051\n").unwrap();
        assert_eq!(cfg.mount_root, PathBuf::from("/mnt/fleet"));
        assert_eq!(cfg.resync_interval(), Some(Duration::from_secs(60)));
        assert_eq!(cfg.ping_interval(), Duration::from_secs(30));
        assert!(cfg.xline_config.is_none());
    }

    #[test]
    fn test_full_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "addr: 127.0.0.1:6000\nmount_root: /srv/fleet\nresync_interval_secs: 0\n\
             xline_config:\n  endpoints: [\"127.0.0.1:2379\"]\n  username: root\n"
        )
        .unwrap();
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.resync_interval(), None);
        let xline = cfg.xline_config.unwrap();
        assert_eq!(xline.prefix, "/registry/shares");
        assert_eq!(xline.username.as_deref(), Some("root"));
        assert!(xline.password.is_none());
    }

    #[test]
    fn test_rejects_bad_addr() {
        assert!(parse_config("addr: not-an-addr\n").is_err());
    }
}
