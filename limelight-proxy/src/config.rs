//! Proxy configuration (`limelight-proxy.yaml`)
//!
//! ```yaml
//! limelight_address: 10.7.14.11   # must match the camera's static IP
//! limelight_ports: [5800, 5801, 5802, 5803, 5804, 5805, 5806, 5807]
//! nt_tunnel_port: 1735
//! registration_port: 5899          # must match the robot code
//! bind_address: 0.0.0.0
//! socat: /usr/bin/socat            # optional
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "LIMELIGHT_PROXY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "limelight-proxy.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Static address of the Limelight camera.
    pub limelight_address: String,
    /// Camera ports forwarded permanently (5802-5804 are unused by Limelight 2).
    pub limelight_ports: Vec<u16>,
    /// Port the camera uses to reach the NetworkTables server.
    pub nt_tunnel_port: u16,
    /// Port on which robot code registers.
    pub registration_port: u16,
    pub bind_address: String,
    /// Explicit socat binary; searched in the usual places otherwise.
    pub socat: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            limelight_address: "10.7.14.11".into(),
            limelight_ports: (5800..=5807).collect(),
            nt_tunnel_port: 1735,
            registration_port: 5899,
            bind_address: "0.0.0.0".into(),
            socat: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProxyConfig {
    /// `host:port` the registration listener binds.
    pub fn registration_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.registration_port)
    }

    /// Parses a YAML document; an empty document yields the defaults.
    pub fn from_yaml(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(txt)?)
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let txt = fs::read_to_string(path).await?;
        Self::from_yaml(&txt)
    }
}

/// Path from `$LIMELIGHT_PROXY_CONFIG`, else `limelight-proxy.yaml`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into())
        .into()
}

/// Loads the config, degrading to defaults when the file is missing or broken.
pub async fn load_config_from(path: &Path) -> ProxyConfig {
    if !path.exists() {
        warn!("no {}, using default config", path.display());
        return ProxyConfig::default();
    }
    match ProxyConfig::from_file(path).await {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("config {} rejected ({}), using default config", path.display(), e);
            ProxyConfig::default()
        }
    }
}

pub async fn load_config() -> ProxyConfig {
    load_config_from(&config_path()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.limelight_ports.len(), 8);
        assert_eq!(cfg.limelight_ports.first(), Some(&5800));
        assert_eq!(cfg.limelight_ports.last(), Some(&5807));
        assert_eq!(cfg.nt_tunnel_port, 1735);
        assert_eq!(cfg.registration_addr(), "0.0.0.0:5899");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = ProxyConfig::from_yaml("limelight_address: 10.1.2.11\nlimelight_ports: [5800, 5801]\n").unwrap();
        assert_eq!(cfg.limelight_address, "10.1.2.11");
        assert_eq!(cfg.limelight_ports, vec![5800, 5801]);
        assert_eq!(cfg.registration_port, 5899);
        assert!(cfg.socat.is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ProxyConfig::from_yaml("  \n").unwrap(), ProxyConfig::default());
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(matches!(
            ProxyConfig::from_yaml("registration_port: not-a-port"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "registration_port: 6000\nsocat: /opt/socat").unwrap();

        let cfg = load_config_from(file.path()).await;
        assert_eq!(cfg.registration_port, 6000);
        assert_eq!(cfg.socat, Some(PathBuf::from("/opt/socat")));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert_eq!(load_config_from(&missing).await, ProxyConfig::default());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "limelight_ports: {oops").unwrap();
        assert_eq!(load_config_from(&broken).await, ProxyConfig::default());
    }
}
