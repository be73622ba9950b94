// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed, validated construction parameters for hub and node, loadable from
//! a JSON config file as well as built programmatically. Modeled on
//! `hdds-discovery-server`'s `ServerConfig`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

fn default_name_hub() -> String {
    "servers".to_string()
}

fn default_name_node() -> String {
    "client".to_string()
}

fn default_connect_code() -> String {
    "c".to_string()
}

fn default_secret_key() -> String {
    "12345678".to_string()
}

fn default_bind_address() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    9000
}

fn default_heartbeat_secs() -> u64 {
    5
}

fn default_heartbeat_stale_secs() -> u64 {
    6
}

fn default_sweep_secs() -> u64 {
    2
}

fn default_get_timeout_ms() -> u64 {
    1000
}

fn default_notice_max_retry() -> u32 {
    10
}

fn default_notice_retry_ms() -> u64 {
    100
}

fn default_spill_dir() -> String {
    ".".to_string()
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > 7 {
        return Err(ConfigError::BadName(format!(
            "name must be 1-7 bytes, got {} bytes",
            name.len()
        )));
    }
    if name.contains('@') {
        return Err(ConfigError::BadName("name must not contain '@'".into()));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.len() != 8 {
        return Err(ConfigError::BadKey(format!(
            "secret key must be exactly 8 bytes, got {}",
            key.len()
        )));
    }
    Ok(())
}

/// Construction parameters for a `Hub`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_name_hub")]
    pub name: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_code")]
    pub connect_code: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_heartbeat_stale_secs")]
    pub heartbeat_stale_secs: u64,
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_notice_max_retry")]
    pub notice_max_retry: u32,
    #[serde(default = "default_notice_retry_ms")]
    pub notice_retry_ms: u64,
    #[serde(default = "default_spill_dir")]
    pub spill_dir: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: default_name_hub(),
            bind_address: default_bind_address(),
            port: default_port(),
            connect_code: default_connect_code(),
            secret_key: default_secret_key(),
            heartbeat_stale_secs: default_heartbeat_stale_secs(),
            sweep_interval_secs: default_sweep_secs(),
            notice_max_retry: default_notice_max_retry(),
            notice_retry_ms: default_notice_retry_ms(),
            spill_dir: default_spill_dir(),
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;
        validate_key(&self.secret_key)?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let cfg: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn heartbeat_stale(&self) -> Duration {
        Duration::from_secs(self.heartbeat_stale_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn notice_retry_interval(&self) -> Duration {
        Duration::from_millis(self.notice_retry_ms)
    }

    pub fn secret_key_bytes(&self) -> [u8; 8] {
        let mut key = [0u8; 8];
        key.copy_from_slice(self.secret_key.as_bytes());
        key
    }
}

/// Construction parameters for a `Node`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_name_node")]
    pub name: String,
    pub hub_address: String,
    #[serde(default = "default_connect_code")]
    pub connect_code: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_get_timeout_ms")]
    pub get_timeout_ms: u64,
    #[serde(default = "default_spill_dir")]
    pub spill_dir: String,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;
        validate_key(&self.secret_key)?;
        if self.hub_address.is_empty() {
            return Err(ConfigError::InvalidValue("hub_address must not be empty".into()));
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let cfg: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn secret_key_bytes(&self) -> [u8; 8] {
        let mut key = [0u8; 8];
        key.copy_from_slice(self.secret_key.as_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_defaults_validate() {
        let cfg = HubConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn node_requires_hub_address() {
        let mut cfg = NodeConfig {
            name: "n1".into(),
            hub_address: String::new(),
            connect_code: "c".into(),
            secret_key: "12345678".into(),
            heartbeat_secs: 5,
            get_timeout_ms: 1000,
            spill_dir: ".".into(),
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
        cfg.hub_address = "127.0.0.1:9000".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_key_length_rejected() {
        let cfg = HubConfig {
            secret_key: "short".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::BadKey(_))));
    }

    #[test]
    fn name_too_long_rejected() {
        let cfg = HubConfig {
            name: "waytoolongname".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::BadName(_))));
    }

    #[test]
    fn name_with_at_sign_rejected() {
        let cfg = HubConfig {
            name: "a@b".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::BadName(_))));
    }

    #[test]
    fn roundtrips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.json");
        let cfg = HubConfig::default();
        cfg.to_file(&path).unwrap();
        let loaded = HubConfig::from_file(&path).unwrap();
        assert_eq!(loaded.name, cfg.name);
        assert_eq!(loaded.port, cfg.port);
    }
}
