use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::registry::ConfigSink;

pub const DEFAULT_CONFIG_PATH: &str = "servers.json";
pub const DEFAULT_API_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            servers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub display_name: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_interval")]
    pub interval: i64,
    #[serde(default)]
    pub remark: String,
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_interval() -> i64 {
    10
}

impl Config {
    pub fn path_from_env() -> PathBuf {
        env::var("SSMON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    // A missing or broken config file is not fatal: start with an empty
    // server list and let the first mutation write a fresh file.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("no config at {}, starting empty: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => {
                debug!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                error!("failed to parse config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

// Writes the whole config back whenever the registry reports a change.
pub struct JsonFileSink {
    path: PathBuf,
    api_port: u16,
}

impl JsonFileSink {
    pub fn new(path: PathBuf, api_port: u16) -> Self {
        Self { path, api_port }
    }
}

impl ConfigSink for JsonFileSink {
    fn persist(&self, servers: &[ServerEntry]) {
        let config = Config {
            api_port: self.api_port,
            servers: servers.to_vec(),
        };
        let raw = match serde_json::to_string_pretty(&config) {
            Ok(raw) => raw,
            Err(e) => {
                error!("failed to serialize config: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, raw) {
            error!("failed to write config {}: {}", self.path.display(), e);
        } else {
            debug!("persisted {} servers to {}", servers.len(), self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_config() {
        let config = Config::load(Path::new("/definitely/not/here.json"));
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn entries_round_trip_through_json() {
        let config = Config {
            api_port: 9090,
            servers: vec![ServerEntry {
                display_name: "home".to_string(),
                host: "127.0.0.1".to_string(),
                port: 2457,
                interval: 30,
                remark: "lan".to_string(),
            }],
        };
        let raw = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.api_port, 9090);
        assert_eq!(parsed.servers, config.servers);
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let parsed: Config =
            serde_json::from_str(r#"{"servers":[{"host":"h","port":1}]}"#).unwrap();
        assert_eq!(parsed.api_port, DEFAULT_API_PORT);
        assert_eq!(parsed.servers[0].interval, 10);
        assert_eq!(parsed.servers[0].display_name, "");
        assert_eq!(parsed.servers[0].remark, "");
    }

    #[test]
    fn sink_writes_and_reloads() {
        let path = std::env::temp_dir().join("ssmon-sink-test.json");
        let sink = JsonFileSink::new(path.clone(), 8088);
        sink.persist(&[ServerEntry {
            display_name: String::new(),
            host: "10.0.0.1".to_string(),
            port: 2457,
            interval: 10,
            remark: String::new(),
        }]);
        let reloaded = Config::load(&path);
        assert_eq!(reloaded.api_port, 8088);
        assert_eq!(reloaded.servers.len(), 1);
        assert_eq!(reloaded.servers[0].host, "10.0.0.1");
        let _ = fs::remove_file(&path);
    }
}
