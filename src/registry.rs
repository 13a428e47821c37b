// src/registry.rs
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::RwLock;

use crate::config::ServerEntry;
use crate::models::server::{PlayerStatus, ServerStatus, StatusSnapshot};
use crate::poller::{self, PollerHandle};
use crate::query::QueryClient;
use crate::utils::format_duration;

pub const DEFAULT_INTERVAL_SECS: u64 = 10;

#[derive(Debug)]
pub enum RegistryError {
    InvalidConfig(String),
    NotFound(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid config: {}", reason),
            Self::NotFound(id) => write!(f, "no server with id {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}

// Whoever persists the server list gets the full current membership after
// every successful mutation. The registry itself never touches files.
pub trait ConfigSink: Send + Sync {
    fn persist(&self, servers: &[ServerEntry]);
}

struct MonitoredServer {
    id: String,
    display_name: String,
    host: String,
    port: u16,
    interval_secs: u64,
    remark: String,
    last_snapshot: Option<StatusSnapshot>,
    poller: PollerHandle,
}

impl MonitoredServer {
    fn record(&self) -> ServerRecord {
        ServerRecord {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            host: self.host.clone(),
            port: self.port,
            interval_secs: self.interval_secs,
            remark: self.remark.clone(),
            last_snapshot: self.last_snapshot.clone(),
        }
    }

    fn entry(&self) -> ServerEntry {
        ServerEntry {
            display_name: self.display_name.clone(),
            host: self.host.clone(),
            port: self.port,
            interval: self.interval_secs as i64,
            remark: self.remark.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub id: String,
    pub display_name: String,
    pub host: String,
    pub port: u16,
    pub interval_secs: u64,
    pub remark: String,
    pub last_snapshot: Option<StatusSnapshot>,
}

// Owns the ordered server list and every poller. All membership changes and
// all per-server field writes go through the one lock below, so a poller
// applying a result and a caller editing or removing the same server can
// never interleave.
pub struct Registry {
    servers: RwLock<Vec<MonitoredServer>>,
    client: Arc<dyn QueryClient>,
    sink: Arc<dyn ConfigSink>,
}

impl Registry {
    pub fn new(client: Arc<dyn QueryClient>, sink: Arc<dyn ConfigSink>) -> Arc<Self> {
        Arc::new(Self {
            servers: RwLock::new(Vec::new()),
            client,
            sink,
        })
    }

    pub fn add(self: &Arc<Self>, entry: ServerEntry) -> Result<ServerRecord, RegistryError> {
        let host = entry.host.trim().to_string();
        if host.is_empty() {
            return Err(RegistryError::InvalidConfig("host must not be empty".to_string()));
        }
        if entry.port == 0 {
            return Err(RegistryError::InvalidConfig("port must not be 0".to_string()));
        }
        let interval_secs = if entry.interval <= 0 {
            DEFAULT_INTERVAL_SECS
        } else {
            entry.interval as u64
        };
        let id = uuid::Uuid::new_v4().to_string();

        let record = {
            let mut servers = self.servers.write();
            // Spawned while the lock is held: the task's first lookup blocks
            // until the record below is in place.
            let poller = poller::spawn(
                Arc::clone(self),
                id.clone(),
                Arc::clone(&self.client),
                interval_secs,
            );
            let server = MonitoredServer {
                id,
                display_name: entry.display_name,
                host,
                port: entry.port,
                interval_secs,
                remark: entry.remark,
                last_snapshot: None,
                poller,
            };
            let record = server.record();
            servers.push(server);
            record
        };

        debug!("added server {} ({}:{})", record.id, record.host, record.port);
        self.notify_sink();
        Ok(record)
    }

    // Unknown ids are a no-op, not an error.
    pub fn remove(&self, id: &str) {
        let removed = {
            let mut servers = self.servers.write();
            let index = servers.iter().position(|s| s.id == id);
            index.map(|i| servers.remove(i))
        };
        match removed {
            Some(server) => {
                server.poller.stop();
                debug!("removed server {} ({}:{})", server.id, server.host, server.port);
                self.notify_sink();
            }
            None => {
                debug!("remove: no server with id {}", id);
            }
        }
    }

    pub fn list(&self) -> Vec<ServerRecord> {
        self.servers.read().iter().map(|s| s.record()).collect()
    }

    pub fn update_interval(&self, id: &str, interval: i64) -> Result<(), RegistryError> {
        if interval <= 0 {
            return Err(RegistryError::InvalidConfig(format!(
                "interval must be positive, got {}",
                interval
            )));
        }
        {
            let mut servers = self.servers.write();
            let server = servers
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            server.interval_secs = interval as u64;
            server.poller.set_interval(Duration::from_secs(interval as u64));
        }
        self.notify_sink();
        Ok(())
    }

    pub fn update_config(
        &self,
        id: &str,
        host: &str,
        port: u16,
        remark: &str,
        display_name: &str,
    ) -> Result<(), RegistryError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(RegistryError::InvalidConfig("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(RegistryError::InvalidConfig("port must not be 0".to_string()));
        }
        {
            let mut servers = self.servers.write();
            let server = servers
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            server.host = host.to_string();
            server.port = port;
            server.remark = remark.to_string();
            server.display_name = display_name.to_string();
        }
        self.notify_sink();
        Ok(())
    }

    pub fn find_by_addr(&self, host: &str, port: u16) -> Option<ServerRecord> {
        self.servers
            .read()
            .iter()
            .find(|s| s.host == host && s.port == port)
            .map(|s| s.record())
    }

    // Read-only projection for presentation layers.
    pub fn status(&self) -> Vec<ServerStatus> {
        self.servers
            .read()
            .iter()
            .map(|s| {
                let snapshot = s.last_snapshot.as_ref();
                let name = if !s.display_name.is_empty() {
                    s.display_name.clone()
                } else {
                    match snapshot {
                        Some(snap) => snap.server_name.clone(),
                        None => "-".to_string(),
                    }
                };
                let max_session_text = snapshot
                    .and_then(|snap| snap.max_session_duration())
                    .map(format_duration)
                    .unwrap_or_else(|| "-".to_string());
                let players = snapshot
                    .map(|snap| {
                        snap.players
                            .iter()
                            .map(|p| PlayerStatus {
                                name: p.name.clone(),
                                duration_secs: p.duration,
                                duration_text: format_duration(p.duration),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                ServerStatus {
                    id: s.id.clone(),
                    name,
                    host: s.host.clone(),
                    port: s.port,
                    remark: s.remark.clone(),
                    interval_secs: s.interval_secs,
                    player_count: snapshot.map(|snap| snap.player_count),
                    max_session_text,
                    players,
                }
            })
            .collect()
    }

    pub fn shutdown(&self) {
        for server in self.servers.read().iter() {
            server.poller.stop();
        }
    }

    pub(crate) fn poll_target(&self, id: &str) -> Option<(String, u16)> {
        self.servers
            .read()
            .iter()
            .find(|s| s.id == id)
            .map(|s| (s.host.clone(), s.port))
    }

    // Returns false when the server is no longer registered; the caller must
    // drop the snapshot in that case.
    pub(crate) fn apply_snapshot(&self, id: &str, snapshot: StatusSnapshot) -> bool {
        let mut servers = self.servers.write();
        match servers.iter_mut().find(|s| s.id == id) {
            Some(server) => {
                server.last_snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    fn notify_sink(&self) {
        let entries: Vec<ServerEntry> =
            self.servers.read().iter().map(|s| s.entry()).collect();
        self.sink.persist(&entries);
    }
}
