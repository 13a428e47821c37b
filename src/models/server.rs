// src/models/server.rs
use serde::{Deserialize, Serialize};

use crate::utils::sanitize_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub server_name: String,
    pub player_count: u64,
    pub players: Vec<Player>,
}

impl StatusSnapshot {
    // The reported name is sanitized here so no raw markup leaves the process.
    pub fn new(server_name: &str, players: Vec<Player>) -> Self {
        Self {
            server_name: sanitize_name(server_name),
            player_count: players.len() as u64,
            players,
        }
    }

    pub fn max_session_duration(&self) -> Option<u64> {
        self.players.iter().map(|p| p.duration).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub name: String,
    pub duration_secs: u64,
    pub duration_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStatus {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub remark: String,
    pub interval_secs: u64,
    pub player_count: Option<u64>,
    pub max_session_text: String,
    pub players: Vec<PlayerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_count_matches_player_list() {
        let snapshot = StatusSnapshot::new(
            "Ark",
            vec![
                Player { name: "a".to_string(), duration: 120 },
                Player { name: String::new(), duration: 45 },
            ],
        );
        assert_eq!(snapshot.player_count, 2);
        assert_eq!(snapshot.max_session_duration(), Some(120));
    }

    #[test]
    fn max_session_duration_is_unknown_without_players() {
        let snapshot = StatusSnapshot::new("Ark", Vec::new());
        assert_eq!(snapshot.player_count, 0);
        assert_eq!(snapshot.max_session_duration(), None);
    }

    #[test]
    fn reported_name_is_sanitized_at_construction() {
        let snapshot = StatusSnapshot::new("<b>Ark</b> PvP", Vec::new());
        assert_eq!(snapshot.server_name, "Ark PvP");
    }
}
