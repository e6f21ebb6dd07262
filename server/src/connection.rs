//! Connection lifecycle and player binding.
//!
//! A transport connection starts in `PendingHandshake` and is promoted to a
//! bound [`Player`] only after the handshake checks pass. `Disconnected`
//! and `Kicked` are terminal; a kicked connection lingers until its
//! deferred close fires, but never regresses to an earlier state.

use log::info;
use shared::Uuid;
use std::collections::HashMap;

/// Transport-level connection identifier, unique among active sessions.
pub type ConnId = u32;

/// Handshake state machine. `Unconnected` exists only conceptually before
/// the transport hands us the connection, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    PendingHandshake,
    AwaitingConfirm,
    Active,
    Disconnected,
    Kicked,
}

impl ConnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnState::Disconnected | ConnState::Kicked)
    }
}

/// A session-bound player. The numeric id is assigned once per session and
/// never changes; the uuid is the client-declared persistent identity.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: i32,
    pub name: String,
    pub uuid: Uuid,
    pub is_admin: bool,
    pub color: i32,
    pub mobile: bool,
    pub team: u8,
    /// Weapon ids the player owns; shots from unowned weapons are dropped.
    pub weapons: Vec<u8>,
    pub current_weapon: u8,
}

/// One transport connection and its handshake progress.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnId,
    pub address: String,
    pub state: ConnState,
    pub player: Option<Player>,
    /// Whether the connection ever reached `Active`. Decides if teardown
    /// is announced to the other players.
    pub activated: bool,
}

impl Connection {
    fn new(id: ConnId, address: String) -> Self {
        Self {
            id,
            address,
            state: ConnState::PendingHandshake,
            player: None,
            activated: false,
        }
    }
}

/// Owns every live connection and hands out session player ids.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<ConnId, Connection>,
    next_player_id: i32,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Registers a fresh transport connection in `PendingHandshake`.
    /// A duplicate id replaces the stale entry; transport ids are unique
    /// among live sessions, so a reused id means the old one is gone.
    pub fn register(&mut self, id: ConnId, address: String) {
        info!("Connection {} opened from {}", id, address);
        self.connections.insert(id, Connection::new(id, address));
    }

    pub fn get(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn remove(&mut self, id: ConnId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Binds a player to the connection and moves it to `AwaitingConfirm`.
    /// Returns the assigned session player id, or `None` if the connection
    /// is unknown or not mid-handshake.
    pub fn bind_player(&mut self, id: ConnId, mut player: Player) -> Option<i32> {
        let conn = self.connections.get_mut(&id)?;
        if conn.state != ConnState::PendingHandshake {
            return None;
        }
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        player.id = player_id;
        conn.player = Some(player);
        conn.state = ConnState::AwaitingConfirm;
        Some(player_id)
    }

    /// Promotes an `AwaitingConfirm` connection to `Active`.
    pub fn activate(&mut self, id: ConnId) -> Option<&Player> {
        let conn = self.connections.get_mut(&id)?;
        if conn.state != ConnState::AwaitingConfirm {
            return None;
        }
        conn.state = ConnState::Active;
        conn.activated = true;
        conn.player.as_ref()
    }

    pub fn mark_kicked(&mut self, id: ConnId) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.state = ConnState::Kicked;
        }
    }

    /// Case-insensitive name check against every bound player. Covers both
    /// `Active` and `AwaitingConfirm` so two handshakes racing on the same
    /// name cannot both go through.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.connections.values().any(|conn| {
            !conn.state.is_terminal()
                && conn
                    .player
                    .as_ref()
                    .is_some_and(|p| p.name.eq_ignore_ascii_case(name))
        })
    }

    /// Looks up a bound player by session player id.
    pub fn player_by_id(&self, player_id: i32) -> Option<(ConnId, &Player)> {
        self.connections.values().find_map(|conn| {
            conn.player
                .as_ref()
                .filter(|p| p.id == player_id && !conn.state.is_terminal())
                .map(|p| (conn.id, p))
        })
    }

    /// Connection ids of all `Active` players, for join/leave bookkeeping.
    pub fn active_ids(&self) -> Vec<ConnId> {
        self.connections
            .values()
            .filter(|c| c.state == ConnState::Active)
            .map(|c| c.id)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.connections
            .values()
            .filter(|c| c.state == ConnState::Active)
            .count()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> Player {
        Player {
            id: 0,
            name: name.to_string(),
            uuid: Uuid([1; 8]),
            is_admin: false,
            color: 0,
            mobile: false,
            team: 0,
            weapons: vec![0],
            current_weapon: 0,
        }
    }

    #[test]
    fn register_starts_pending() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "10.0.0.1".to_string());
        assert_eq!(conns.get(1).unwrap().state, ConnState::PendingHandshake);
        assert!(conns.get(1).unwrap().player.is_none());
    }

    #[test]
    fn player_ids_are_assigned_once_and_increase() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "a".to_string());
        conns.register(2, "b".to_string());
        let first = conns.bind_player(1, player("Ace")).unwrap();
        let second = conns.bind_player(2, player("Bandit")).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        // Binding twice on the same connection is refused.
        assert!(conns.bind_player(1, player("Ace")).is_none());
    }

    #[test]
    fn activation_requires_awaiting_confirm() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "a".to_string());
        assert!(conns.activate(1).is_none());
        conns.bind_player(1, player("Ace")).unwrap();
        assert!(conns.activate(1).is_some());
        assert_eq!(conns.get(1).unwrap().state, ConnState::Active);
        // Re-activation is a no-op failure, not a panic.
        assert!(conns.activate(1).is_none());
    }

    #[test]
    fn name_check_is_case_insensitive() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "a".to_string());
        conns.bind_player(1, player("Ace")).unwrap();
        conns.activate(1);
        assert!(conns.name_in_use("ACE"));
        assert!(conns.name_in_use("ace"));
        assert!(!conns.name_in_use("Bandit"));
    }

    #[test]
    fn kicked_players_release_their_name() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "a".to_string());
        conns.bind_player(1, player("Ace")).unwrap();
        conns.mark_kicked(1);
        assert!(!conns.name_in_use("Ace"));
        assert!(conns.player_by_id(1).is_none());
    }

    #[test]
    fn lookup_by_player_id() {
        let mut conns = ConnectionManager::new();
        conns.register(7, "a".to_string());
        let pid = conns.bind_player(7, player("Ace")).unwrap();
        conns.activate(7);
        let (conn_id, found) = conns.player_by_id(pid).unwrap();
        assert_eq!(conn_id, 7);
        assert_eq!(found.name, "Ace");
        assert!(conns.player_by_id(999).is_none());
    }

    #[test]
    fn active_ids_exclude_pending() {
        let mut conns = ConnectionManager::new();
        conns.register(1, "a".to_string());
        conns.register(2, "b".to_string());
        conns.bind_player(1, player("Ace")).unwrap();
        conns.activate(1);
        assert_eq!(conns.active_ids(), vec![1]);
        assert_eq!(conns.active_count(), 1);
        assert_eq!(conns.len(), 2);
    }
}
