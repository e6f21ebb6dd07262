//! Moderation store: persistent per-identity records, transient trace
//! diagnostics, and the ban lists.
//!
//! Persistent records are keyed by the client-declared uuid and survive
//! reconnection; they are written to disk with bincode after every kick or
//! disconnect. Traces are transient per process unless explicitly kept.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::packets::TraceSnapshot;
use shared::Uuid;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Handshake cooldown after a kick, in milliseconds.
pub const KICK_COOLDOWN_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
}

/// Per-identity persistent record. Ban state is monotonic: once set it is
/// only cleared by an explicit administrative reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub banned: bool,
    pub ips: Vec<String>,
    pub names: Vec<String>,
    pub times_kicked: u32,
    pub last_kicked_ms: u64,
    pub blocks_placed: u64,
    pub blocks_broken: u64,
}

/// Per-identity transient diagnostics, rebuilt on reconnect.
#[derive(Debug, Clone, Default)]
pub struct TraceInfo {
    pub player_id: i32,
    pub ip: String,
    pub modified_client: bool,
    pub mobile: bool,
    pub total_blocks_broken: i32,
    pub structure_blocks_broken: i32,
    pub last_block_broken: i32,
    pub total_blocks_placed: i32,
    pub last_block_placed: i32,
    /// Per-weapon fast-fire violation counters.
    pub fast_shots: HashMap<u8, u32>,
}

impl TraceInfo {
    pub fn snapshot(&self, uuid: Uuid) -> TraceSnapshot {
        TraceSnapshot {
            player_id: self.player_id,
            ip: self.ip.clone(),
            modified_client: self.modified_client,
            mobile: self.mobile,
            total_blocks_broken: self.total_blocks_broken,
            structure_blocks_broken: self.structure_blocks_broken,
            last_block_broken: self.last_block_broken,
            total_blocks_placed: self.total_blocks_placed,
            last_block_placed: self.last_block_placed,
            uuid,
        }
    }
}

/// On-disk shape of the store. Traces are deliberately not persisted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedState {
    banned_ips: HashSet<String>,
    admins: HashSet<Uuid>,
    info: HashMap<Uuid, PlayerInfo>,
}

/// The moderation store. Single-writer like every other table in the core;
/// it is owned by the dispatch context, never a global.
#[derive(Debug, Default)]
pub struct Administration {
    path: Option<PathBuf>,
    banned_ips: HashSet<String>,
    admins: HashSet<Uuid>,
    info: HashMap<Uuid, PlayerInfo>,
    traces: HashMap<Uuid, TraceInfo>,
}

impl Administration {
    pub fn new(path: Option<PathBuf>) -> Self {
        let mut store = Self {
            path,
            ..Self::default()
        };
        store.load();
        store
    }

    fn load(&mut self) {
        let Some(path) = &self.path else { return };
        match fs::read(path) {
            Ok(bytes) => match bincode::deserialize::<SavedState>(&bytes) {
                Ok(saved) => {
                    info!(
                        "Loaded moderation store: {} records, {} banned ips",
                        saved.info.len(),
                        saved.banned_ips.len()
                    );
                    self.banned_ips = saved.banned_ips;
                    self.admins = saved.admins;
                    self.info = saved.info;
                }
                Err(e) => warn!("Corrupt moderation store at {}: {}", path.display(), e),
            },
            // Missing file just means a fresh server.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot read moderation store: {}", e),
        }
    }

    /// Writes the store to disk. Callers log failures; a failed save never
    /// propagates into the tick.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let saved = SavedState {
            banned_ips: self.banned_ips.clone(),
            admins: self.admins.clone(),
            info: self.info.clone(),
        };
        let bytes = bincode::serialize(&saved)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn is_ip_banned(&self, ip: &str) -> bool {
        self.banned_ips.contains(ip)
    }

    pub fn is_id_banned(&self, uuid: Uuid) -> bool {
        self.info.get(&uuid).is_some_and(|i| i.banned)
    }

    pub fn ban_ip(&mut self, ip: &str) {
        self.banned_ips.insert(ip.to_string());
    }

    pub fn ban_id(&mut self, uuid: Uuid) {
        self.info_mut(uuid).banned = true;
    }

    /// Explicit administrative reset: clears the persistent record and any
    /// trace for the identity. The only way a ban is ever lifted.
    pub fn reset_record(&mut self, uuid: Uuid) {
        self.info.remove(&uuid);
        self.traces.remove(&uuid);
    }

    pub fn is_admin(&self, uuid: Uuid) -> bool {
        self.admins.contains(&uuid)
    }

    pub fn grant_admin(&mut self, uuid: Uuid) {
        self.admins.insert(uuid);
    }

    pub fn info(&self, uuid: Uuid) -> Option<&PlayerInfo> {
        self.info.get(&uuid)
    }

    pub fn info_mut(&mut self, uuid: Uuid) -> &mut PlayerInfo {
        self.info.entry(uuid).or_default()
    }

    pub fn trace(&self, uuid: Uuid) -> Option<&TraceInfo> {
        self.traces.get(&uuid)
    }

    pub fn trace_mut(&mut self, uuid: Uuid) -> &mut TraceInfo {
        self.traces.entry(uuid).or_default()
    }

    pub fn clear_traces(&mut self) {
        self.traces.clear();
    }

    /// Records a successful join: ip and name history, deduplicated.
    pub fn update_player_joined(&mut self, uuid: Uuid, ip: &str, name: &str) {
        let info = self.info_mut(uuid);
        if !info.ips.iter().any(|known| known == ip) {
            info.ips.push(ip.to_string());
        }
        if !info.names.iter().any(|known| known == name) {
            info.names.push(name.to_string());
        }
    }

    /// Stamps a kick on the persistent record; feeds the handshake cooldown.
    pub fn note_kicked(&mut self, uuid: Uuid, now_ms: u64) {
        let info = self.info_mut(uuid);
        info.times_kicked += 1;
        info.last_kicked_ms = now_ms;
    }

    /// True while the identity is inside the post-kick cooldown window.
    pub fn recently_kicked(&self, uuid: Uuid, now_ms: u64) -> bool {
        self.info
            .get(&uuid)
            .is_some_and(|i| i.last_kicked_ms != 0 && now_ms.saturating_sub(i.last_kicked_ms) < KICK_COOLDOWN_MS)
    }
}
