//! Wire protocol shared between the server and its clients.
//!
//! Everything that crosses the network lives here: the byte-level
//! reader/writer (`wire`), the closed packet enum with its tag registry
//! (`packets`), and the small identity/enum types both sides agree on.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod packets;
pub mod wire;

pub use packets::{EditLogRecord, Packet, TraceSnapshot};
pub use wire::{Reader, WireError, Writer};

/// Sentinel protocol version meaning "accept anything". A client declaring
/// this is treated as a modified client for tracing purposes.
pub const VERSION_ANY: i32 = -1;

/// Maximum accepted chat message length in bytes.
pub const MAX_TEXT_LENGTH: usize = 150;

/// Maximum number of entity records packed into one sync batch datagram.
pub const SYNC_BATCH_MAX_RECORDS: usize = 64;

/// Client-declared persistent identity. Eight raw bytes, not verified
/// cryptographically; it only has to be stable across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uuid(pub [u8; 8]);

impl Uuid {
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Reason codes carried by `Packet::Kick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KickReason {
    Kick = 0,
    ClientOutdated = 1,
    ServerOutdated = 2,
    Banned = 3,
    RecentKick = 4,
    NameInUse = 5,
    FastShoot = 6,
}

impl KickReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => KickReason::Kick,
            1 => KickReason::ClientOutdated,
            2 => KickReason::ServerOutdated,
            3 => KickReason::Banned,
            4 => KickReason::RecentKick,
            5 => KickReason::NameInUse,
            6 => KickReason::FastShoot,
            _ => return None,
        })
    }
}

/// Moderation actions a privileged player may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdminAction {
    Kick = 0,
    Ban = 1,
    Trace = 2,
}

impl AdminAction {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => AdminAction::Kick,
            1 => AdminAction::Ban,
            2 => AdminAction::Trace,
            _ => return None,
        })
    }
}

/// Kind of a validated world edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EditAction {
    Place = 0,
    Break = 1,
}

impl EditAction {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => EditAction::Place,
            1 => EditAction::Break,
            _ => return None,
        })
    }
}
