//! The packet catalogue: a closed enum over every datagram kind, plus its
//! encode/decode table keyed by a one-byte tag.
//!
//! The tag match in [`Packet::decode`] is the registry: adding a packet kind
//! means adding a variant, a tag constant, and an arm in both directions.
//! An unknown tag is a [`WireError::UnknownTag`], never a panic. The bulk
//! world snapshot is not part of this catalogue; it travels as a separate
//! length-delimited stream (see [`frame_stream`]).

use crate::wire::{Reader, WireError, Writer};
use crate::{AdminAction, EditAction, KickReason, Uuid};

pub mod tag {
    pub const CONNECT_REQUEST: u8 = 1;
    pub const CONNECT_CONFIRM: u8 = 2;
    pub const DISCONNECT: u8 = 3;
    pub const POSITION: u8 = 4;
    pub const ENTITY_SHOOT: u8 = 5;
    pub const PLACE: u8 = 6;
    pub const BREAK: u8 = 7;
    pub const CHAT: u8 = 8;
    pub const KICK: u8 = 9;
    pub const UPGRADE: u8 = 10;
    pub const WEAPON_SWITCH: u8 = 11;
    pub const BLOCK_TAP: u8 = 12;
    pub const BLOCK_CONFIG: u8 = 13;
    pub const ENTITY_REQUEST: u8 = 14;
    pub const ENTITY_SPAWN: u8 = 15;
    pub const ENTITY_DEATH: u8 = 16;
    pub const ADMIN_REQUEST: u8 = 17;
    pub const TRACE: u8 = 18;
    pub const EDIT_LOG_REQUEST: u8 = 19;
    pub const EDIT_LOG_RESPONSE: u8 = 20;
    pub const ROLLBACK_REQUEST: u8 = 21;
    pub const SYNC_BATCH: u8 = 22;
    pub const STATE_SYNC: u8 = 23;
}

/// One entry of an [`Packet::EditLogResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditLogRecord {
    pub name: String,
    pub block: i32,
    pub rotation: u8,
    pub action: EditAction,
}

/// Per-identity diagnostic snapshot returned by an admin trace request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSnapshot {
    pub player_id: i32,
    pub ip: String,
    pub modified_client: bool,
    pub mobile: bool,
    pub total_blocks_broken: i32,
    pub structure_blocks_broken: i32,
    pub last_block_broken: i32,
    pub total_blocks_placed: i32,
    pub last_block_placed: i32,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    ConnectRequest {
        version: i32,
        name: String,
        mobile: bool,
        color: i32,
        uuid: Uuid,
    },
    ConnectConfirm,
    Disconnect {
        player_id: i32,
    },
    Position {
        player_id: i32,
        timestamp: i64,
        state: Vec<u8>,
    },
    EntityShoot {
        group: u8,
        entity_id: i32,
        x: f32,
        y: f32,
        rotation: f32,
        bullet: i16,
        weapon: i16,
    },
    Place {
        player_id: i32,
        rotation: u8,
        x: i16,
        y: i16,
        recipe: u8,
    },
    Break {
        player_id: i32,
        x: i16,
        y: i16,
    },
    Chat {
        /// `None` for system messages; encoded as the `-1` length sentinel.
        name: Option<String>,
        text: String,
        player_id: i32,
    },
    Kick {
        reason: KickReason,
    },
    Upgrade {
        weapon: u8,
        player_id: i32,
    },
    WeaponSwitch {
        player_id: i32,
        weapon: u8,
    },
    BlockTap {
        position: i32,
    },
    BlockConfig {
        position: i32,
        data: u8,
    },
    EntityRequest {
        entity_id: i32,
        group: u8,
    },
    EntitySpawn {
        group: u8,
        entity_id: i32,
        state: Vec<u8>,
    },
    EntityDeath {
        group: u8,
        entity_id: i32,
    },
    AdminRequest {
        action: AdminAction,
        target_id: i32,
    },
    Trace(TraceSnapshot),
    EditLogRequest {
        x: i16,
        y: i16,
    },
    EditLogResponse {
        x: i16,
        y: i16,
        entries: Vec<EditLogRecord>,
    },
    RollbackRequest {
        steps: i32,
    },
    SyncBatch {
        timestamp: i64,
        group: u8,
        /// Bytes per record, the 4-byte entity id included. Lets a receiver
        /// skip a whole batch it does not recognize without parsing fields.
        record_width: u8,
        records: Vec<(i32, Vec<u8>)>,
    },
    StateSync {
        countdown: f32,
        time: f32,
        enemies: i16,
        wave: i16,
        timestamp: i64,
    },
}

impl Packet {
    pub fn tag(&self) -> u8 {
        match self {
            Packet::ConnectRequest { .. } => tag::CONNECT_REQUEST,
            Packet::ConnectConfirm => tag::CONNECT_CONFIRM,
            Packet::Disconnect { .. } => tag::DISCONNECT,
            Packet::Position { .. } => tag::POSITION,
            Packet::EntityShoot { .. } => tag::ENTITY_SHOOT,
            Packet::Place { .. } => tag::PLACE,
            Packet::Break { .. } => tag::BREAK,
            Packet::Chat { .. } => tag::CHAT,
            Packet::Kick { .. } => tag::KICK,
            Packet::Upgrade { .. } => tag::UPGRADE,
            Packet::WeaponSwitch { .. } => tag::WEAPON_SWITCH,
            Packet::BlockTap { .. } => tag::BLOCK_TAP,
            Packet::BlockConfig { .. } => tag::BLOCK_CONFIG,
            Packet::EntityRequest { .. } => tag::ENTITY_REQUEST,
            Packet::EntitySpawn { .. } => tag::ENTITY_SPAWN,
            Packet::EntityDeath { .. } => tag::ENTITY_DEATH,
            Packet::AdminRequest { .. } => tag::ADMIN_REQUEST,
            Packet::Trace(_) => tag::TRACE,
            Packet::EditLogRequest { .. } => tag::EDIT_LOG_REQUEST,
            Packet::EditLogResponse { .. } => tag::EDIT_LOG_RESPONSE,
            Packet::RollbackRequest { .. } => tag::ROLLBACK_REQUEST,
            Packet::SyncBatch { .. } => tag::SYNC_BATCH,
            Packet::StateSync { .. } => tag::STATE_SYNC,
        }
    }

    /// Encodes the packet body. The tag is carried by the frame, not the
    /// body; see [`frame`].
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            Packet::ConnectRequest {
                version,
                name,
                mobile,
                color,
                uuid,
            } => {
                w.put_i32(*version);
                w.put_string(name);
                w.put_bool(*mobile);
                w.put_i32(*color);
                w.put_bytes(uuid.as_bytes());
            }
            Packet::ConnectConfirm => {}
            Packet::Disconnect { player_id } => w.put_i32(*player_id),
            Packet::Position {
                player_id,
                timestamp,
                state,
            } => {
                w.put_i32(*player_id);
                w.put_i64(*timestamp);
                w.put_blob(state);
            }
            Packet::EntityShoot {
                group,
                entity_id,
                x,
                y,
                rotation,
                bullet,
                weapon,
            } => {
                w.put_u8(*group);
                w.put_i32(*entity_id);
                w.put_f32(*x);
                w.put_f32(*y);
                w.put_f32(*rotation);
                w.put_i16(*bullet);
                w.put_i16(*weapon);
            }
            Packet::Place {
                player_id,
                rotation,
                x,
                y,
                recipe,
            } => {
                w.put_i32(*player_id);
                w.put_u8(*rotation);
                w.put_i16(*x);
                w.put_i16(*y);
                w.put_u8(*recipe);
            }
            Packet::Break { player_id, x, y } => {
                w.put_i32(*player_id);
                w.put_i16(*x);
                w.put_i16(*y);
            }
            Packet::Chat {
                name,
                text,
                player_id,
            } => {
                w.put_opt_string(name.as_deref());
                w.put_string(text);
                w.put_i32(*player_id);
            }
            Packet::Kick { reason } => w.put_u8(*reason as u8),
            Packet::Upgrade { weapon, player_id } => {
                w.put_u8(*weapon);
                w.put_i32(*player_id);
            }
            Packet::WeaponSwitch { player_id, weapon } => {
                w.put_i32(*player_id);
                w.put_u8(*weapon);
            }
            Packet::BlockTap { position } => w.put_i32(*position),
            Packet::BlockConfig { position, data } => {
                w.put_i32(*position);
                w.put_u8(*data);
            }
            Packet::EntityRequest { entity_id, group } => {
                w.put_i32(*entity_id);
                w.put_u8(*group);
            }
            Packet::EntitySpawn {
                group,
                entity_id,
                state,
            } => {
                w.put_u8(*group);
                w.put_i32(*entity_id);
                w.put_blob(state);
            }
            Packet::EntityDeath { group, entity_id } => {
                w.put_u8(*group);
                w.put_i32(*entity_id);
            }
            Packet::AdminRequest { action, target_id } => {
                w.put_u8(*action as u8);
                w.put_i32(*target_id);
            }
            Packet::Trace(info) => {
                w.put_i32(info.player_id);
                w.put_string(&info.ip);
                w.put_bool(info.modified_client);
                w.put_bool(info.mobile);
                w.put_i32(info.total_blocks_broken);
                w.put_i32(info.structure_blocks_broken);
                w.put_i32(info.last_block_broken);
                w.put_i32(info.total_blocks_placed);
                w.put_i32(info.last_block_placed);
                w.put_bytes(info.uuid.as_bytes());
            }
            Packet::EditLogRequest { x, y } => {
                w.put_i16(*x);
                w.put_i16(*y);
            }
            Packet::EditLogResponse { x, y, entries } => {
                w.put_i16(*x);
                w.put_i16(*y);
                w.put_i32(entries.len() as i32);
                for entry in entries {
                    w.put_short_string(&entry.name);
                    w.put_i32(entry.block);
                    w.put_u8(entry.rotation);
                    w.put_u8(entry.action as u8);
                }
            }
            Packet::RollbackRequest { steps } => w.put_i32(*steps),
            Packet::SyncBatch {
                timestamp,
                group,
                record_width,
                records,
            } => {
                w.put_i64(*timestamp);
                w.put_u8(*group);
                w.put_u8(*record_width);
                for (id, state) in records {
                    w.put_i32(*id);
                    w.put_bytes(state);
                }
            }
            Packet::StateSync {
                countdown,
                time,
                enemies,
                wave,
                timestamp,
            } => {
                w.put_f32(*countdown);
                w.put_f32(*time);
                w.put_i16(*enemies);
                w.put_i16(*wave);
                w.put_i64(*timestamp);
            }
        }
        w.into_bytes()
    }

    /// Decodes a packet body given its tag. This match is the whole
    /// registry; there is no runtime type discovery behind it.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Packet, WireError> {
        let mut r = Reader::new(body);
        let packet = match tag {
            tag::CONNECT_REQUEST => Packet::ConnectRequest {
                version: r.get_i32()?,
                name: r.get_string()?,
                mobile: r.get_bool()?,
                color: r.get_i32()?,
                uuid: Uuid(r.get_array::<8>()?),
            },
            tag::CONNECT_CONFIRM => Packet::ConnectConfirm,
            tag::DISCONNECT => Packet::Disconnect {
                player_id: r.get_i32()?,
            },
            tag::POSITION => Packet::Position {
                player_id: r.get_i32()?,
                timestamp: r.get_i64()?,
                state: r.get_blob()?,
            },
            tag::ENTITY_SHOOT => Packet::EntityShoot {
                group: r.get_u8()?,
                entity_id: r.get_i32()?,
                x: r.get_f32()?,
                y: r.get_f32()?,
                rotation: r.get_f32()?,
                bullet: r.get_i16()?,
                weapon: r.get_i16()?,
            },
            tag::PLACE => Packet::Place {
                player_id: r.get_i32()?,
                rotation: r.get_u8()?,
                x: r.get_i16()?,
                y: r.get_i16()?,
                recipe: r.get_u8()?,
            },
            tag::BREAK => Packet::Break {
                player_id: r.get_i32()?,
                x: r.get_i16()?,
                y: r.get_i16()?,
            },
            tag::CHAT => Packet::Chat {
                name: r.get_opt_string()?,
                text: r.get_string()?,
                player_id: r.get_i32()?,
            },
            tag::KICK => {
                let value = r.get_u8()?;
                Packet::Kick {
                    reason: KickReason::from_u8(value).ok_or(WireError::BadEnum {
                        field: "kick reason",
                        value,
                    })?,
                }
            }
            tag::UPGRADE => Packet::Upgrade {
                weapon: r.get_u8()?,
                player_id: r.get_i32()?,
            },
            tag::WEAPON_SWITCH => Packet::WeaponSwitch {
                player_id: r.get_i32()?,
                weapon: r.get_u8()?,
            },
            tag::BLOCK_TAP => Packet::BlockTap {
                position: r.get_i32()?,
            },
            tag::BLOCK_CONFIG => Packet::BlockConfig {
                position: r.get_i32()?,
                data: r.get_u8()?,
            },
            tag::ENTITY_REQUEST => Packet::EntityRequest {
                entity_id: r.get_i32()?,
                group: r.get_u8()?,
            },
            tag::ENTITY_SPAWN => Packet::EntitySpawn {
                group: r.get_u8()?,
                entity_id: r.get_i32()?,
                state: r.get_blob()?,
            },
            tag::ENTITY_DEATH => Packet::EntityDeath {
                group: r.get_u8()?,
                entity_id: r.get_i32()?,
            },
            tag::ADMIN_REQUEST => {
                let value = r.get_u8()?;
                Packet::AdminRequest {
                    action: AdminAction::from_u8(value).ok_or(WireError::BadEnum {
                        field: "admin action",
                        value,
                    })?,
                    target_id: r.get_i32()?,
                }
            }
            tag::TRACE => Packet::Trace(TraceSnapshot {
                player_id: r.get_i32()?,
                ip: r.get_string()?,
                modified_client: r.get_bool()?,
                mobile: r.get_bool()?,
                total_blocks_broken: r.get_i32()?,
                structure_blocks_broken: r.get_i32()?,
                last_block_broken: r.get_i32()?,
                total_blocks_placed: r.get_i32()?,
                last_block_placed: r.get_i32()?,
                uuid: Uuid(r.get_array::<8>()?),
            }),
            tag::EDIT_LOG_REQUEST => Packet::EditLogRequest {
                x: r.get_i16()?,
                y: r.get_i16()?,
            },
            tag::EDIT_LOG_RESPONSE => {
                let x = r.get_i16()?;
                let y = r.get_i16()?;
                let count = r.get_i32()?;
                if count < 0 {
                    return Err(WireError::BadLength(count));
                }
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let name = r.get_short_string()?;
                    let block = r.get_i32()?;
                    let rotation = r.get_u8()?;
                    let value = r.get_u8()?;
                    let action = EditAction::from_u8(value).ok_or(WireError::BadEnum {
                        field: "edit action",
                        value,
                    })?;
                    entries.push(EditLogRecord {
                        name,
                        block,
                        rotation,
                        action,
                    });
                }
                Packet::EditLogResponse { x, y, entries }
            }
            tag::ROLLBACK_REQUEST => Packet::RollbackRequest {
                steps: r.get_i32()?,
            },
            tag::SYNC_BATCH => {
                let timestamp = r.get_i64()?;
                let group = r.get_u8()?;
                let record_width = r.get_u8()?;
                if record_width < 4 {
                    return Err(WireError::BadLength(record_width as i32));
                }
                let state_len = record_width as usize - 4;
                let mut records = Vec::new();
                while r.remaining() > 0 {
                    let id = r.get_i32()?;
                    let state = r.get_bytes(state_len)?;
                    records.push((id, state));
                }
                Packet::SyncBatch {
                    timestamp,
                    group,
                    record_width,
                    records,
                }
            }
            tag::STATE_SYNC => Packet::StateSync {
                countdown: r.get_f32()?,
                time: r.get_f32()?,
                enemies: r.get_i16()?,
                wave: r.get_i16()?,
                timestamp: r.get_i64()?,
            },
            other => return Err(WireError::UnknownTag(other)),
        };
        r.finish()?;
        Ok(packet)
    }
}

/// Frames a packet for the datagram channel: `[tag][body]`.
pub fn frame(packet: &Packet) -> Vec<u8> {
    let body = packet.encode();
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(packet.tag());
    out.extend_from_slice(&body);
    out
}

/// Parses a framed datagram back into a packet.
pub fn unframe(bytes: &[u8]) -> Result<Packet, WireError> {
    let (&tag, body) = bytes.split_first().ok_or(WireError::Truncated)?;
    Packet::decode(tag, body)
}

/// Frames a bulk byte stream (the world snapshot) with a `u32` length
/// prefix. Bulk transfers are unbounded and point-to-point, so they bypass
/// the datagram catalogue entirely.
pub fn frame_stream(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}
