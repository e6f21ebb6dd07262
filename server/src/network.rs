//! Single-consumer packet dispatch and the authoritative tick.
//!
//! Inbound events from the transport are funneled through one
//! [`ServerMessage`] channel so handlers run to completion against the
//! shared tables; every cross-connection effect leaves as an [`Outbound`]
//! on the outbound channel. Deferred kicks live in an explicit close queue
//! drained by the tick, guarded against connections that are already gone.

use crate::admin::Administration;
use crate::connection::{ConnId, ConnState, ConnectionManager, Player};
use crate::edit_log::EditLog;
use crate::game::{GameState, RecipeCatalog, TileAccess, PLAYER_GROUP};
use crate::limiter::{Cooldowns, FastFire, ShotVerdict, WeaponCatalog};
use crate::sync;
use log::{debug, error, info, warn};
use shared::packets::{frame_stream, unframe};
use shared::{AdminAction, EditAction, KickReason, Packet, Uuid, MAX_TEXT_LENGTH, VERSION_ANY};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Weapon every new player owns.
pub const STANDARD_WEAPON: u8 = 0;

/// Most recent edit-log entries returned per query; keeps the response
/// inside a single datagram no matter how contested the tile is.
pub const EDIT_LOG_RESPONSE_MAX: usize = 128;

/// Inbound events funneled from transport tasks into the dispatch loop.
#[derive(Debug)]
pub enum ServerMessage {
    Connected { id: ConnId, address: String },
    PacketReceived { id: ConnId, bytes: Vec<u8> },
    Disconnected { id: ConnId },
    Shutdown,
}

/// Outbound effects emitted by handlers; the transport realizes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Unicast {
        id: ConnId,
        packet: Packet,
    },
    Broadcast {
        packet: Packet,
        exclude: Option<ConnId>,
    },
    /// Bulk point-to-point byte stream, already length-framed.
    Stream {
        id: ConnId,
        bytes: Vec<u8>,
    },
    Close {
        id: ConnId,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Protocol build version; `VERSION_ANY` disables the check server-side.
    pub version: i32,
    pub max_text_length: usize,
    pub kick_grace_ms: u64,
    pub chat_cooldown_ms: u64,
    pub edit_cooldown_ms: u64,
    pub edit_warning_cooldown_ms: u64,
    pub admin_store: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            max_text_length: MAX_TEXT_LENGTH,
            kick_grace_ms: 200,
            chat_cooldown_ms: 500,
            edit_cooldown_ms: 500,
            edit_warning_cooldown_ms: 2_000,
            admin_store: None,
        }
    }
}

/// Deferred close queue entry; idempotent if the connection disappears
/// before the deadline.
#[derive(Debug)]
struct ScheduledClose {
    id: ConnId,
    deadline_ms: u64,
}

/// The authoritative server core. One logical writer owns every table;
/// handlers never block on another connection.
pub struct Server {
    cfg: ServerConfig,
    pub conns: ConnectionManager,
    pub admins: Administration,
    pub game: GameState,
    pub edit_log: EditLog,
    cooldowns: Cooldowns,
    fast_fire: FastFire,
    weapons: WeaponCatalog,
    recipes: RecipeCatalog,
    pending_closes: Vec<ScheduledClose>,
    out_tx: mpsc::UnboundedSender<Outbound>,
}

impl Server {
    pub fn new(
        cfg: ServerConfig,
        game: GameState,
        weapons: WeaponCatalog,
        recipes: RecipeCatalog,
        out_tx: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        let admins = Administration::new(cfg.admin_store.clone());
        Self {
            cfg,
            conns: ConnectionManager::new(),
            admins,
            game,
            edit_log: EditLog::new(),
            cooldowns: Cooldowns::new(),
            fast_fire: FastFire::new(),
            weapons,
            recipes,
            pending_closes: Vec::new(),
            out_tx,
        }
    }

    /// Entry point for every inbound transport event.
    pub fn handle_message(&mut self, message: ServerMessage, now_ms: u64) {
        match message {
            ServerMessage::Connected { id, address } => {
                self.on_transport_connect(id, address, now_ms)
            }
            ServerMessage::PacketReceived { id, bytes } => match unframe(&bytes) {
                Ok(packet) => self.handle_packet(id, packet, now_ms),
                Err(e) => {
                    // Protocol violation: drop the connection, never the tick.
                    warn!("Protocol error from connection {}: {}", id, e);
                    self.drop_connection(id);
                }
            },
            ServerMessage::Disconnected { id } => self.on_disconnect(id),
            ServerMessage::Shutdown => {}
        }
    }

    /// Advances the authoritative tick: flushes due deferred closes and
    /// runs the two sync schedules.
    pub fn tick(&mut self, now_ms: u64) {
        self.game.tick += 1;
        self.flush_closes(now_ms);

        if self.game.tick % sync::ENTITY_SYNC_INTERVAL_TICKS == 0 && self.conns.active_count() > 0
        {
            for packet in sync::build_all_batches(&self.game, now_ms as i64) {
                self.broadcast(packet, None);
            }
        }
        if self.game.tick % sync::STATE_SYNC_INTERVAL_TICKS == 0 && self.conns.active_count() > 0 {
            self.broadcast(sync::build_state_sync(&self.game, now_ms as i64), None);
        }
    }

    fn handle_packet(&mut self, id: ConnId, packet: Packet, now_ms: u64) {
        match packet {
            Packet::ConnectRequest {
                version,
                name,
                mobile,
                color,
                uuid,
            } => self.on_connect_request(id, version, name, mobile, color, uuid, now_ms),
            Packet::ConnectConfirm => self.on_confirm(id),
            Packet::Position {
                timestamp: _,
                state,
                ..
            } => self.on_position(id, state),
            Packet::EntityShoot {
                group,
                x,
                y,
                rotation,
                bullet,
                weapon,
                ..
            } => self.on_shoot(id, group, x, y, rotation, bullet, weapon, now_ms),
            Packet::Place {
                rotation,
                x,
                y,
                recipe,
                ..
            } => self.on_place(id, rotation, x, y, recipe, now_ms),
            Packet::Break { x, y, .. } => self.on_break(id, x, y, now_ms),
            Packet::Chat { text, .. } => self.on_chat(id, text, now_ms),
            Packet::Upgrade { weapon, .. } => self.on_upgrade(id, weapon),
            Packet::WeaponSwitch { weapon, .. } => self.on_weapon_switch(id, weapon),
            Packet::BlockTap { position } => self.relay_except(id, Packet::BlockTap { position }),
            Packet::BlockConfig { position, data } => {
                self.relay_except(id, Packet::BlockConfig { position, data })
            }
            Packet::EntityRequest { entity_id, group } => {
                self.on_entity_request(id, entity_id, group)
            }
            Packet::EntityDeath { .. } => self.on_entity_death(id),
            Packet::AdminRequest { action, target_id } => {
                self.on_admin_request(id, action, target_id, now_ms)
            }
            Packet::EditLogRequest { x, y } => self.on_edit_log_request(id, x, y),
            Packet::RollbackRequest { steps } => self.on_rollback_request(id, steps),
            // Server-to-client kinds arriving inbound reference nothing we
            // track; log and ignore.
            other => debug!(
                "Ignoring unexpected inbound packet tag {} from connection {}",
                other.tag(),
                id
            ),
        }
    }

    fn on_transport_connect(&mut self, id: ConnId, address: String, now_ms: u64) {
        self.conns.register(id, address.clone());
        if self.admins.is_ip_banned(&address) {
            self.kick(id, KickReason::Banned, now_ms);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_connect_request(
        &mut self,
        id: ConnId,
        version: i32,
        name: String,
        mobile: bool,
        color: i32,
        uuid: Uuid,
        now_ms: u64,
    ) {
        let Some(conn) = self.conns.get(id) else {
            warn!("Handshake from unknown connection {}", id);
            return;
        };
        if conn.state != ConnState::PendingHandshake {
            debug!("Duplicate handshake from connection {}", id);
            return;
        }
        let address = conn.address.clone();

        {
            let trace = self.admins.trace_mut(uuid);
            trace.ip = address.clone();
            trace.mobile = mobile;
        }

        if self.admins.is_ip_banned(&address) || self.admins.is_id_banned(uuid) {
            self.kick_identified(id, uuid, KickReason::Banned, now_ms);
            return;
        }
        if self.admins.recently_kicked(uuid, now_ms) {
            self.kick_identified(id, uuid, KickReason::RecentKick, now_ms);
            return;
        }
        if self.conns.name_in_use(&name) {
            self.kick_identified(id, uuid, KickReason::NameInUse, now_ms);
            return;
        }

        info!(
            "Received connect request for player '{}' / UUID {} / IP {}",
            name, uuid, address
        );
        self.admins.update_player_joined(uuid, &address, &name);

        if version != self.cfg.version && self.cfg.version != VERSION_ANY && version != VERSION_ANY
        {
            let reason = if version > self.cfg.version {
                KickReason::ServerOutdated
            } else {
                KickReason::ClientOutdated
            };
            self.kick_identified(id, uuid, reason, now_ms);
            return;
        }
        if version == VERSION_ANY {
            self.admins.trace_mut(uuid).modified_client = true;
        }

        let player = Player {
            id: 0,
            name,
            uuid,
            is_admin: self.admins.is_admin(uuid),
            color,
            mobile,
            team: 0,
            weapons: vec![STANDARD_WEAPON],
            current_weapon: STANDARD_WEAPON,
        };
        let Some(player_id) = self.conns.bind_player(id, player) else {
            warn!("Failed to bind player on connection {}", id);
            return;
        };
        self.admins.trace_mut(uuid).player_id = player_id;

        // The full world snapshot is a one-time point-to-point stream,
        // outside the datagram catalogue.
        let snapshot = self.game.world.snapshot();
        debug!("Packed {} bytes of world snapshot", snapshot.len());
        self.send(Outbound::Stream {
            id,
            bytes: frame_stream(&snapshot),
        });
    }

    fn on_confirm(&mut self, id: ConnId) {
        let Some(player) = self.conns.activate(id) else {
            debug!("Confirm from connection {} not awaiting one", id);
            return;
        };
        let player_id = player.id;
        let name = player.name.clone();

        // The player entity joins the sync set with a blank state blob
        // until its first position update arrives.
        let state_len = self.game.player_group_mut().state_len();
        self.game
            .player_group_mut()
            .upsert(player_id, vec![0; state_len]);

        info!("{} has connected", name);
        self.broadcast(system_chat(format!("{} has connected.", name)), Some(id));
    }

    fn on_disconnect(&mut self, id: ConnId) {
        let Some(conn) = self.conns.remove(id) else {
            warn!("Unknown connection {} has disconnected", id);
            return;
        };
        self.teardown(conn.player, conn.activated);
    }

    /// Shared teardown for disconnects, protocol drops, and elapsed kicks.
    fn teardown(&mut self, player: Option<Player>, announced: bool) {
        let Some(player) = player else { return };
        self.game.player_group_mut().remove(player.id);
        self.fast_fire.forget(player.uuid);
        if announced {
            info!("{} has disconnected", player.name);
            self.broadcast(
                system_chat(format!("{} has disconnected.", player.name)),
                None,
            );
            self.broadcast(Packet::Disconnect { player_id: player.id }, None);
        }
        self.persist_admins();
    }

    fn on_position(&mut self, id: ConnId, state: Vec<u8>) {
        let Some(player_id) = self.active_player_id(id) else {
            return;
        };
        self.game.player_group_mut().upsert(player_id, state);
    }

    #[allow(clippy::too_many_arguments)]
    fn on_shoot(
        &mut self,
        id: ConnId,
        group: u8,
        x: f32,
        y: f32,
        rotation: f32,
        bullet: i16,
        weapon: i16,
        now_ms: u64,
    ) {
        let Some(player) = self.active_player(id) else {
            return;
        };
        let (player_id, uuid) = (player.id, player.uuid);
        let weapon_id = weapon as u8;

        if !player.weapons.contains(&weapon_id) {
            debug!("Player {} fired unowned weapon {}", player_id, weapon_id);
            return;
        }
        let Some(weapon_def) = self.weapons.get(weapon_id).copied() else {
            debug!("Shot with unknown weapon {}", weapon_id);
            return;
        };

        let trace = self.admins.trace_mut(uuid);
        let violations = trace.fast_shots.entry(weapon_id).or_insert(0);
        let verdict = self
            .fast_fire
            .record_shot(uuid, &weapon_def, violations, now_ms);
        if verdict == ShotVerdict::Exceeded {
            self.kick(id, KickReason::FastShoot, now_ms);
            return;
        }

        self.broadcast(
            Packet::EntityShoot {
                group,
                entity_id: player_id,
                x,
                y,
                rotation,
                bullet,
                weapon,
            },
            Some(id),
        );
    }

    fn on_place(&mut self, id: ConnId, rotation: u8, x: i16, y: i16, recipe: u8, now_ms: u64) {
        let Some(player) = self.active_player(id) else {
            return;
        };
        let (player_id, uuid, name) = (player.id, player.uuid, player.name.clone());

        if !self.game.world.in_bounds(x, y) {
            debug!("Out-of-bounds place at ({}, {}) by {}", x, y, name);
            return;
        }
        let Some(block) = self.recipes.block_for(recipe) else {
            debug!("Place with unknown recipe {} by {}", recipe, name);
            return;
        };

        if self.game.world.is_synthetic(x, y) && !self.edit_allowed(uuid, now_ms) {
            self.warn_edit_throttled(id, "replacing", now_ms);
            return;
        }

        self.game.world.set_block(x, y, block, rotation);
        self.edit_log
            .append(x, y, &name, block, rotation, EditAction::Place);

        let trace = self.admins.trace_mut(uuid);
        trace.last_block_placed = block;
        trace.total_blocks_placed += 1;
        self.admins.info_mut(uuid).blocks_placed += 1;

        self.broadcast(
            Packet::Place {
                player_id,
                rotation,
                x,
                y,
                recipe,
            },
            None,
        );
    }

    fn on_break(&mut self, id: ConnId, x: i16, y: i16, now_ms: u64) {
        let Some(player) = self.active_player(id) else {
            return;
        };
        let (player_id, uuid, name) = (player.id, player.uuid, player.name.clone());

        if !self.game.world.in_bounds(x, y) {
            debug!("Out-of-bounds break at ({}, {}) by {}", x, y, name);
            return;
        }

        if self.game.world.is_synthetic(x, y) && !self.edit_allowed(uuid, now_ms) {
            self.warn_edit_throttled(id, "breaking", now_ms);
            return;
        }

        // Only tracked (player-built) tiles produce a log entry; natural
        // terrain is the simulation's concern.
        if let Some(tile) = self.game.world.tile(x, y).copied() {
            self.edit_log
                .append(x, y, &name, tile.block, tile.rotation, EditAction::Break);
            self.game.world.clear_block(x, y);

            let trace = self.admins.trace_mut(uuid);
            trace.last_block_broken = tile.block;
            trace.total_blocks_broken += 1;
            if tile.synthetic {
                trace.structure_blocks_broken += 1;
            }
            self.admins.info_mut(uuid).blocks_broken += 1;
        }

        self.broadcast(Packet::Break { player_id, x, y }, None);
    }

    fn on_chat(&mut self, id: ConnId, text: String, now_ms: u64) {
        let Some(player) = self.active_player(id) else {
            return;
        };
        let (player_id, name) = (player.id, player.name.clone());

        if !self
            .cooldowns
            .ready(format!("chat-{}", id), self.cfg.chat_cooldown_ms, now_ms)
        {
            // The flood warning gets its own window so dropped messages
            // cannot be used to spam the sender with warnings.
            if self.cooldowns.ready(
                format!("chat-warn-{}", id),
                self.cfg.chat_cooldown_ms,
                now_ms,
            ) {
                self.unicast(id, system_chat("You are sending messages too quickly."));
            }
            return;
        }
        if text.len() > self.cfg.max_text_length {
            self.unicast(id, system_chat("That message is too long."));
            return;
        }

        self.broadcast(
            Packet::Chat {
                name: Some(name),
                text,
                player_id,
            },
            None,
        );
    }

    fn on_upgrade(&mut self, id: ConnId, weapon: u8) {
        if self.weapons.get(weapon).is_none() {
            debug!("Upgrade to unknown weapon {}", weapon);
            return;
        }
        let Some(conn) = self.conns.get_mut(id) else {
            return;
        };
        if conn.state != ConnState::Active {
            return;
        }
        let Some(player) = conn.player.as_mut() else {
            return;
        };
        if player.weapons.contains(&weapon) {
            return;
        }
        player.weapons.push(weapon);
        let player_id = player.id;
        self.broadcast(Packet::Upgrade { weapon, player_id }, None);
    }

    fn on_weapon_switch(&mut self, id: ConnId, weapon: u8) {
        let Some(conn) = self.conns.get_mut(id) else {
            return;
        };
        if conn.state != ConnState::Active {
            return;
        }
        let Some(player) = conn.player.as_mut() else {
            return;
        };
        player.current_weapon = weapon;
        let player_id = player.id;
        self.broadcast(Packet::WeaponSwitch { player_id, weapon }, Some(id));
    }

    fn on_entity_request(&mut self, id: ConnId, entity_id: i32, group_id: u8) {
        let Some(group) = self.game.group(group_id) else {
            debug!("Entity request for unknown group {}", group_id);
            return;
        };
        if let Some(entity) = group.get(entity_id) {
            let packet = Packet::EntitySpawn {
                group: group_id,
                entity_id,
                state: entity.state.clone(),
            };
            self.unicast(id, packet);
        }
    }

    fn on_entity_death(&mut self, id: ConnId) {
        let Some(player_id) = self.active_player_id(id) else {
            return;
        };
        self.broadcast(
            Packet::EntityDeath {
                group: PLAYER_GROUP,
                entity_id: player_id,
            },
            Some(id),
        );
    }

    fn on_admin_request(&mut self, id: ConnId, action: AdminAction, target_id: i32, now_ms: u64) {
        let Some(conn) = self.conns.get(id).filter(|c| c.state == ConnState::Active) else {
            return;
        };
        let Some(player) = conn.player.as_ref() else {
            return;
        };
        let requester_name = player.name.clone();
        if !player.is_admin {
            // Silently denied: logged only, no reply, no state change.
            error!(
                "ACCESS DENIED: player {} / {} attempted admin action without privilege",
                requester_name, conn.address
            );
            return;
        }

        let Some((target_conn, target)) = self.conns.player_by_id(target_id) else {
            error!(
                "{} attempted admin action on nonexistent player {}",
                requester_name, target_id
            );
            return;
        };
        if target.is_admin {
            error!(
                "{} attempted admin action on privileged player {}",
                requester_name, target.name
            );
            return;
        }
        let target_name = target.name.clone();
        let target_uuid = target.uuid;
        let target_address = self
            .conns
            .get(target_conn)
            .map(|c| c.address.clone())
            .unwrap_or_default();

        match action {
            AdminAction::Ban => {
                self.admins.ban_ip(&target_address);
                self.admins.ban_id(target_uuid);
                self.kick(target_conn, KickReason::Banned, now_ms);
                info!("{} has banned {}", requester_name, target_name);
            }
            AdminAction::Kick => {
                self.kick(target_conn, KickReason::Kick, now_ms);
                info!("{} has kicked {}", requester_name, target_name);
            }
            AdminAction::Trace => {
                let snapshot = self.admins.trace_mut(target_uuid).snapshot(target_uuid);
                self.unicast(id, Packet::Trace(snapshot));
                info!(
                    "{} has requested trace info of {}",
                    requester_name, target_name
                );
            }
        }
    }

    fn on_edit_log_request(&mut self, id: ConnId, x: i16, y: i16) {
        if self.active_player_id(id).is_none() {
            return;
        }
        let mut entries = self.edit_log.records_at(x, y);
        if entries.len() > EDIT_LOG_RESPONSE_MAX {
            entries.drain(..entries.len() - EDIT_LOG_RESPONSE_MAX);
        }
        self.unicast(id, Packet::EditLogResponse { x, y, entries });
    }

    fn on_rollback_request(&mut self, id: ConnId, steps: i32) {
        let Some(player) = self.active_player(id) else {
            return;
        };
        let name = player.name.clone();
        if !player.is_admin {
            error!(
                "ACCESS DENIED: player {} attempted a rollback without privilege",
                name
            );
            return;
        }
        if steps < 0 {
            debug!("Negative rollback request from {}", name);
            return;
        }
        let applied = self.edit_log.rollback(steps as usize, &mut self.game.world);
        info!("{} has rolled back the world {} steps", name, applied);
    }

    /// Kicks a connection: typed notice, then close after the grace delay.
    pub fn kick(&mut self, id: ConnId, reason: KickReason, now_ms: u64) {
        let uuid = self
            .conns
            .get(id)
            .and_then(|c| c.player.as_ref())
            .map(|p| p.uuid);
        self.kick_inner(id, reason, uuid, now_ms);
    }

    /// Kick during handshake, before a player is bound, when the identity
    /// is known only from the connect packet.
    fn kick_identified(&mut self, id: ConnId, uuid: Uuid, reason: KickReason, now_ms: u64) {
        self.kick_inner(id, reason, Some(uuid), now_ms);
    }

    fn kick_inner(&mut self, id: ConnId, reason: KickReason, uuid: Option<Uuid>, now_ms: u64) {
        let Some(conn) = self.conns.get(id) else {
            warn!("Cannot kick unknown connection {}", id);
            return;
        };
        if conn.state == ConnState::Kicked {
            return;
        }
        info!(
            "Kicking connection {} / IP: {}. Reason: {:?}",
            id, conn.address, reason
        );

        if matches!(reason, KickReason::Kick | KickReason::Banned) {
            if let Some(uuid) = uuid {
                self.admins.note_kicked(uuid, now_ms);
            }
        }

        self.unicast(id, Packet::Kick { reason });
        self.conns.mark_kicked(id);
        self.pending_closes.push(ScheduledClose {
            id,
            deadline_ms: now_ms + self.cfg.kick_grace_ms,
        });
        self.persist_admins();
    }

    /// Immediate teardown for protocol violations.
    fn drop_connection(&mut self, id: ConnId) {
        if let Some(conn) = self.conns.remove(id) {
            self.send(Outbound::Close { id });
            self.teardown(conn.player, conn.activated);
        }
    }

    fn flush_closes(&mut self, now_ms: u64) {
        let due: Vec<ConnId> = self
            .pending_closes
            .iter()
            .filter(|c| c.deadline_ms <= now_ms)
            .map(|c| c.id)
            .collect();
        self.pending_closes.retain(|c| c.deadline_ms > now_ms);

        for id in due {
            // Guard: the connection may already be gone; closing twice is
            // a no-op.
            if let Some(conn) = self.conns.remove(id) {
                self.send(Outbound::Close { id });
                self.teardown(conn.player, conn.activated);
            }
        }
    }

    fn edit_allowed(&mut self, uuid: Uuid, now_ms: u64) -> bool {
        self.cooldowns.ready(
            format!("edit-{}", uuid),
            self.cfg.edit_cooldown_ms,
            now_ms,
        )
    }

    /// The anti-grief warning has its own, longer cooldown so the warning
    /// itself cannot be spammed.
    fn warn_edit_throttled(&mut self, id: ConnId, verb: &str, now_ms: u64) {
        if self.cooldowns.ready(
            format!("edit-warn-{}", id),
            self.cfg.edit_warning_cooldown_ms,
            now_ms,
        ) {
            self.unicast(
                id,
                system_chat(format!(
                    "Anti-grief: you are {} blocks too quickly.",
                    verb
                )),
            );
        }
    }

    fn active_player(&self, id: ConnId) -> Option<&Player> {
        self.conns
            .get(id)
            .filter(|c| c.state == ConnState::Active)
            .and_then(|c| c.player.as_ref())
            .or_else(|| {
                debug!("Packet references connection {} with no active player", id);
                None
            })
    }

    fn active_player_id(&self, id: ConnId) -> Option<i32> {
        self.active_player(id).map(|p| p.id)
    }

    fn relay_except(&mut self, id: ConnId, packet: Packet) {
        if self.active_player_id(id).is_none() {
            return;
        }
        self.broadcast(packet, Some(id));
    }

    fn persist_admins(&self) {
        if let Err(e) = self.admins.save() {
            warn!("Failed to persist moderation store: {}", e);
        }
    }

    fn unicast(&self, id: ConnId, packet: Packet) {
        self.send(Outbound::Unicast { id, packet });
    }

    fn broadcast(&self, packet: Packet, exclude: Option<ConnId>) {
        self.send(Outbound::Broadcast { packet, exclude });
    }

    fn send(&self, out: Outbound) {
        if self.out_tx.send(out).is_err() {
            debug!("Outbound channel closed; dropping packet");
        }
    }
}

/// Server-originated chat line with the `-1` sentinel player id.
fn system_chat(text: impl Into<String>) -> Packet {
    Packet::Chat {
        name: None,
        text: text.into(),
        player_id: -1,
    }
}
