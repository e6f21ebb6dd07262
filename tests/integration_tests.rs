//! Integration tests for the session server
//!
//! These drive full scenarios through the dispatch core the way the
//! transport would, and check the wire protocol across crate boundaries.

use server::admin::KICK_COOLDOWN_MS;
use server::connection::{ConnId, ConnState};
use server::game::{EntityGroup, GameState, RecipeCatalog, WorldMap, PLAYER_GROUP};
use server::limiter::{Weapon, WeaponCatalog};
use server::network::{Outbound, Server, ServerConfig, ServerMessage, STANDARD_WEAPON};
use shared::packets::{frame, unframe};
use shared::{AdminAction, KickReason, Packet, Uuid};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn new_server() -> (Server, UnboundedReceiver<Outbound>) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let mut weapons = WeaponCatalog::new();
    weapons.insert(Weapon {
        id: STANDARD_WEAPON,
        reload_ms: 400,
    });
    let mut recipes = RecipeCatalog::new();
    recipes.insert(1, 100);
    let game = GameState::new(WorldMap::new(64, 64));
    let server = Server::new(ServerConfig::default(), game, weapons, recipes, out_tx);
    (server, out_rx)
}

fn drain(out_rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(o) = out_rx.try_recv() {
        out.push(o);
    }
    out
}

fn send(server: &mut Server, id: ConnId, packet: &Packet, now: u64) {
    server.handle_message(
        ServerMessage::PacketReceived {
            id,
            bytes: frame(packet),
        },
        now,
    );
}

fn open(server: &mut Server, id: ConnId, now: u64) {
    server.handle_message(
        ServerMessage::Connected {
            id,
            address: format!("10.0.0.{}", id),
        },
        now,
    );
}

fn handshake(server: &mut Server, id: ConnId, name: &str, uuid_byte: u8, now: u64) {
    open(server, id, now);
    send(
        server,
        id,
        &Packet::ConnectRequest {
            version: 1,
            name: name.to_string(),
            mobile: false,
            color: 0,
            uuid: Uuid([uuid_byte; 8]),
        },
        now,
    );
    send(server, id, &Packet::ConnectConfirm, now);
}

fn kicks(outbound: &[Outbound]) -> Vec<(ConnId, KickReason)> {
    outbound
        .iter()
        .filter_map(|o| match o {
            Outbound::Unicast {
                id,
                packet: Packet::Kick { reason },
            } => Some((*id, *reason)),
            _ => None,
        })
        .collect()
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    #[test]
    fn representative_packets_survive_the_frame_roundtrip() {
        let packets = vec![
            Packet::ConnectRequest {
                version: 3,
                name: "Ace".to_string(),
                mobile: true,
                color: 0x00FF_00FF,
                uuid: Uuid([1, 2, 3, 4, 5, 6, 7, 8]),
            },
            Packet::ConnectConfirm,
            Packet::Kick {
                reason: KickReason::NameInUse,
            },
            Packet::Chat {
                name: None,
                text: "server says hi".to_string(),
                player_id: -1,
            },
            Packet::Place {
                player_id: 4,
                rotation: 3,
                x: -2,
                y: 17,
                recipe: 1,
            },
            Packet::SyncBatch {
                timestamp: 1_234_567,
                group: 0,
                record_width: 8,
                records: vec![(1, vec![0xAA; 4]), (2, vec![0xBB; 4])],
            },
        ];
        for packet in packets {
            let decoded = unframe(&frame(&packet)).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn truncated_frames_are_rejected() {
        let bytes = frame(&Packet::ConnectRequest {
            version: 1,
            name: "Ace".to_string(),
            mobile: false,
            color: 0,
            uuid: Uuid([9; 8]),
        });
        for cut in 1..bytes.len() {
            assert!(unframe(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[test]
    fn two_players_with_the_same_name_one_survives() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        open(&mut server, 2, 1_100);
        send(
            &mut server,
            2,
            &Packet::ConnectRequest {
                version: 1,
                name: "ace".to_string(),
                mobile: false,
                color: 0,
                uuid: Uuid([2; 8]),
            },
            1_100,
        );

        assert_eq!(kicks(&drain(&mut out_rx)), vec![(2, KickReason::NameInUse)]);
        assert_eq!(server.conns.get(1).unwrap().state, ConnState::Active);
        assert_eq!(server.game.group(PLAYER_GROUP).unwrap().len(), 1);
    }

    #[test]
    fn kick_cooldown_expires_after_thirty_seconds() {
        let (mut server, mut out_rx) = new_server();
        server.admins.grant_admin(Uuid([1; 8]));
        handshake(&mut server, 1, "Ace", 1, 1_000);
        handshake(&mut server, 2, "Bandit", 2, 1_000);
        drain(&mut out_rx);

        send(
            &mut server,
            1,
            &Packet::AdminRequest {
                action: AdminAction::Kick,
                target_id: 2,
            },
            10_000,
        );
        assert_eq!(kicks(&drain(&mut out_rx)), vec![(2, KickReason::Kick)]);

        // Reconnecting inside the cooldown is refused.
        open(&mut server, 3, 15_000);
        send(
            &mut server,
            3,
            &Packet::ConnectRequest {
                version: 1,
                name: "Bandit".to_string(),
                mobile: false,
                color: 0,
                uuid: Uuid([2; 8]),
            },
            15_000,
        );
        assert_eq!(
            kicks(&drain(&mut out_rx)),
            vec![(3, KickReason::RecentKick)]
        );

        // After the window the same identity joins normally.
        handshake(&mut server, 4, "Bandit", 2, 10_000 + KICK_COOLDOWN_MS);
        assert_eq!(server.conns.get(4).unwrap().state, ConnState::Active);
    }

    #[test]
    fn admin_ban_outlives_the_connection() {
        let (mut server, mut out_rx) = new_server();
        server.admins.grant_admin(Uuid([1; 8]));
        handshake(&mut server, 1, "Ace", 1, 1_000);
        handshake(&mut server, 2, "Bandit", 2, 1_000);
        drain(&mut out_rx);

        send(
            &mut server,
            1,
            &Packet::AdminRequest {
                action: AdminAction::Ban,
                target_id: 2,
            },
            5_000,
        );
        assert_eq!(kicks(&drain(&mut out_rx)), vec![(2, KickReason::Banned)]);

        // Same identity from a new address: still banned.
        open(&mut server, 3, 200_000);
        send(
            &mut server,
            3,
            &Packet::ConnectRequest {
                version: 1,
                name: "NotBandit".to_string(),
                mobile: false,
                color: 0,
                uuid: Uuid([2; 8]),
            },
            200_000,
        );
        assert_eq!(kicks(&drain(&mut out_rx)), vec![(3, KickReason::Banned)]);

        // Same address with a fresh identity: also still banned.
        server.handle_message(
            ServerMessage::Connected {
                id: 4,
                address: "10.0.0.2".to_string(),
            },
            200_000,
        );
        assert_eq!(kicks(&drain(&mut out_rx)), vec![(4, KickReason::Banned)]);
    }

    #[test]
    fn kicked_connection_closes_after_grace_despite_more_packets() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        server.kick(1, KickReason::Kick, 2_000);
        send(
            &mut server,
            1,
            &Packet::Chat {
                name: None,
                text: "wait".to_string(),
                player_id: 0,
            },
            2_050,
        );
        server.tick(2_100);
        assert!(server.conns.contains(1));

        server.tick(2_250);
        assert!(!server.conns.contains(1));
        assert!(drain(&mut out_rx)
            .iter()
            .any(|o| matches!(o, Outbound::Close { id: 1 })));
    }
}

/// SYNCHRONIZATION TESTS
mod sync_tests {
    use super::*;

    fn batches_in(outbound: &[Outbound]) -> Vec<usize> {
        outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Broadcast {
                    packet: Packet::SyncBatch { records, .. },
                    ..
                } => Some(records.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn entity_sync_splits_large_groups_into_capped_batches() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        let mut enemies = EntityGroup::new(2, true, 6);
        for i in 0..130 {
            enemies.upsert(i, vec![0; 6]);
        }
        server.game.add_group(enemies);

        for _ in 0..4 {
            server.tick(2_000);
        }
        let sizes = batches_in(&drain(&mut out_rx));
        // One partial player batch plus ceil(130 / 64) enemy batches.
        assert_eq!(sizes, vec![1, 64, 64, 2]);
    }

    #[test]
    fn non_syncable_groups_never_hit_the_wire() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        let mut bullets = EntityGroup::new(3, false, 4);
        bullets.upsert(1, vec![0; 4]);
        server.game.add_group(bullets);

        for _ in 0..4 {
            server.tick(2_000);
        }
        let out = drain(&mut out_rx);
        assert!(!out.iter().any(|o| matches!(
            o,
            Outbound::Broadcast {
                packet: Packet::SyncBatch { group: 3, .. },
                ..
            }
        )));
    }

    #[test]
    fn position_updates_flow_into_the_next_entity_sync() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        let state_len = server.game.group(PLAYER_GROUP).unwrap().record_width as usize - 4;
        let state = vec![7u8; state_len];
        send(
            &mut server,
            1,
            &Packet::Position {
                player_id: 0,
                timestamp: 1_500,
                state: state.clone(),
            },
            1_500,
        );

        for _ in 0..4 {
            server.tick(2_000);
        }
        let out = drain(&mut out_rx);
        let synced = out.iter().find_map(|o| match o {
            Outbound::Broadcast {
                packet: Packet::SyncBatch { records, .. },
                ..
            } => Some(records.clone()),
            _ => None,
        });
        assert_eq!(synced.unwrap(), vec![(1, state)]);
    }
}

/// WORLD EDIT TESTS
mod edit_tests {
    use super::*;

    #[test]
    fn rollback_undoes_exactly_the_requested_steps() {
        let (mut server, mut out_rx) = new_server();
        server.admins.grant_admin(Uuid([1; 8]));
        handshake(&mut server, 1, "Ace", 1, 1_000);

        // Three placements at distinct coordinates, spaced past the edit
        // cooldown so none are throttled.
        for (i, x) in [(0u64, 1i16), (1, 2), (2, 3)] {
            send(
                &mut server,
                1,
                &Packet::Place {
                    player_id: 0,
                    rotation: 0,
                    x,
                    y: 1,
                    recipe: 1,
                },
                5_000 + i * 1_000,
            );
        }
        assert_eq!(server.edit_log.len(), 3);

        let placed = drain(&mut out_rx)
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    Outbound::Broadcast {
                        packet: Packet::Place { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(placed, 3);

        send(&mut server, 1, &Packet::RollbackRequest { steps: 2 }, 9_000);
        assert!(server.game.world.tile(1, 1).is_some());
        assert!(server.game.world.tile(2, 1).is_none());
        assert!(server.game.world.tile(3, 1).is_none());
    }

    #[test]
    fn edit_log_survives_the_editor_disconnecting() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        handshake(&mut server, 2, "Bandit", 2, 1_000);
        drain(&mut out_rx);

        send(
            &mut server,
            1,
            &Packet::Place {
                player_id: 0,
                rotation: 0,
                x: 9,
                y: 9,
                recipe: 1,
            },
            5_000,
        );
        server.handle_message(ServerMessage::Disconnected { id: 1 }, 6_000);
        drain(&mut out_rx);

        send(&mut server, 2, &Packet::EditLogRequest { x: 9, y: 9 }, 7_000);
        let out = drain(&mut out_rx);
        match &out[0] {
            Outbound::Unicast {
                id: 2,
                packet: Packet::EditLogResponse { entries, .. },
            } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "Ace");
            }
            other => panic!("unexpected outbound {:?}", other),
        }
    }
}

/// FAIRNESS TESTS
mod fairness_tests {
    use super::*;

    #[test]
    fn sustained_fast_fire_ends_in_a_kick() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        let shot = Packet::EntityShoot {
            group: PLAYER_GROUP,
            entity_id: 0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            bullet: 0,
            weapon: STANDARD_WEAPON as i16,
        };
        let budget = Weapon {
            id: STANDARD_WEAPON,
            reload_ms: 400,
        }
        .violation_budget();

        let mut now = 10_000;
        for _ in 0..=budget {
            send(&mut server, 1, &shot, now);
            now += 1;
        }
        assert!(kicks(&drain(&mut out_rx)).is_empty());

        send(&mut server, 1, &shot, now);
        assert_eq!(
            kicks(&drain(&mut out_rx)),
            vec![(1, KickReason::FastShoot)]
        );
    }

    #[test]
    fn legitimate_fire_rate_is_never_punished() {
        let (mut server, mut out_rx) = new_server();
        handshake(&mut server, 1, "Ace", 1, 1_000);
        drain(&mut out_rx);

        let shot = Packet::EntityShoot {
            group: PLAYER_GROUP,
            entity_id: 0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            bullet: 0,
            weapon: STANDARD_WEAPON as i16,
        };
        // 500 shots at the weapon's actual reload cadence.
        let mut now = 10_000;
        for _ in 0..500 {
            send(&mut server, 1, &shot, now);
            now += 400;
        }
        assert!(kicks(&drain(&mut out_rx)).is_empty());
        assert_eq!(server.conns.get(1).unwrap().state, ConnState::Active);
    }
}
