//! Periodic state synchronization: entity batches and the global scalar
//! broadcast.
//!
//! Both run off the authoritative tick, never off packet arrival. Delivery
//! is unordered and lossy; every payload carries a send timestamp so
//! receivers can discard stale updates on their own.

use crate::game::{EntityGroup, GameState};
use shared::{Packet, SYNC_BATCH_MAX_RECORDS};

/// Entity batches go out every 4 ticks.
pub const ENTITY_SYNC_INTERVAL_TICKS: u64 = 4;

/// Global scalars go out every 10 ticks.
pub const STATE_SYNC_INTERVAL_TICKS: u64 = 10;

/// Packs one group's entities into sync batches of at most
/// [`SYNC_BATCH_MAX_RECORDS`] records. The trailing partial batch is always
/// flushed; a non-syncable or empty group produces nothing.
pub fn build_entity_batches(group: &EntityGroup, now_ms: i64) -> Vec<Packet> {
    if !group.syncable || group.is_empty() {
        return Vec::new();
    }

    let mut batches = Vec::new();
    let mut records = Vec::with_capacity(SYNC_BATCH_MAX_RECORDS.min(group.len()));

    for entity in group.iter() {
        records.push((entity.id, entity.state.clone()));
        if records.len() >= SYNC_BATCH_MAX_RECORDS {
            batches.push(make_batch(group, now_ms, std::mem::take(&mut records)));
        }
    }
    if !records.is_empty() {
        batches.push(make_batch(group, now_ms, records));
    }
    batches
}

fn make_batch(group: &EntityGroup, now_ms: i64, records: Vec<(i32, Vec<u8>)>) -> Packet {
    Packet::SyncBatch {
        timestamp: now_ms,
        group: group.id,
        record_width: group.record_width,
        records,
    }
}

/// Entity batches for every syncable group this interval.
pub fn build_all_batches(game: &GameState, now_ms: i64) -> Vec<Packet> {
    game.groups()
        .flat_map(|group| build_entity_batches(group, now_ms))
        .collect()
}

/// The small last-write-wins broadcast of global scalars. Read-only over
/// already-authoritative state, so no reconciliation is needed.
pub fn build_state_sync(game: &GameState, now_ms: i64) -> Packet {
    Packet::StateSync {
        countdown: game.countdown,
        time: game.elapsed,
        enemies: game.enemies,
        wave: game.wave,
        timestamp: now_ms,
    }
}
