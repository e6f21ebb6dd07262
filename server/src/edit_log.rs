//! Append-only record of validated world edits, queryable by coordinate
//! and replayable backward for rollback.
//!
//! The log itself is never mutated after append. Rollback advances an undo
//! cursor instead of deleting entries; appending a new edit resets the
//! cursor, since the world has moved on from the undone history.

use crate::game::TileAccess;
use log::info;
use shared::packets::EditLogRecord;
use shared::EditAction;

#[derive(Debug, Clone)]
pub struct EditLogEntry {
    pub x: i16,
    pub y: i16,
    pub name: String,
    pub block: i32,
    pub rotation: u8,
    pub action: EditAction,
    /// Global insertion order, monotonically increasing.
    pub order: u64,
}

#[derive(Debug, Default)]
pub struct EditLog {
    entries: Vec<EditLogEntry>,
    /// Number of trailing entries already rolled back.
    undone: usize,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        x: i16,
        y: i16,
        name: &str,
        block: i32,
        rotation: u8,
        action: EditAction,
    ) {
        let order = self.entries.len() as u64;
        self.entries.push(EditLogEntry {
            x,
            y,
            name: name.to_string(),
            block,
            rotation,
            action,
            order,
        });
        self.undone = 0;
    }

    /// All entries at a coordinate, in insertion order.
    pub fn entries_at(&self, x: i16, y: i16) -> Vec<&EditLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.x == x && e.y == y)
            .collect()
    }

    /// Wire-shaped records for an edit log response.
    pub fn records_at(&self, x: i16, y: i16) -> Vec<EditLogRecord> {
        self.entries_at(x, y)
            .into_iter()
            .map(|e| EditLogRecord {
                name: e.name.clone(),
                block: e.block,
                rotation: e.rotation,
                action: e.action,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replays the last `steps` not-yet-undone edits backward, restoring
    /// each affected coordinate's prior block state through the world
    /// collaborator. Returns the number of steps actually applied; zero
    /// steps is a no-op.
    pub fn rollback(&mut self, steps: usize, world: &mut dyn TileAccess) -> usize {
        let available = self.entries.len() - self.undone;
        let steps = steps.min(available);

        for _ in 0..steps {
            let index = self.entries.len() - self.undone - 1;
            let entry = self.entries[index].clone();
            match entry.action {
                EditAction::Break => {
                    // Undoing a break restores the recorded block.
                    world.set_block(entry.x, entry.y, entry.block, entry.rotation);
                }
                EditAction::Place => {
                    // Undoing a place reveals whatever an earlier surviving
                    // place left at that coordinate, or bare terrain.
                    let prior = self.entries[..index]
                        .iter()
                        .rev()
                        .find(|e| e.x == entry.x && e.y == entry.y);
                    match prior {
                        Some(p) if p.action == EditAction::Place => {
                            world.set_block(p.x, p.y, p.block, p.rotation);
                        }
                        _ => world.clear_block(entry.x, entry.y),
                    }
                }
            }
            self.undone += 1;
            info!(
                "Rolled back {:?} of block {} at ({}, {}) by {}",
                entry.action, entry.block, entry.x, entry.y, entry.name
            );
        }
        steps
    }
}
