//! Authoritative game state owned by the server: global scalars, entity
//! groups for the sync scheduler, and the tile table the moderation and
//! rollback paths consult.
//!
//! Simulation behavior (movement, combat, block logic) is an external
//! collaborator; entities here are opaque fixed-width state blobs and tiles
//! are just (block, rotation, synthetic) triples.

use log::warn;
use shared::Writer;
use std::collections::HashMap;

/// Group id of the player entity group.
pub const PLAYER_GROUP: u8 = 0;

/// Minimal tile mutation surface used by rollback. The world simulation
/// implements the actual block behavior.
pub trait TileAccess {
    fn set_block(&mut self, x: i16, y: i16, block: i32, rotation: u8);
    fn clear_block(&mut self, x: i16, y: i16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub block: i32,
    pub rotation: u8,
    /// Player-built, as opposed to natural terrain. Synthetic tiles are
    /// under the stricter edit throttle.
    pub synthetic: bool,
}

/// Sparse tile table: only player-built state is tracked here, natural
/// terrain lives with the world simulation.
#[derive(Debug)]
pub struct WorldMap {
    width: i16,
    height: i16,
    tiles: HashMap<(i16, i16), Tile>,
}

impl WorldMap {
    pub fn new(width: i16, height: i16) -> Self {
        Self {
            width,
            height,
            tiles: HashMap::new(),
        }
    }

    pub fn width(&self) -> i16 {
        self.width
    }

    pub fn height(&self) -> i16 {
        self.height
    }

    pub fn in_bounds(&self, x: i16, y: i16) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn tile(&self, x: i16, y: i16) -> Option<&Tile> {
        self.tiles.get(&(x, y))
    }

    pub fn is_synthetic(&self, x: i16, y: i16) -> bool {
        self.tiles.get(&(x, y)).is_some_and(|t| t.synthetic)
    }

    /// Serializes the tracked tiles as the world snapshot payload streamed
    /// at handshake completion. Opaque to the networking layer.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_i16(self.width);
        w.put_i16(self.height);
        w.put_i32(self.tiles.len() as i32);
        for ((x, y), tile) in &self.tiles {
            w.put_i16(*x);
            w.put_i16(*y);
            w.put_i32(tile.block);
            w.put_u8(tile.rotation);
            w.put_bool(tile.synthetic);
        }
        w.into_bytes()
    }
}

impl TileAccess for WorldMap {
    fn set_block(&mut self, x: i16, y: i16, block: i32, rotation: u8) {
        self.tiles.insert(
            (x, y),
            Tile {
                block,
                rotation,
                synthetic: true,
            },
        );
    }

    fn clear_block(&mut self, x: i16, y: i16) {
        self.tiles.remove(&(x, y));
    }
}

/// One live entity: id plus its fixed-width sync state.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i32,
    pub state: Vec<u8>,
}

/// A category of entities with an explicit, static syncability flag.
/// Whether a group broadcasts is decided when the group is defined, never
/// inferred from a sampled member.
#[derive(Debug)]
pub struct EntityGroup {
    pub id: u8,
    pub syncable: bool,
    /// Bytes per sync record, the 4-byte entity id included.
    pub record_width: u8,
    entities: Vec<Entity>,
}

impl EntityGroup {
    pub fn new(id: u8, syncable: bool, state_len: u8) -> Self {
        Self {
            id,
            syncable,
            record_width: state_len + 4,
            entities: Vec::new(),
        }
    }

    pub fn state_len(&self) -> usize {
        self.record_width as usize - 4
    }

    /// Inserts the entity or replaces its state. A blob of the wrong width
    /// is dropped with a warning; fixed-width is a group invariant.
    pub fn upsert(&mut self, id: i32, state: Vec<u8>) {
        if state.len() != self.state_len() {
            warn!(
                "Entity {} state of {} bytes does not match group {} width {}",
                id,
                state.len(),
                self.id,
                self.state_len()
            );
            return;
        }
        match self.entities.iter_mut().find(|e| e.id == id) {
            Some(entity) => entity.state = state,
            None => self.entities.push(Entity { id, state }),
        }
    }

    pub fn remove(&mut self, id: i32) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id != id);
        self.entities.len() != before
    }

    pub fn get(&self, id: i32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Recipe catalogue: maps a recipe id to the block it produces. Content
/// definitions are external; the server only validates existence.
#[derive(Debug, Default)]
pub struct RecipeCatalog {
    recipes: HashMap<u8, i32>,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, recipe: u8, block: i32) {
        self.recipes.insert(recipe, block);
    }

    pub fn block_for(&self, recipe: u8) -> Option<i32> {
        self.recipes.get(&recipe).copied()
    }
}

/// Everything the tick owns: scalars broadcast by the state sync, the tile
/// table, and the entity groups scanned by the entity sync.
#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    pub wave: i16,
    pub enemies: i16,
    pub countdown: f32,
    pub elapsed: f32,
    pub world: WorldMap,
    groups: Vec<EntityGroup>,
}

impl GameState {
    pub fn new(world: WorldMap) -> Self {
        let mut state = Self {
            tick: 0,
            wave: 0,
            enemies: 0,
            countdown: 0.0,
            elapsed: 0.0,
            world,
            groups: Vec::new(),
        };
        // Player state blob: x, y, rotation as f32 plus a health short.
        state.add_group(EntityGroup::new(PLAYER_GROUP, true, 14));
        state
    }

    pub fn add_group(&mut self, group: EntityGroup) {
        self.groups.push(group);
    }

    pub fn group(&self, id: u8) -> Option<&EntityGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: u8) -> Option<&mut EntityGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &EntityGroup> {
        self.groups.iter()
    }

    pub fn player_group_mut(&mut self) -> &mut EntityGroup {
        self.group_mut(PLAYER_GROUP)
            .expect("player group is created with the game state")
    }
}
