//! What the adapters need from the game engine.
//!
//! Every method here touches engine state, so the adapters only call them
//! from inside work dispatched to the owning context.

use tickroute_core::{EntityId, PlayerId, WorldId};
use tickroute_scheduler::LoadError;

use crate::model::{BlockPos, ChunkPos, EntitySnapshot, ItemStack, Location, Material, PlayerSnapshot, SoundKey, Vector};

pub trait WorldAccess: Send + Sync + 'static {
    fn world_by_name(&self, name: &str) -> Option<WorldId>;

    fn worlds(&self) -> Vec<WorldId>;

    fn block_at(&self, world: WorldId, pos: BlockPos) -> Option<Material>;

    fn set_block(&self, world: WorldId, pos: BlockPos, material: Material) -> bool;

    fn loaded_chunks(&self, world: WorldId) -> Vec<ChunkPos>;

    fn is_chunk_loaded(&self, world: WorldId, chunk: ChunkPos) -> bool;

    fn is_chunk_generated(&self, world: WorldId, chunk: ChunkPos) -> bool;

    /// Load (generating if needed) a chunk. May report `NotReady` while the
    /// engine is still busy with it.
    fn load_chunk(&self, world: WorldId, chunk: ChunkPos) -> Result<ChunkPos, LoadError>;

    fn unload_chunk(&self, world: WorldId, chunk: ChunkPos, save: bool) -> bool;
}

pub trait EntityAccess: Send + Sync + 'static {
    fn entities(&self, world: WorldId) -> Vec<EntitySnapshot>;

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot>;

    fn players(&self, world: WorldId) -> Vec<PlayerSnapshot>;

    fn set_velocity(&self, id: EntityId, velocity: Vector) -> bool;
}

pub trait InventoryAccess: Send + Sync + 'static {
    fn is_online(&self, player: PlayerId) -> bool;

    fn open_inventory(&self, player: PlayerId, title: &str) -> bool;

    fn update_inventory(&self, player: PlayerId) -> bool;

    fn contents(&self, player: PlayerId) -> Option<Vec<ItemStack>>;

    /// Add items; returns whatever did not fit.
    fn add_items(&self, player: PlayerId, items: &[ItemStack]) -> Vec<ItemStack>;

    /// Remove up to the given amounts; returns how many items were removed.
    fn remove_items(&self, player: PlayerId, items: &[ItemStack]) -> u32;
}

pub trait SoundAccess: Send + Sync + 'static {
    fn known_sounds(&self) -> Vec<SoundKey>;

    fn play_at(&self, location: &Location, sound: &SoundKey, volume: f32, pitch: f32);

    fn play_at_entity(&self, entity: EntityId, sound: &SoundKey, volume: f32, pitch: f32) -> bool;

    fn play_to_player(&self, player: PlayerId, sound: &SoundKey, volume: f32, pitch: f32) -> bool;

    fn stop_all(&self, player: PlayerId);

    fn stop(&self, player: PlayerId, sound: &SoundKey);

    fn player_online(&self, player: PlayerId) -> bool;
}

pub trait PhysicsAccess: Send + Sync + 'static {
    /// Ask the engine to re-evaluate physics at `pos`.
    fn trigger_update(&self, world: WorldId, pos: BlockPos) -> bool;
}

/// Everything a full adapter set needs.
pub trait GameHost: WorldAccess + EntityAccess + InventoryAccess + SoundAccess + PhysicsAccess {}

impl<T> GameHost for T where T: WorldAccess + EntityAccess + InventoryAccess + SoundAccess + PhysicsAccess {}
