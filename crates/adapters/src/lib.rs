//! Game-facing operations built on the tickroute dispatcher.
//!
//! Each `*Ops` type names the context its host calls belong to and lets the
//! [`Scheduler`](tickroute_scheduler::Scheduler) decide whether that becomes a
//! region-threaded submission or a fallback one. Host access is abstracted by
//! the traits in [`host`].

pub mod call;
pub mod chunk;
pub mod entity;
pub mod host;
pub mod inventory;
pub mod model;
pub mod physics;
pub mod sound;
pub mod world;

use std::sync::Arc;

use tickroute_scheduler::Scheduler;

pub use call::{call_on, call_with_handle};
pub use chunk::{ChunkOps, ChunkSource};
pub use entity::EntityOps;
pub use host::{EntityAccess, GameHost, InventoryAccess, PhysicsAccess, SoundAccess, WorldAccess};
pub use inventory::InventoryOps;
pub use model::{
    BlockPos, ChunkPos, EntitySnapshot, ItemStack, Location, Material, PhysicsRegion, PlayerSnapshot, SoundCue, SoundKey,
    Vector, CHUNK_SIZE,
};
pub use physics::{PhysicsOps, GRAVITY};
pub use sound::{PlayingSequence, SoundOps};
pub use world::WorldOps;

/// Every adapter over one host and scheduler.
pub struct Adapters<H> {
    pub worlds: WorldOps<H>,
    pub chunks: ChunkOps<H>,
    pub entities: EntityOps<H>,
    pub inventory: InventoryOps<H>,
    pub sounds: SoundOps<H>,
    pub physics: PhysicsOps<H>,
}

impl<H: GameHost> Adapters<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self {
            worlds: WorldOps::new(scheduler.clone(), host.clone()),
            chunks: ChunkOps::new(scheduler.clone(), host.clone()),
            entities: EntityOps::new(scheduler.clone(), host.clone()),
            inventory: InventoryOps::new(scheduler.clone(), host.clone()),
            sounds: SoundOps::new(scheduler.clone(), host.clone()),
            physics: PhysicsOps::new(scheduler, host),
        }
    }
}
