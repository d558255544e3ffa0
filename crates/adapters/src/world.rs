//! World lookups and block access, each run on the owning world's context.

use std::sync::Arc;

use tickroute_core::{ExecutionTarget, WorldId};
use tickroute_scheduler::{Pending, Scheduler, TaskHandle};

use crate::call::call_on;
use crate::host::WorldAccess;
use crate::model::{BlockPos, ChunkPos, Material};

pub struct WorldOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
}

impl<H> Clone for WorldOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
        }
    }
}

impl<H: WorldAccess> WorldOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self { scheduler, host }
    }

    /// Resolve a world by name on the global context.
    pub fn world_by_name(&self, name: impl Into<String>) -> Pending<Option<WorldId>> {
        let host = self.host.clone();
        let name = name.into();
        call_on(&self.scheduler, ExecutionTarget::Global, move || host.world_by_name(&name))
    }

    pub fn block_at(&self, world: WorldId, pos: BlockPos) -> Pending<Option<Material>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || host.block_at(world, pos))
    }

    pub fn set_block(&self, world: WorldId, pos: BlockPos, material: Material) -> Pending<bool> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            let changed = host.set_block(world, pos, material);
            if !changed {
                tracing::debug!(%world, ?pos, "block unchanged");
            }
            changed
        })
    }

    pub fn loaded_chunks(&self, world: WorldId) -> Pending<Vec<ChunkPos>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || host.loaded_chunks(world))
    }

    /// Run arbitrary work with world affinity.
    pub fn run_with_world<F>(&self, world: WorldId, work: F) -> TaskHandle
    where
        F: FnOnce(WorldId) + Send + 'static,
    {
        self.scheduler.submit(ExecutionTarget::World(world), move || work(world))
    }
}
