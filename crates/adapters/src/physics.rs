//! Per-tick entity physics and block physics triggers.

use std::sync::Arc;

use tickroute_core::{EntityId, ExecutionTarget, ScheduleError, WorldId};
use tickroute_scheduler::{Pending, Scheduler, TaskHandle};

use crate::call::call_on;
use crate::host::{EntityAccess, PhysicsAccess};
use crate::model::{ChunkPos, Location, Material, PhysicsRegion, Vector};

/// Downward velocity added to airborne entities every tick.
pub const GRAVITY: f64 = -0.08;

/// Height at which chunk-wide block physics is triggered.
const BLOCK_UPDATE_Y: i32 = 64;

pub struct PhysicsOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
}

impl<H> Clone for PhysicsOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
        }
    }
}

impl<H: EntityAccess + PhysicsAccess> PhysicsOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self { scheduler, host }
    }

    /// Apply gravity to every airborne entity in `world` once per tick for
    /// `duration_ticks` ticks.
    pub fn simulate(&self, world: WorldId, duration_ticks: u64) -> Result<TaskHandle, ScheduleError> {
        let host = self.host.clone();
        self.scheduler
            .runner()
            .run_every_limited(ExecutionTarget::World(world), 0, 1, duration_ticks, move |ctx| {
                let mut moved = 0usize;
                for entity in host.entities(world) {
                    if entity.valid && !entity.on_ground && host.set_velocity(entity.id, fall(entity.velocity)) {
                        moved += 1;
                    }
                }
                tracing::trace!(%world, tick = ctx.tick(), moved, "physics step");
            })
    }

    pub fn update_block_physics(&self, world: WorldId, chunk: ChunkPos) -> Pending<bool> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            host.trigger_update(world, chunk.origin(BLOCK_UPDATE_Y))
        })
    }

    pub fn has_physics(&self, material: &Material) -> bool {
        material.is_solid() || material.has_gravity()
    }

    /// Apply one step of gravity to the listed entities; resolves to how many were valid.
    pub fn apply_gravity(&self, world: WorldId, entities: Vec<EntityId>) -> Pending<usize> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            entities
                .iter()
                .filter_map(|id| host.entity(*id))
                .filter(|entity| entity.valid)
                .filter(|entity| host.set_velocity(entity.id, fall(entity.velocity)))
                .count()
        })
    }

    /// Run `op` on `world`'s context at the next tick.
    pub fn sync_with_tick<F>(&self, world: WorldId, op: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.submit(ExecutionTarget::World(world), op)
    }

    pub fn physics_region(&self, center: Location) -> PhysicsRegion {
        PhysicsRegion::new(center, PhysicsRegion::DEFAULT_RADIUS)
    }
}

fn fall(velocity: Vector) -> Vector {
    velocity + Vector::new(0.0, GRAVITY, 0.0)
}
