//! Entity and player queries, and work pinned to a single entity.

use std::sync::Arc;

use tickroute_core::{EntityId, ExecutionTarget, WorldId};
use tickroute_scheduler::{Pending, Scheduler, TaskHandle};

use crate::call::call_on;
use crate::host::{EntityAccess, WorldAccess};
use crate::model::{EntitySnapshot, PlayerSnapshot};

pub struct EntityOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
}

impl<H> Clone for EntityOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
        }
    }
}

impl<H: WorldAccess + EntityAccess> EntityOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self { scheduler, host }
    }

    /// Search every world for `id` from the global context.
    pub fn find_entity(&self, id: EntityId) -> Pending<Option<EntitySnapshot>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::Global, move || {
            host.worlds()
                .into_iter()
                .flat_map(|world| host.entities(world))
                .find(|entity| entity.id == id)
        })
    }

    pub fn entities_in_world<F>(&self, world: WorldId, filter: F) -> Pending<Vec<EntitySnapshot>>
    where
        F: Fn(&EntitySnapshot) -> bool + Send + 'static,
    {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            host.entities(world).into_iter().filter(|e| filter(e)).collect()
        })
    }

    /// Online players in `world`.
    pub fn players_in_world(&self, world: WorldId) -> Pending<Vec<PlayerSnapshot>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            host.players(world).into_iter().filter(|p| p.online).collect()
        })
    }

    /// Run `work` on the entity's own context with a fresh snapshot.
    ///
    /// A nil id yields an already-cancelled handle. If the entity is gone by
    /// the time the work runs, `work` is skipped.
    pub fn run_with_entity<F>(&self, id: EntityId, work: F) -> TaskHandle
    where
        F: FnOnce(EntitySnapshot) + Send + 'static,
    {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::Entity(id), move || match host.entity(id) {
            Some(entity) if entity.valid => work(entity),
            _ => tracing::debug!(entity = %id, "entity no longer valid, skipping"),
        })
    }

    /// Start one player-affinity task per online player in `world`.
    pub fn run_with_players_in_world<F>(&self, world: WorldId, work: F) -> Pending<Vec<TaskHandle>>
    where
        F: Fn(PlayerSnapshot) + Send + Sync + 'static,
    {
        let host = self.host.clone();
        let scheduler = self.scheduler.clone();
        let work = Arc::new(work);
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            host.players(world)
                .into_iter()
                .filter(|p| p.online)
                .map(|player| {
                    let work = work.clone();
                    scheduler.submit(ExecutionTarget::Player(player.id), move || work(player))
                })
                .collect()
        })
    }
}
