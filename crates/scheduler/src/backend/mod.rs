//! Scheduling backends.
//!
//! The dispatcher only talks to these traits. A host embeds the layer by
//! implementing them over its native scheduler; hosts without one (and the
//! tests) use the in-process implementations in this module.

mod driver;
mod pooled;
#[cfg(feature = "region-threaded")]
mod region;
mod tick_queue;

use std::sync::Arc;

use serde::Serialize;

use tickroute_core::{DispatchError, EntityId, PlayerId, ScheduleSpec, WorldId};

use crate::task::{Runnable, TaskState};

pub use driver::TickDriver;
pub use pooled::PooledAsyncScheduler;
#[cfg(feature = "region-threaded")]
pub use region::{RegionKey, RegionThreadedScheduler};
pub use tick_queue::{DueRun, TickQueue, PURGE_INTERVAL};

/// Which primitive accepted a piece of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendKind {
    /// The region-threaded (affinity-aware) backend.
    Region,
    /// The generic async primitive.
    Fallback,
}

/// The backend's own reference to accepted work.
pub trait NativeTask: Send + Sync {
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
    fn is_running(&self) -> bool;
}

/// The generic async primitive used when affinity execution is unavailable.
pub trait AsyncScheduler: Send + Sync {
    fn run_async(&self, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError>;
}

/// Affinity-aware primitives of a region-threaded runtime.
pub trait RegionScheduler: Send + Sync {
    fn run_global(&self, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError>;

    fn run_world(
        &self,
        world: WorldId,
        task: Runnable,
        spec: ScheduleSpec,
    ) -> Result<Arc<dyn NativeTask>, DispatchError>;

    fn run_entity(
        &self,
        entity: EntityId,
        task: Runnable,
        spec: ScheduleSpec,
    ) -> Result<Arc<dyn NativeTask>, DispatchError>;

    fn run_player(
        &self,
        player: PlayerId,
        task: Runnable,
        spec: ScheduleSpec,
    ) -> Result<Arc<dyn NativeTask>, DispatchError>;
}

/// Anything advanced by a tick source.
pub trait Tickable: Send + Sync {
    /// Run everything due at the current tick, then advance by one.
    fn tick(&self);

    fn current_tick(&self) -> u64;
}

/// Native reference for work sitting in one of the in-process tick queues.
///
/// The queue holds the same [`Runnable`], so cancelling it is enough: the
/// queue drops finished entries when they come due.
pub struct QueuedTask {
    runnable: Runnable,
}

impl QueuedTask {
    pub fn new(runnable: Runnable) -> Self {
        Self { runnable }
    }
}

impl NativeTask for QueuedTask {
    fn cancel(&self) {
        self.runnable.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.runnable.state() == TaskState::Cancelled
    }

    fn is_running(&self) -> bool {
        self.runnable.state() == TaskState::Running
    }
}
