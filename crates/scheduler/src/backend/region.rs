use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rayon::prelude::*;
use tracing::{debug, info};

use tickroute_core::{DispatchError, EntityId, PlayerId, ScheduleSpec, SchedulerConfig, WorldId};

use super::tick_queue::TickQueue;
use super::{NativeTask, QueuedTask, RegionScheduler, Tickable};
use crate::error::SchedulerError;
use crate::task::{RunOutcome, Runnable};

/// One execution context of the region-threaded backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKey {
    Global,
    World(WorldId),
    Entity(EntityId),
    Player(PlayerId),
}

impl RegionKey {
    fn route(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::World(_) => "world",
            Self::Entity(_) => "entity",
            Self::Player(_) => "player",
        }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::World(id) => write!(f, "world:{id}"),
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Player(id) => write!(f, "player:{id}"),
        }
    }
}

type ContextQueue = Arc<Mutex<TickQueue>>;

/// In-process region-threaded backend.
///
/// Every context (global, each loaded world, each live entity, each online
/// player) owns a tick queue. A tick processes the contexts in parallel on a
/// rayon pool while each context runs its own due work sequentially, so work
/// for one context never overlaps with other work for that context.
pub struct RegionThreadedScheduler {
    contexts: RwLock<HashMap<RegionKey, ContextQueue>>,
    pool: rayon::ThreadPool,
    tick: AtomicU64,
    shutdown: AtomicBool,
}

impl RegionThreadedScheduler {
    pub fn new(workers: usize) -> Result<Self, SchedulerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("tickroute-region-{i}"))
            .build()
            .map_err(|e| SchedulerError::Pool(e.to_string()))?;

        let mut contexts = HashMap::new();
        contexts.insert(RegionKey::Global, Arc::new(Mutex::new(TickQueue::new())));
        info!(workers = workers.max(1), "region scheduler started");

        Ok(Self {
            contexts: RwLock::new(contexts),
            pool,
            tick: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(config.resolved_region_workers())
    }

    pub fn load_world(&self, world: WorldId) {
        self.open(RegionKey::World(world));
    }

    /// Unload a world; its pending work is cancelled. Returns how many tasks.
    pub fn unload_world(&self, world: WorldId) -> usize {
        self.close(RegionKey::World(world))
    }

    pub fn spawn_entity(&self, entity: EntityId) {
        self.open(RegionKey::Entity(entity));
    }

    pub fn remove_entity(&self, entity: EntityId) -> usize {
        self.close(RegionKey::Entity(entity))
    }

    pub fn connect_player(&self, player: PlayerId) {
        self.open(RegionKey::Player(player));
    }

    pub fn disconnect_player(&self, player: PlayerId) -> usize {
        self.close(RegionKey::Player(player))
    }

    pub fn has_context(&self, key: RegionKey) -> bool {
        self.read_contexts().contains_key(&key)
    }

    /// Queued entries in one context, if it exists.
    pub fn pending_in(&self, key: RegionKey) -> Option<usize> {
        self.read_contexts()
            .get(&key)
            .map(|queue| queue.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    /// Stop accepting work and cancel everything queued in every context.
    pub fn shutdown(&self) -> usize {
        let queues: Vec<ContextQueue> = {
            // Under the write lock so no submission is between its check and its push.
            let contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
            self.shutdown.store(true, Ordering::Release);
            contexts.values().cloned().collect()
        };
        let cancelled = queues.iter().map(cancel_all).sum();
        info!(cancelled, "region scheduler shut down");
        cancelled
    }

    fn open(&self, key: RegionKey) {
        let start = self.tick.load(Ordering::Acquire);
        let mut contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
        contexts
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(TickQueue::starting_at(start))));
        debug!(context = %key, start, "context opened");
    }

    fn close(&self, key: RegionKey) -> usize {
        let removed = self
            .contexts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        let cancelled = removed.as_ref().map(cancel_all).unwrap_or(0);
        debug!(context = %key, cancelled, "context closed");
        cancelled
    }

    fn submit(&self, key: RegionKey, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        // Hold the read guard until the entry is queued: `close` and `shutdown`
        // take the write lock, so they either see this entry or reject it.
        let contexts = self.read_contexts();
        if self.shutdown.load(Ordering::Acquire) {
            return Err(DispatchError::unavailable("region", "scheduler is shut down"));
        }
        let queue = contexts
            .get(&key)
            .ok_or_else(|| DispatchError::rejected(key.route(), format!("no live context for {key}")))?;

        let due = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .schedule(task.clone(), &spec);
        drop(contexts);
        debug!(task_id = %task.id(), context = %key, due, "queued on region context");
        Ok(Arc::new(QueuedTask::new(task)))
    }

    fn read_contexts(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RegionKey, ContextQueue>> {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cancel_all(queue: &ContextQueue) -> usize {
    let pending = queue.lock().unwrap_or_else(PoisonError::into_inner).drain();
    pending.into_iter().filter(|runnable| runnable.cancel()).count()
}

impl RegionScheduler for RegionThreadedScheduler {
    fn run_global(&self, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.submit(RegionKey::Global, task, spec)
    }

    fn run_world(&self, world: WorldId, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.submit(RegionKey::World(world), task, spec)
    }

    fn run_entity(&self, entity: EntityId, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.submit(RegionKey::Entity(entity), task, spec)
    }

    fn run_player(&self, player: PlayerId, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.submit(RegionKey::Player(player), task, spec)
    }
}

impl Tickable for RegionThreadedScheduler {
    fn tick(&self) {
        self.tick.fetch_add(1, Ordering::AcqRel);
        let queues: Vec<ContextQueue> = self.read_contexts().values().cloned().collect();

        self.pool.install(|| {
            queues.par_iter().for_each(|queue| {
                // Pop under the lock, run without it so work may schedule
                // more work on its own context.
                let due = queue.lock().unwrap_or_else(PoisonError::into_inner).advance();
                for run in due {
                    if run.runnable.run(run.tick) == RunOutcome::Skipped {
                        debug!(task_id = %run.runnable.id(), "region run skipped");
                    }
                }
            });
        });
    }

    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }
}
