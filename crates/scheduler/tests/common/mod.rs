//! Hand-written backends shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tickroute_scheduler::{
    AsyncScheduler, BackendCapability, DispatchError, DispatchMetrics, Dispatcher, EntityId, NativeTask, PlayerId,
    QueuedTask, RegionScheduler, Runnable, ScheduleSpec, TickQueue, Tickable, WorldId,
};

/// Fallback primitive that runs due work on the thread calling `tick()`.
#[derive(Default)]
pub struct ManualAsync {
    queue: Mutex<TickQueue>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl ManualAsync {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let backend = Self::default();
        backend.fail.store(true, Ordering::SeqCst);
        Arc::new(backend)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ticks(&self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }
}

impl AsyncScheduler for ManualAsync {
    fn run_async(&self, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::unavailable("manual", "told to fail"));
        }
        self.queue.lock().unwrap().schedule(task.clone(), &spec);
        Ok(Arc::new(QueuedTask::new(task)))
    }
}

impl Tickable for ManualAsync {
    fn tick(&self) {
        let due = self.queue.lock().unwrap().advance();
        for run in due {
            run.runnable.run(run.tick);
        }
    }

    fn current_tick(&self) -> u64 {
        self.queue.lock().unwrap().current_tick()
    }
}

/// Region primitive that only counts calls, optionally refusing or panicking.
#[derive(Default)]
pub struct CountingRegion {
    pub calls: AtomicUsize,
    pub reject: bool,
    pub panic: bool,
}

impl CountingRegion {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, route: &'static str, task: Runnable) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("region backend blew up");
        }
        if self.reject {
            return Err(DispatchError::rejected(route, "stale reference"));
        }
        Ok(Arc::new(QueuedTask::new(task)))
    }
}

impl RegionScheduler for CountingRegion {
    fn run_global(&self, task: Runnable, _spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.answer("global", task)
    }

    fn run_world(&self, _world: WorldId, task: Runnable, _spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.answer("world", task)
    }

    fn run_entity(&self, _entity: EntityId, task: Runnable, _spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.answer("entity", task)
    }

    fn run_player(&self, _player: PlayerId, task: Runnable, _spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        self.answer("player", task)
    }
}

pub fn dispatcher(
    capability: BackendCapability,
    region: Option<Arc<dyn RegionScheduler>>,
    fallback: Arc<ManualAsync>,
) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        capability,
        region,
        fallback,
        Arc::new(DispatchMetrics::new()),
    ))
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn bump(count: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let count = Arc::clone(count);
    move || {
        count.fetch_add(1, Ordering::SeqCst);
    }
}
