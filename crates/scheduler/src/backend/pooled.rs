use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use tickroute_core::{DispatchError, ScheduleSpec, SchedulerConfig};

use super::tick_queue::TickQueue;
use super::{AsyncScheduler, NativeTask, QueuedTask, Tickable};
use crate::error::SchedulerError;
use crate::task::{RunOutcome, Runnable};

/// Counts work handed to the pool and not yet finished.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn enter(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn exit(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = self
                .idle
                .wait_timeout(count, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// In-process fallback primitive: one tick queue, due work runs on a rayon pool.
///
/// No ordering is promised between separate submissions. A periodic task
/// whose previous invocation is still running skips the overlapping run.
pub struct PooledAsyncScheduler {
    queue: Mutex<TickQueue>,
    pool: rayon::ThreadPool,
    in_flight: Arc<InFlight>,
    shutdown: AtomicBool,
}

impl PooledAsyncScheduler {
    pub fn new(workers: usize) -> Result<Self, SchedulerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("tickroute-async-{i}"))
            .build()
            .map_err(|e| SchedulerError::Pool(e.to_string()))?;
        info!(workers = workers.max(1), "fallback pool started");
        Ok(Self {
            queue: Mutex::new(TickQueue::new()),
            pool,
            in_flight: Arc::new(InFlight::default()),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(config.resolved_fallback_workers())
    }

    /// Block until every spawned invocation has returned, or `timeout` passes.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.in_flight.wait_idle(timeout)
    }

    /// Stop accepting work and cancel everything still queued.
    pub fn shutdown(&self) -> usize {
        let pending = {
            let mut queue = self.lock_queue();
            self.shutdown.store(true, Ordering::Release);
            queue.drain()
        };
        let mut cancelled = 0;
        for runnable in pending {
            if runnable.cancel() {
                cancelled += 1;
            }
        }
        info!(cancelled, "fallback pool shut down");
        cancelled
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Entries still waiting in the queue.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, TickQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AsyncScheduler for PooledAsyncScheduler {
    fn run_async(&self, task: Runnable, spec: ScheduleSpec) -> Result<Arc<dyn NativeTask>, DispatchError> {
        let mut queue = self.lock_queue();
        // Checked under the queue lock; `shutdown` flips it under the same lock.
        if self.is_shut_down() {
            return Err(DispatchError::unavailable("pooled", "scheduler is shut down"));
        }
        let due = queue.schedule(task.clone(), &spec);
        drop(queue);
        debug!(task_id = %task.id(), due, "queued on fallback pool");
        Ok(Arc::new(QueuedTask::new(task)))
    }
}

impl Tickable for PooledAsyncScheduler {
    fn tick(&self) {
        let due = self.lock_queue().advance();
        for run in due {
            let in_flight = Arc::clone(&self.in_flight);
            in_flight.enter();
            self.pool.spawn(move || {
                if run.runnable.run(run.tick) == RunOutcome::Skipped {
                    debug!(task_id = %run.runnable.id(), tick = run.tick, "overlapping periodic run skipped");
                }
                in_flight.exit();
            });
        }
    }

    fn current_tick(&self) -> u64 {
        self.lock_queue().current_tick()
    }
}
