use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error};

use tickroute_core::ScheduleSpec;

use super::state::{AtomicTaskState, TaskState};
use crate::metrics::DispatchMetrics;

/// Unique identifier for a scheduled unit of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Per-invocation view handed to periodic work.
#[derive(Debug)]
pub struct TaskContext {
    invocation: u64,
    tick: u64,
    stop: Option<TaskState>,
}

impl TaskContext {
    /// Zero-based count of invocations before this one.
    pub fn invocation(&self) -> u64 {
        self.invocation
    }

    /// The logical tick this invocation was due at, in the owning context.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Stop the schedule after this invocation; the task ends `Cancelled`.
    pub fn cancel(&mut self) {
        self.stop = Some(TaskState::Cancelled);
    }

    /// Stop the schedule after this invocation; the task ends `Completed`.
    pub fn complete(&mut self) {
        self.stop = Some(TaskState::Completed);
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_some()
    }
}

/// What a backend should do after calling [`Runnable::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Invoked; more invocations follow.
    Ran,
    /// Not invoked because the previous invocation is still in flight.
    Skipped,
    /// Terminal: completed, cancelled, or limit reached. Drop it.
    Finished,
}

enum Job {
    Once(Box<dyn FnOnce() + Send>),
    Repeating(Box<dyn FnMut(&mut TaskContext) + Send>),
    Spent,
}

struct TaskCell {
    id: TaskId,
    state: AtomicTaskState,
    job: Mutex<Job>,
    periodic: bool,
    max_invocations: Option<u64>,
    invocations: AtomicU64,
    metrics: Option<Arc<DispatchMetrics>>,
}

/// The layer's wrapper around caller work, handed to backends.
///
/// Backends only decide *when* and *where* to call [`run`](Self::run); the
/// cancellation check, state transitions and panic capture happen here, so
/// every backend gets the same lifecycle guarantees.
#[derive(Clone)]
pub struct Runnable {
    cell: Arc<TaskCell>,
}

impl Runnable {
    /// Wrap one-shot work.
    pub fn once<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::build(Job::Once(Box::new(work)), false, None, None)
    }

    /// Wrap work that receives a [`TaskContext`]; periodicity and limits come from `spec`.
    pub fn with_context<F>(spec: &ScheduleSpec, work: F) -> Self
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        Self::build(
            Job::Repeating(Box::new(work)),
            spec.is_periodic(),
            spec.max_invocations,
            None,
        )
    }

    pub(crate) fn observed_once<F>(work: F, metrics: Arc<DispatchMetrics>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::build(Job::Once(Box::new(work)), false, None, Some(metrics))
    }

    pub(crate) fn observed_with_context<F>(
        spec: &ScheduleSpec,
        work: F,
        metrics: Arc<DispatchMetrics>,
    ) -> Self
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        Self::build(
            Job::Repeating(Box::new(work)),
            spec.is_periodic(),
            spec.max_invocations,
            Some(metrics),
        )
    }

    fn build(
        job: Job,
        periodic: bool,
        max_invocations: Option<u64>,
        metrics: Option<Arc<DispatchMetrics>>,
    ) -> Self {
        Self {
            cell: Arc::new(TaskCell {
                id: TaskId::next(),
                state: AtomicTaskState::new(TaskState::Scheduled),
                job: Mutex::new(job),
                periodic,
                max_invocations,
                invocations: AtomicU64::new(0),
                metrics,
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.cell.id
    }

    pub fn state(&self) -> TaskState {
        self.cell.state.load()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.periodic
    }

    /// Number of invocations started so far.
    pub fn invocations(&self) -> u64 {
        self.cell.invocations.load(Ordering::Acquire)
    }

    /// Prevent future invocations. Idempotent; an in-flight invocation finishes.
    pub fn cancel(&self) -> bool {
        let cancelled = self.cell.state.cancel();
        if cancelled {
            // Release captured resources now unless an invocation holds the job.
            if let Ok(mut job) = self.cell.job.try_lock() {
                *job = Job::Spent;
            }
            debug!(task_id = %self.cell.id, "task cancelled");
        }
        cancelled
    }

    /// Invoke the work once, as due at `tick`.
    ///
    /// Cancellation is checked immediately before invoking, so at most the
    /// invocation already in flight can run after `cancel()` returns.
    pub fn run(&self, tick: u64) -> RunOutcome {
        let cell = &*self.cell;
        if !cell.state.transition(TaskState::Scheduled, TaskState::Running) {
            return match cell.state.load() {
                TaskState::Running => {
                    debug!(task_id = %cell.id, tick, "previous invocation still running; skipping");
                    RunOutcome::Skipped
                }
                _ => RunOutcome::Finished,
            };
        }

        let invocation = cell.invocations.fetch_add(1, Ordering::AcqRel);
        let mut ctx = TaskContext {
            invocation,
            tick,
            stop: None,
        };

        let mut job = cell.job.lock().unwrap_or_else(PoisonError::into_inner);
        let result = if let Job::Repeating(work) = &mut *job {
            panic::catch_unwind(AssertUnwindSafe(|| work(&mut ctx)))
        } else if let Job::Once(work) = std::mem::replace(&mut *job, Job::Spent) {
            panic::catch_unwind(AssertUnwindSafe(work))
        } else {
            Ok(())
        };

        if let Some(metrics) = &cell.metrics {
            metrics.record_invocation();
        }
        if let Err(payload) = result {
            error!(
                task_id = %cell.id,
                invocation,
                tick,
                panic = %panic_message(payload.as_ref()),
                "task panicked; schedule continues"
            );
            if let Some(metrics) = &cell.metrics {
                metrics.record_panic();
            }
        }

        let limit_reached = cell
            .max_invocations
            .is_some_and(|max| invocation + 1 >= max);
        let stop = if let Some(state) = ctx.stop {
            Some(state)
        } else if !cell.periodic || limit_reached {
            Some(TaskState::Completed)
        } else {
            None
        };

        match stop {
            Some(state) => {
                *job = Job::Spent;
                // Fails only if cancel() already won; Cancelled stays.
                cell.state.transition(TaskState::Running, state);
                RunOutcome::Finished
            }
            None if cell.state.transition(TaskState::Running, TaskState::Scheduled) => RunOutcome::Ran,
            None => {
                *job = Job::Spent;
                RunOutcome::Finished
            }
        }
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable")
            .field("id", &self.cell.id)
            .field("state", &self.state())
            .field("periodic", &self.cell.periodic)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
