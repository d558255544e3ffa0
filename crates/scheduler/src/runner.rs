use std::sync::Arc;

use tickroute_core::{ExecutionTarget, ScheduleError, ScheduleSpec};

use crate::dispatcher::Dispatcher;
use crate::task::{TaskContext, TaskHandle};

/// Delayed and periodic execution on top of the [`Dispatcher`].
///
/// Delays and periods are logical ticks of the owning context. Schedules are
/// validated before any backend is touched.
#[derive(Clone)]
pub struct DelayedRunner {
    dispatcher: Arc<Dispatcher>,
}

impl DelayedRunner {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run `work` once, `delay_ticks` after submission. `0` means the next
    /// time the owning context is free.
    pub fn run_after<F>(&self, target: ExecutionTarget, delay_ticks: u64, work: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let runnable = self.dispatcher.wrap_once(work);
        self.dispatcher.dispatch(target, runnable, ScheduleSpec::once(delay_ticks))
    }

    /// Run `work` every `period_ticks`, first after `delay_ticks`.
    pub fn run_every<F>(
        &self,
        target: ExecutionTarget,
        delay_ticks: u64,
        period_ticks: u64,
        work: F,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        let spec = ScheduleSpec::repeating(delay_ticks, period_ticks)?;
        Ok(self.dispatch_with_context(target, spec, work))
    }

    /// Like [`run_every`](Self::run_every), completing after `max_invocations`.
    pub fn run_every_limited<F>(
        &self,
        target: ExecutionTarget,
        delay_ticks: u64,
        period_ticks: u64,
        max_invocations: u64,
        work: F,
    ) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        let spec = ScheduleSpec::repeating(delay_ticks, period_ticks)?.limited(max_invocations)?;
        Ok(self.dispatch_with_context(target, spec, work))
    }

    /// Schedule with an explicit, possibly hand-built, spec.
    pub fn schedule<F>(&self, target: ExecutionTarget, spec: ScheduleSpec, work: F) -> Result<TaskHandle, ScheduleError>
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        spec.validate()?;
        Ok(self.dispatch_with_context(target, spec, work))
    }

    /// Periodic work that owns `state` and borrows it on every invocation.
    pub fn run_every_with<S, F>(
        &self,
        target: ExecutionTarget,
        mut state: S,
        spec: ScheduleSpec,
        mut work: F,
    ) -> Result<TaskHandle, ScheduleError>
    where
        S: Send + 'static,
        F: FnMut(&mut S, &mut TaskContext) + Send + 'static,
    {
        spec.validate()?;
        Ok(self.dispatch_with_context(target, spec, move |ctx| work(&mut state, ctx)))
    }

    fn dispatch_with_context<F>(&self, target: ExecutionTarget, spec: ScheduleSpec, work: F) -> TaskHandle
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        let runnable = self.dispatcher.wrap_with_context(&spec, work);
        self.dispatcher.dispatch(target, runnable, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PooledAsyncScheduler, Tickable};
    use crate::capability::BackendCapability;
    use crate::metrics::DispatchMetrics;
    use crate::task::TaskState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn runner() -> (DelayedRunner, Arc<PooledAsyncScheduler>) {
        let pool = Arc::new(PooledAsyncScheduler::new(1).unwrap());
        let dispatcher = Dispatcher::new(
            BackendCapability::GlobalThread,
            None,
            pool.clone(),
            Arc::new(DispatchMetrics::new()),
        );
        (DelayedRunner::new(Arc::new(dispatcher)), pool)
    }

    fn step(pool: &PooledAsyncScheduler) {
        pool.tick();
        assert!(pool.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn zero_period_is_rejected() {
        let (runner, pool) = runner();
        let err = runner
            .run_every(ExecutionTarget::Global, 0, 0, |_| {})
            .unwrap_err();
        assert_eq!(err, ScheduleError::InvalidPeriod { period_ticks: 0 });
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn run_after_waits_for_delay() {
        let (runner, pool) = runner();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = runner.run_after(ExecutionTarget::PlainAsync, 3, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.state(), TaskState::Scheduled);

        for _ in 0..3 {
            step(&pool);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        step(&pool);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn limited_schedule_completes() {
        let (runner, pool) = runner();
        let handle = runner
            .run_every_limited(ExecutionTarget::Global, 0, 2, 3, |_| {})
            .unwrap();
        for _ in 0..10 {
            step(&pool);
        }
        assert_eq!(handle.state(), TaskState::Completed);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn owned_state_persists_between_invocations() {
        let (runner, pool) = runner();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let spec = ScheduleSpec::repeating(0, 1).unwrap().limited(4).unwrap();
        runner
            .run_every_with(ExecutionTarget::Global, 0u32, spec, move |total, _| {
                *total += 10;
                sink.lock().unwrap().push(*total);
            })
            .unwrap();
        for _ in 0..6 {
            step(&pool);
        }
        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn hand_built_spec_is_validated() {
        let (runner, _pool) = runner();
        let spec = ScheduleSpec {
            delay_ticks: 0,
            period_ticks: Some(5),
            max_invocations: Some(0),
        };
        assert_eq!(
            runner.schedule(ExecutionTarget::Global, spec, |_| {}).unwrap_err(),
            ScheduleError::InvalidMaxInvocations
        );
    }
}
