use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use tickroute_core::{DispatchError, ExecutionTarget, ScheduleSpec};

use crate::backend::{AsyncScheduler, BackendKind, NativeTask, RegionScheduler};
use crate::capability::BackendCapability;
use crate::metrics::DispatchMetrics;
use crate::task::{Runnable, TaskContext, TaskHandle};

/// Routes work to the primitive matching its [`ExecutionTarget`].
///
/// With the region-threaded capability, affinity targets go to the matching
/// region primitive and fall back to the async primitive if it refuses.
/// Without it, everything goes to the async primitive. Dispatch never
/// returns an error: failures are logged, counted and answered with a
/// handle that reports itself cancelled.
pub struct Dispatcher {
    capability: BackendCapability,
    region: Option<Arc<dyn RegionScheduler>>,
    fallback: Arc<dyn AsyncScheduler>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(
        capability: BackendCapability,
        region: Option<Arc<dyn RegionScheduler>>,
        fallback: Arc<dyn AsyncScheduler>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let region = match (capability, region) {
            (BackendCapability::RegionThreaded, Some(region)) => Some(region),
            (BackendCapability::RegionThreaded, None) => {
                warn!("region-threaded capability detected but host offered no region scheduler; using fallback only");
                None
            }
            (BackendCapability::GlobalThread, _) => None,
        };
        Self {
            capability,
            region,
            fallback,
            metrics,
        }
    }

    pub fn capability(&self) -> BackendCapability {
        self.capability
    }

    /// Whether affinity targets can reach a region primitive at all.
    pub fn routes_affinity(&self) -> bool {
        self.region.is_some()
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Run `work` on `target` as soon as its context is next free.
    pub fn submit<F>(&self, target: ExecutionTarget, work: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(target, self.wrap_once(work), ScheduleSpec::immediate())
    }

    /// Route an already-wrapped runnable with an explicit schedule.
    pub fn dispatch(&self, target: ExecutionTarget, runnable: Runnable, spec: ScheduleSpec) -> TaskHandle {
        let route = target.route();
        self.metrics.record_submission(route);

        if let Err(err) = target.validate() {
            return self.fail_fast(target, runnable, err);
        }

        if let (Some(region), true) = (&self.region, target.has_affinity()) {
            match try_region(region.as_ref(), target, runnable.clone(), spec) {
                Ok(native) => {
                    self.metrics.record_region();
                    debug!(task_id = %runnable.id(), %target, route, "dispatched to region backend");
                    return TaskHandle::bound(runnable, native, BackendKind::Region);
                }
                Err(err) if !err.is_recoverable() => return self.fail_fast(target, runnable, err),
                Err(err) => {
                    self.metrics.record_affinity_failure();
                    warn!(task_id = %runnable.id(), %target, route, error = %err, "affinity dispatch failed; falling back");
                }
            }
        }

        match self.fallback.run_async(runnable.clone(), spec) {
            Ok(native) => {
                self.metrics.record_fallback();
                debug!(task_id = %runnable.id(), %target, route, "dispatched to fallback backend");
                TaskHandle::bound(runnable, native, BackendKind::Fallback)
            }
            Err(err) => {
                self.metrics.record_total_failure();
                warn!(task_id = %runnable.id(), %target, route, error = %err, "total dispatch failure; work dropped");
                runnable.cancel();
                TaskHandle::noop()
            }
        }
    }

    pub(crate) fn wrap_once<F>(&self, work: F) -> Runnable
    where
        F: FnOnce() + Send + 'static,
    {
        Runnable::observed_once(work, Arc::clone(&self.metrics))
    }

    pub(crate) fn wrap_with_context<F>(&self, spec: &ScheduleSpec, work: F) -> Runnable
    where
        F: FnMut(&mut TaskContext) + Send + 'static,
    {
        Runnable::observed_with_context(spec, work, Arc::clone(&self.metrics))
    }

    fn fail_fast(&self, target: ExecutionTarget, runnable: Runnable, err: DispatchError) -> TaskHandle {
        self.metrics.record_rejected_invalid();
        warn!(task_id = %runnable.id(), %target, error = %err, "invalid submission rejected");
        runnable.cancel();
        TaskHandle::noop()
    }
}

fn try_region(
    region: &dyn RegionScheduler,
    target: ExecutionTarget,
    runnable: Runnable,
    spec: ScheduleSpec,
) -> Result<Arc<dyn NativeTask>, DispatchError> {
    let route = target.route();
    // A panic is reported as `Rejected`, so the caller re-submits to the
    // fallback. A backend that panics after it already queued the runnable
    // leaves it queued on both backends: the Scheduled->Running CAS stops the
    // two copies from overlapping, not from running one after the other.
    panic::catch_unwind(AssertUnwindSafe(|| match target {
        ExecutionTarget::Global => region.run_global(runnable, spec),
        ExecutionTarget::World(world) => region.run_world(world, runnable, spec),
        ExecutionTarget::Entity(entity) => region.run_entity(entity, runnable, spec),
        ExecutionTarget::Player(player) => region.run_player(player, runnable, spec),
        ExecutionTarget::PlainAsync => Err(DispatchError::rejected(route, "no affinity primitive for plain async")),
    }))
    .unwrap_or_else(|_| Err(DispatchError::rejected(route, "region backend panicked")))
}
