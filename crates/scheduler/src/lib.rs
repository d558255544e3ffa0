//! Affinity-aware task dispatch.
//!
//! Callers name *where* work must run (an [`ExecutionTarget`]) and *when*
//! (a [`ScheduleSpec`]); the [`Dispatcher`] picks the region-threaded
//! primitive for that target when the host has one, and the generic async
//! primitive otherwise or when the region primitive refuses. Every
//! submission yields a [`TaskHandle`] with the same lifecycle, whichever
//! backend accepted it.

pub mod backend;
pub mod capability;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod pending;
pub mod retry;
pub mod runner;
pub mod runtime;
pub mod task;

pub use backend::{
    AsyncScheduler, BackendKind, NativeTask, PooledAsyncScheduler, QueuedTask, RegionScheduler, TickDriver, TickQueue, Tickable,
};
#[cfg(feature = "region-threaded")]
pub use backend::{RegionKey, RegionThreadedScheduler};
pub use capability::{BackendCapability, CapabilityProbe, HostEnvironment, LegacyHost, REGION_SCHEDULER_MARKER};
#[cfg(feature = "region-threaded")]
pub use capability::EmbeddedHost;
pub use dispatcher::Dispatcher;
pub use error::SchedulerError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use pending::{Abandoned, Completer, Pending};
pub use retry::{LoadError, ResourceSource, RetryState, RetryingLoader};
pub use runner::DelayedRunner;
pub use runtime::{global, install, Scheduler, SchedulerBuilder};
pub use task::{RunOutcome, Runnable, TaskContext, TaskHandle, TaskId, TaskState};

pub use tickroute_core::{
    DispatchError, EntityId, ExecutionTarget, PlayerId, ScheduleError, ScheduleSpec, SchedulerConfig, WorldId,
};
