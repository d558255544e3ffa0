use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tracing::info;

use tickroute_core::{ExecutionTarget, ScheduleError, ScheduleSpec, SchedulerConfig};

use crate::backend::{AsyncScheduler, PooledAsyncScheduler, TickDriver, Tickable};
#[cfg(feature = "region-threaded")]
use crate::backend::RegionThreadedScheduler;
use crate::capability::{BackendCapability, CapabilityProbe, HostEnvironment, LegacyHost};
#[cfg(feature = "region-threaded")]
use crate::capability::EmbeddedHost;
use crate::dispatcher::Dispatcher;
use crate::error::SchedulerError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::pending::Pending;
use crate::retry::{ResourceSource, RetryingLoader};
use crate::runner::DelayedRunner;
use crate::task::{TaskContext, TaskHandle};

static GLOBAL: OnceLock<Arc<Scheduler>> = OnceLock::new();

/// Make `scheduler` the process-wide instance. Only the first call succeeds.
pub fn install(scheduler: Arc<Scheduler>) -> Result<(), SchedulerError> {
    GLOBAL.set(scheduler).map_err(|_| SchedulerError::AlreadyInstalled)
}

/// The process-wide instance, if one was installed.
pub fn global() -> Option<&'static Arc<Scheduler>> {
    GLOBAL.get()
}

/// The assembled scheduling layer: one capability decision, one dispatcher,
/// and the runner and retry loader built on it.
pub struct Scheduler {
    config: SchedulerConfig,
    dispatcher: Arc<Dispatcher>,
    runner: DelayedRunner,
    loader: RetryingLoader,
    driven: Vec<Arc<dyn Tickable>>,
    pooled: Option<Arc<PooledAsyncScheduler>>,
    #[cfg(feature = "region-threaded")]
    region: Option<Arc<RegionThreadedScheduler>>,
    driver: Mutex<Option<TickDriver>>,
    shut_down: AtomicBool,
}

/// Wires a [`Scheduler`] from a config, a host and optional backends.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    host: Option<Arc<dyn HostEnvironment>>,
    fallback: Option<Arc<dyn AsyncScheduler>>,
    driven: Vec<Arc<dyn Tickable>>,
    #[cfg(feature = "region-threaded")]
    region: Option<Arc<RegionThreadedScheduler>>,
}

impl SchedulerBuilder {
    /// The host consulted by the capability probe. Defaults to [`LegacyHost`].
    pub fn host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }

    /// Use a host-provided async primitive instead of the in-process pool.
    pub fn fallback(mut self, fallback: Arc<dyn AsyncScheduler>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Advance `target` on every scheduler tick.
    pub fn drive(mut self, target: Arc<dyn Tickable>) -> Self {
        self.driven.push(target);
        self
    }

    /// Run on the in-process region backend: it becomes the host and is driven.
    #[cfg(feature = "region-threaded")]
    pub fn with_region(mut self, region: Arc<RegionThreadedScheduler>) -> Self {
        self.host = Some(Arc::new(EmbeddedHost::new(Arc::clone(&region))));
        self.driven.push(Arc::clone(&region) as Arc<dyn Tickable>);
        self.region = Some(region);
        self
    }

    pub fn build(self) -> Result<Arc<Scheduler>, SchedulerError> {
        let config = self.config;
        config.validate()?;

        let host = self
            .host
            .unwrap_or_else(|| Arc::new(LegacyHost) as Arc<dyn HostEnvironment>);
        let detected = CapabilityProbe::new().detect(host.as_ref());
        let capability = if config.force_fallback && detected.is_region_threaded() {
            info!("region-threaded backend present but disabled by force_fallback");
            BackendCapability::GlobalThread
        } else {
            detected
        };
        let region = if capability.is_region_threaded() {
            host.region_scheduler()
        } else {
            None
        };

        let mut driven = self.driven;
        let (fallback, pooled) = match self.fallback {
            Some(fallback) => (fallback, None),
            None => {
                let pool = Arc::new(PooledAsyncScheduler::from_config(&config)?);
                driven.push(Arc::clone(&pool) as Arc<dyn Tickable>);
                (Arc::clone(&pool) as Arc<dyn AsyncScheduler>, Some(pool))
            }
        };

        let metrics = Arc::new(DispatchMetrics::new());
        let dispatcher = Arc::new(Dispatcher::new(capability, region, fallback, metrics));
        let runner = DelayedRunner::new(Arc::clone(&dispatcher));
        let loader = RetryingLoader::from_config(runner.clone(), &config);

        info!(
            ?capability,
            affinity = dispatcher.routes_affinity(),
            driven = driven.len(),
            "scheduler built"
        );

        Ok(Arc::new(Scheduler {
            config,
            dispatcher,
            runner,
            loader,
            driven,
            pooled,
            #[cfg(feature = "region-threaded")]
            region: self.region,
            driver: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }))
    }
}

impl Scheduler {
    pub fn builder(config: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder {
            config,
            host: None,
            fallback: None,
            driven: Vec::new(),
            #[cfg(feature = "region-threaded")]
            region: None,
        }
    }

    /// Fallback pool only, on a host without a region API.
    pub fn legacy(config: SchedulerConfig) -> Result<Arc<Self>, SchedulerError> {
        Self::builder(config).build()
    }

    /// In-process region backend plus fallback pool.
    #[cfg(feature = "region-threaded")]
    pub fn embedded(config: SchedulerConfig) -> Result<Arc<Self>, SchedulerError> {
        let region = Arc::new(RegionThreadedScheduler::from_config(&config)?);
        Self::builder(config).with_region(region).build()
    }

    /// Spawn the tick driver, unless `drive_ticks` is off or it already runs.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if !self.config.drive_ticks {
            info!("drive_ticks disabled; host advances ticks");
            return Ok(());
        }
        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        if driver.is_none() {
            *driver = Some(TickDriver::start(self.driven.clone(), self.config.tick_duration())?);
        }
        Ok(())
    }

    /// Advance every driven backend by one tick on the calling thread.
    pub fn tick(&self) {
        for target in &self.driven {
            target.tick();
        }
    }

    /// Wait for fallback work already handed to the pool to return.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.pooled.as_ref().map_or(true, |pool| pool.wait_idle(timeout))
    }

    /// Stop the driver and cancel queued in-process work. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut driver) = self.driver.lock().unwrap_or_else(PoisonError::into_inner).take() {
            driver.stop();
        }
        let mut cancelled = 0;
        if let Some(pool) = &self.pooled {
            cancelled += pool.shutdown();
        }
        cancelled += self.shutdown_region();
        info!(cancelled, "scheduler shut down");
    }

    #[cfg(feature = "region-threaded")]
    fn shutdown_region(&self) -> usize {
        self.region.as_ref().map_or(0, |region| region.shutdown())
    }

    #[cfg(not(feature = "region-threaded"))]
    fn shutdown_region(&self) -> usize {
        0
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn capability(&self) -> BackendCapability {
        self.dispatcher.capability()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn runner(&self) -> &DelayedRunner {
        &self.runner
    }

    pub fn loader(&self) -> &RetryingLoader {
        &self.loader
    }

    /// The in-process region backend, when running embedded.
    #[cfg(feature = "region-threaded")]
    pub fn region(&self) -> Option<&Arc<RegionThreadedScheduler>> {
        self.region.as_ref()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.dispatcher.metrics().snapshot()
    }

    pub fn submit<F>(&self, target: ExecutionTarget, work: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatcher.submit(target, work)
    }

    pub fn run_after<F>(&self, target: ExecutionTarget, delay_ticks: u64, work: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.runner.run_after(target, delay_ticks, work)
    }

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
        self.runner.run_every(target, delay_ticks, period_ticks, work)
    }

    pub fn run_every_with<S, F>(
        &self,
        target: ExecutionTarget,
        state: S,
        spec: ScheduleSpec,
        work: F,
    ) -> Result<TaskHandle, ScheduleError>
    where
        S: Send + 'static,
        F: FnMut(&mut S, &mut TaskContext) + Send + 'static,
    {
        self.runner.run_every_with(target, state, spec, work)
    }

    pub fn load_with_retry<S: ResourceSource>(
        &self,
        source: Arc<S>,
        key: S::Key,
        max_retries: u64,
    ) -> Pending<Option<S::Resource>> {
        self.loader.load_with_retry(source, key, max_retries)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
