use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use tickroute_core::{ExecutionTarget, ScheduleSpec, SchedulerConfig};

use crate::pending::{self, Completer, Pending};
use crate::runner::DelayedRunner;

/// Why a single load attempt produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Not available yet; worth another attempt after the backoff.
    #[error("resource not ready: {0}")]
    NotReady(String),
    /// Will never become available; stop now.
    #[error("resource unrecoverable: {0}")]
    Unrecoverable(String),
}

/// A kind of resource that lives on an affinity context and may not be
/// ready when first asked for (chunks, entities, inventories).
pub trait ResourceSource: Send + Sync + 'static {
    type Key: Clone + fmt::Debug + Send + 'static;
    type Resource: Send + 'static;

    /// The context that owns `key`; attempts run there.
    fn owner(&self, key: &Self::Key) -> ExecutionTarget;

    fn try_load(&self, key: &Self::Key) -> Result<Self::Resource, LoadError>;
}

/// Bookkeeping owned by one retry loop.
///
/// Dropping it before a result was delivered resolves the caller's pending
/// value with `None`, so an abandoned loop still terminates the future.
pub struct RetryState<K, R> {
    pub attempts_so_far: u64,
    pub max_attempts: u64,
    pub key: K,
    completer: Option<Completer<Option<R>>>,
}

impl<K, R> RetryState<K, R> {
    pub fn is_exhausted(&self) -> bool {
        self.attempts_so_far >= self.max_attempts
    }

    fn resolve(&mut self, value: Option<R>) {
        if let Some(completer) = self.completer.take() {
            // The caller may have stopped waiting; nothing to do then.
            let _ = completer.complete(value);
        }
    }
}

impl<K, R> Drop for RetryState<K, R> {
    fn drop(&mut self) {
        self.resolve(None);
    }
}

/// Bounded retry with a fixed backoff, implemented once for every resource kind.
///
/// Each load is a single periodic task (`delay 0`, `period = backoff`,
/// `max_invocations = max_retries`) that owns its [`RetryState`]. Nothing is
/// re-submitted, so the number of attempts can never exceed the bound.
#[derive(Clone)]
pub struct RetryingLoader {
    runner: DelayedRunner,
    backoff_ticks: u64,
    default_max_retries: u64,
}

impl RetryingLoader {
    pub fn new(runner: DelayedRunner, backoff_ticks: u64, default_max_retries: u64) -> Self {
        Self {
            runner,
            backoff_ticks: backoff_ticks.max(1),
            default_max_retries: default_max_retries.max(1),
        }
    }

    pub fn from_config(runner: DelayedRunner, config: &SchedulerConfig) -> Self {
        Self::new(runner, config.retry_backoff_ticks, u64::from(config.default_max_retries))
    }

    pub fn backoff_ticks(&self) -> u64 {
        self.backoff_ticks
    }

    pub fn default_max_retries(&self) -> u64 {
        self.default_max_retries
    }

    pub fn load_with_default_retry<S: ResourceSource>(
        &self,
        source: Arc<S>,
        key: S::Key,
    ) -> Pending<Option<S::Resource>> {
        self.load_with_retry(source, key, self.default_max_retries)
    }

    /// Try to load `key` on its owning context up to `max_retries` times.
    ///
    /// Resolves `Some` on the first success and `None` once attempts are
    /// exhausted, the source reports the resource unrecoverable, or the loop
    /// is abandoned. `max_retries == 0` still makes one attempt.
    pub fn load_with_retry<S: ResourceSource>(
        &self,
        source: Arc<S>,
        key: S::Key,
        max_retries: u64,
    ) -> Pending<Option<S::Resource>> {
        let (completer, pending) = pending::channel();
        let max_attempts = max_retries.max(1);
        let target = source.owner(&key);
        let state = RetryState {
            attempts_so_far: 0,
            max_attempts,
            key,
            completer: Some(completer),
        };
        let spec = ScheduleSpec {
            delay_ticks: 0,
            period_ticks: Some(self.backoff_ticks),
            max_invocations: Some(max_attempts),
        };

        let scheduled = self.runner.run_every_with(target, state, spec, move |state, ctx| {
            state.attempts_so_far += 1;
            match source.try_load(&state.key) {
                Ok(resource) => {
                    debug!(key = ?state.key, attempt = state.attempts_so_far, "resource loaded");
                    state.resolve(Some(resource));
                    ctx.complete();
                }
                Err(LoadError::Unrecoverable(reason)) => {
                    warn!(key = ?state.key, attempt = state.attempts_so_far, %reason, "resource unrecoverable; giving up");
                    state.resolve(None);
                    ctx.complete();
                }
                Err(LoadError::NotReady(reason)) if state.is_exhausted() => {
                    warn!(key = ?state.key, attempts = state.attempts_so_far, %reason, "retries exhausted; resource unavailable");
                    state.resolve(None);
                }
                Err(LoadError::NotReady(reason)) => {
                    debug!(
                        key = ?state.key,
                        attempt = state.attempts_so_far,
                        max_attempts = state.max_attempts,
                        tick = ctx.tick(),
                        %reason,
                        "resource not ready; retrying"
                    );
                }
            }
        });

        if let Err(err) = scheduled {
            // The state was dropped with the closure and resolved `None`.
            warn!(error = %err, "retry loop could not be scheduled");
        }
        pending
    }
}
