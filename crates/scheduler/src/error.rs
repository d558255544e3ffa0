use thiserror::Error;

use tickroute_core::{ConfigError, ScheduleError};

/// Errors raised while building or running the scheduling layer itself.
///
/// Dispatch failures never show up here; those are recovered inside the
/// [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("worker pool error: {0}")]
    Pool(String),

    #[error("failed to spawn thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("a process-wide scheduler is already installed")]
    AlreadyInstalled,
}
