use thiserror::Error;

/// Caller errors detected while building a [`ScheduleSpec`](crate::ScheduleSpec).
///
/// These are rejected at the boundary, before any backend is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid schedule: period must be at least one tick (got {period_ticks})")]
    InvalidPeriod { period_ticks: u64 },

    #[error("invalid schedule: max invocations must be at least one")]
    InvalidMaxInvocations,
}

/// Failures reported by a scheduling backend when asked to accept work.
///
/// The dispatcher never surfaces these to its callers; they drive the
/// fallback decision and are logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The affinity primitive refused the call (stale entity, unloaded world, ...).
    /// Recoverable by re-submitting through the fallback primitive.
    #[error("{route} dispatch rejected: {reason}")]
    Rejected { route: &'static str, reason: String },

    /// The submission itself is malformed and would fail on any backend.
    #[error("invalid target: {reason}")]
    InvalidTarget { reason: String },

    /// The backend is shut down or otherwise not accepting work.
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: &'static str, reason: String },
}

impl DispatchError {
    pub fn rejected(route: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            route,
            reason: reason.into(),
        }
    }

    pub fn unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Whether re-submitting the same work elsewhere can succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidTarget { .. })
    }
}

/// Errors raised while loading [`SchedulerConfig`](crate::SchedulerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
