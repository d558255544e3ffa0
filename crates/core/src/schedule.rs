use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// When a unit of work runs, in host ticks.
///
/// A tick is the host's logical time unit. It is never converted to
/// wall-clock time here; backends measure it in their own context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// Ticks to wait before the first invocation. `0` means the next time
    /// the owning context is free, never inline.
    pub delay_ticks: u64,
    /// Ticks between invocations. `None` runs once.
    pub period_ticks: Option<u64>,
    /// Stop (and complete) after this many invocations.
    pub max_invocations: Option<u64>,
}

impl ScheduleSpec {
    /// Run as soon as the owning context is next free.
    pub fn immediate() -> Self {
        Self::once(0)
    }

    /// Run once after `delay_ticks`.
    pub fn once(delay_ticks: u64) -> Self {
        Self {
            delay_ticks,
            period_ticks: None,
            max_invocations: None,
        }
    }

    /// Run every `period_ticks`, first after `delay_ticks`.
    pub fn repeating(delay_ticks: u64, period_ticks: u64) -> Result<Self, ScheduleError> {
        if period_ticks == 0 {
            return Err(ScheduleError::InvalidPeriod { period_ticks });
        }
        Ok(Self {
            delay_ticks,
            period_ticks: Some(period_ticks),
            max_invocations: None,
        })
    }

    /// Cap the number of invocations.
    pub fn limited(mut self, max_invocations: u64) -> Result<Self, ScheduleError> {
        if max_invocations == 0 {
            return Err(ScheduleError::InvalidMaxInvocations);
        }
        self.max_invocations = Some(max_invocations);
        Ok(self)
    }

    pub fn is_periodic(&self) -> bool {
        self.period_ticks.is_some()
    }

    /// Re-check the invariants; specs can be built by hand since fields are public.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if let Some(period_ticks) = self.period_ticks {
            if period_ticks == 0 {
                return Err(ScheduleError::InvalidPeriod { period_ticks });
            }
        }
        if self.max_invocations == Some(0) {
            return Err(ScheduleError::InvalidMaxInvocations);
        }
        Ok(())
    }
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self::immediate()
    }
}
