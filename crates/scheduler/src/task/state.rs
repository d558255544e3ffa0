use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of a scheduled unit of work.
///
/// `Scheduled -> Running -> Scheduled -> ...` for periodic work,
/// `Scheduled -> Running -> Completed` for one-shot work, and
/// `Cancelled` reachable from either live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskState {
    Scheduled,
    Running,
    Completed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn encode(self) -> u8 {
        match self {
            Self::Scheduled => 0,
            Self::Running => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    fn decode(raw: u8) -> Self {
        match raw {
            0 => Self::Scheduled,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Cancelled,
        }
    }
}

/// Lock-free cell holding a [`TaskState`].
pub(crate) struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    pub(crate) fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state.encode()))
    }

    pub(crate) fn load(&self) -> TaskState {
        TaskState::decode(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to`; false if the current state was not `from`.
    pub(crate) fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.0
            .compare_exchange(from.encode(), to.encode(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move any live state to `Cancelled`. Returns true only for the call
    /// that performed the transition.
    pub(crate) fn cancel(&self) -> bool {
        loop {
            let current = self.load();
            if current.is_terminal() {
                return false;
            }
            if self.transition(current, TaskState::Cancelled) {
                return true;
            }
        }
    }
}
