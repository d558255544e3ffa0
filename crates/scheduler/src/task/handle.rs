use std::fmt;
use std::sync::Arc;

use super::{Runnable, TaskId, TaskState};
use crate::backend::{BackendKind, NativeTask};

/// Uniform handle to scheduled work, whichever backend accepted it.
///
/// Cloning shares the same underlying task. Cancellation is idempotent and
/// never fails: cancelling completed work is a no-op.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Option<Bound>,
}

#[derive(Clone)]
struct Bound {
    runnable: Runnable,
    native: Arc<dyn NativeTask>,
    backend: BackendKind,
}

impl TaskHandle {
    pub(crate) fn bound(runnable: Runnable, native: Arc<dyn NativeTask>, backend: BackendKind) -> Self {
        Self {
            inner: Some(Bound {
                runnable,
                native,
                backend,
            }),
        }
    }

    /// A handle to work that was never scheduled. Reports as cancelled.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    pub fn cancel(&self) {
        if let Some(bound) = &self.inner {
            // Our state first, so the wrapper refuses to run even if the
            // backend already dequeued it.
            bound.runnable.cancel();
            bound.native.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            Some(bound) => bound.runnable.state() == TaskState::Cancelled,
            None => true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    pub fn state(&self) -> TaskState {
        match &self.inner {
            Some(bound) => bound.runnable.state(),
            None => TaskState::Cancelled,
        }
    }

    /// Which backend accepted the work; `None` for a noop handle.
    pub fn backend(&self) -> Option<BackendKind> {
        self.inner.as_ref().map(|bound| bound.backend)
    }

    pub fn id(&self) -> Option<TaskId> {
        self.inner.as_ref().map(|bound| bound.runnable.id())
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(bound) => f
                .debug_struct("TaskHandle")
                .field("id", &bound.runnable.id())
                .field("state", &bound.runnable.state())
                .field("backend", &bound.backend)
                .finish(),
            None => f.write_str("TaskHandle(noop)"),
        }
    }
}
