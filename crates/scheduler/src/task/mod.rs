//! Task lifecycle: the runnable wrapper backends execute and the handle
//! callers hold.

mod handle;
mod runnable;
mod state;

pub use handle::TaskHandle;
pub use runnable::{RunOutcome, Runnable, TaskContext, TaskId};
pub use state::TaskState;
