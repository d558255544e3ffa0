use tickroute_scheduler::{pending, ExecutionTarget, Pending, Scheduler, TaskHandle};

/// Run `work` on `target` and hand its return value back through a [`Pending`].
///
/// If the work never runs (dispatch failed, handle cancelled, panic) the
/// pending value resolves to `Err(Abandoned)`.
pub fn call_on<T, F>(scheduler: &Scheduler, target: ExecutionTarget, work: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    call_with_handle(scheduler, target, work).1
}

/// Like [`call_on`], also returning the handle of the submitted task.
pub fn call_with_handle<T, F>(scheduler: &Scheduler, target: ExecutionTarget, work: F) -> (TaskHandle, Pending<T>)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (completer, pending) = pending::channel();
    let handle = scheduler.submit(target, move || {
        // Receiver gone means nobody is waiting any more.
        let _ = completer.complete(work());
    });
    (handle, pending)
}
