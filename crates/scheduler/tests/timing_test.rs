//! Tick arithmetic and ordering under a simulated tick source.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{bump, counter, dispatcher, ManualAsync};
use tickroute_scheduler::{
    BackendCapability, DelayedRunner, ExecutionTarget, RegionScheduler, RegionThreadedScheduler, ScheduleError,
    ScheduleSpec, Tickable, WorldId,
};

fn manual_runner() -> (DelayedRunner, Arc<ManualAsync>) {
    let fallback = ManualAsync::new();
    let d = dispatcher(BackendCapability::GlobalThread, None, fallback.clone());
    (DelayedRunner::new(d), fallback)
}

fn region_runner(workers: usize) -> (DelayedRunner, Arc<RegionThreadedScheduler>) {
    let region = Arc::new(RegionThreadedScheduler::new(workers).unwrap());
    let d = dispatcher(
        BackendCapability::RegionThreaded,
        Some(region.clone() as Arc<dyn RegionScheduler>),
        ManualAsync::new(),
    );
    (DelayedRunner::new(d), region)
}

#[test]
fn period_five_fires_on_exact_multiples() {
    let (runner, fallback) = manual_runner();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let now = Arc::new(AtomicU64::new(0));
    let clock = now.clone();

    runner
        .run_every(ExecutionTarget::Global, 0, 5, move |ctx| {
            sink.lock().unwrap().push((clock.load(Ordering::SeqCst), ctx.tick()));
        })
        .unwrap();

    for tick in 0..16 {
        now.store(tick, Ordering::SeqCst);
        fallback.tick();
    }
    assert_eq!(*fired.lock().unwrap(), vec![(0, 0), (5, 5), (10, 10), (15, 15)]);
}

#[test]
fn delayed_periodic_starts_after_delay() {
    let (runner, fallback) = manual_runner();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    runner
        .run_every(ExecutionTarget::PlainAsync, 3, 4, move |ctx| sink.lock().unwrap().push(ctx.tick()))
        .unwrap();

    fallback.ticks(16);
    assert_eq!(*fired.lock().unwrap(), vec![3, 7, 11, 15]);
}

#[test]
fn zero_delay_is_never_inline() {
    let (runner, fallback) = manual_runner();
    let count = counter();
    runner.run_after(ExecutionTarget::Global, 0, bump(&count));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    fallback.tick();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_period_rejected_before_any_backend_call() {
    let (runner, fallback) = manual_runner();
    let err = runner
        .run_every(ExecutionTarget::Global, 0, 0, |_| {})
        .unwrap_err();
    assert_eq!(err, ScheduleError::InvalidPeriod { period_ticks: 0 });
    assert_eq!(fallback.calls(), 0);
    assert_eq!(runner.dispatcher().metrics().snapshot().submitted, 0);
}

#[test]
fn same_deadline_preserves_submission_order_within_a_world() {
    let (runner, region) = region_runner(4);
    let world = WorldId::new();
    region.load_world(world);

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..20 {
        let order = order.clone();
        runner.run_after(ExecutionTarget::World(world), 3, move || order.lock().unwrap().push(i));
    }
    for _ in 0..4 {
        region.tick();
    }
    assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
}

#[test]
fn limited_schedule_stops_after_max_invocations() {
    let (runner, fallback) = manual_runner();
    let count = counter();
    let seen = count.clone();
    let spec = ScheduleSpec::repeating(0, 2).unwrap().limited(41).unwrap();
    let handle = runner
        .schedule(ExecutionTarget::Global, spec, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    fallback.ticks(200);
    assert_eq!(count.load(Ordering::SeqCst), 41);
    assert!(!handle.is_cancelled());
}

#[test]
fn different_worlds_run_concurrently() {
    let (runner, region) = region_runner(2);
    let (a, b) = (WorldId::new(), WorldId::new());
    region.load_world(a);
    region.load_world(b);

    // Each world's work only finishes once it has heard from the other,
    // which requires both to be running at the same time.
    let (to_b, from_a) = mpsc::channel::<()>();
    let (to_a, from_b) = mpsc::channel::<()>();
    let done = Arc::new(Mutex::new(Vec::new()));

    let done_a = done.clone();
    runner.run_after(ExecutionTarget::World(a), 0, move || {
        let _ = to_b.send(());
        let ok = from_b.recv_timeout(Duration::from_secs(5)).is_ok();
        done_a.lock().unwrap().push(("a", ok));
    });
    let done_b = done.clone();
    runner.run_after(ExecutionTarget::World(b), 0, move || {
        let _ = to_a.send(());
        let ok = from_a.recv_timeout(Duration::from_secs(5)).is_ok();
        done_b.lock().unwrap().push(("b", ok));
    });

    region.tick();
    let done = done.lock().unwrap();
    assert_eq!(done.len(), 2);
    assert!(done.iter().all(|(_, ok)| *ok));
}
