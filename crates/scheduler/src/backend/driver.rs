use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::Tickable;
use crate::error::SchedulerError;

/// Background thread that advances a set of [`Tickable`]s at a fixed rate.
///
/// Deadlines are computed from the start instant, so a slow tick delays the
/// next one without shifting the whole schedule. After an overrun larger
/// than one tick the schedule is re-based instead of bursting to catch up.
pub struct TickDriver {
    shutdown: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    pub fn start(targets: Vec<Arc<dyn Tickable>>, tick_duration: Duration) -> Result<Self, SchedulerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let stop = Arc::clone(&shutdown);
        let counter = Arc::clone(&ticks);
        let handle = thread::Builder::new()
            .name("tickroute-driver".to_string())
            .spawn(move || drive(targets, tick_duration, stop, counter))?;

        info!(tick_ms = tick_duration.as_millis() as u64, "tick driver started");
        Ok(Self {
            shutdown,
            ticks,
            handle: Some(handle),
        })
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.shutdown.load(Ordering::Acquire)
    }

    /// Signal the thread and wait for the current tick to finish.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("tick driver thread panicked");
            }
            info!(ticks = self.ticks(), "tick driver stopped");
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drive(targets: Vec<Arc<dyn Tickable>>, period: Duration, shutdown: Arc<AtomicBool>, ticks: Arc<AtomicU64>) {
    let mut next = Instant::now();
    while !shutdown.load(Ordering::Acquire) {
        for target in &targets {
            target.tick();
        }
        ticks.fetch_add(1, Ordering::AcqRel);

        next += period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else if now - next > period {
            debug!(behind_ms = (now - next).as_millis() as u64, "tick overrun; re-basing");
            next = now;
        }
    }
}
