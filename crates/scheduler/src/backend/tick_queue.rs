use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tickroute_core::ScheduleSpec;

use crate::task::Runnable;

/// Advances between sweeps of cancelled and completed entries.
pub const PURGE_INTERVAL: u64 = 64;

/// Work that came due, with the tick it was due at.
#[derive(Debug)]
pub struct DueRun {
    pub runnable: Runnable,
    pub tick: u64,
}

struct QueuedRun {
    due: u64,
    seq: u64,
    period: Option<u64>,
    runnable: Runnable,
}

impl PartialEq for QueuedRun {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for QueuedRun {}

impl PartialOrd for QueuedRun {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRun {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest deadline,
        // then the earliest submission.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Logical clock plus a deadline-ordered queue of work.
///
/// Entries with the same deadline come out in submission order. Periodic
/// entries are re-armed at `due + period`, so lateness never accumulates.
pub struct TickQueue {
    current: u64,
    next_seq: u64,
    heap: BinaryHeap<QueuedRun>,
    since_purge: u64,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A queue whose clock starts at `tick`, for contexts created mid-run.
    pub fn starting_at(tick: u64) -> Self {
        Self {
            current: tick,
            next_seq: 0,
            heap: BinaryHeap::new(),
            since_purge: 0,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current
    }

    /// Queue `runnable` per `spec`; returns the first due tick.
    pub fn schedule(&mut self, runnable: Runnable, spec: &ScheduleSpec) -> u64 {
        let due = self.current.saturating_add(spec.delay_ticks);
        self.push(due, spec.period_ticks, runnable);
        due
    }

    fn push(&mut self, due: u64, period: Option<u64>, runnable: Runnable) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedRun {
            due,
            seq,
            period,
            runnable,
        });
    }

    /// Pop everything due at the current tick, then advance the clock.
    ///
    /// Finished work is dropped here. Periodic work is re-queued before it is
    /// returned; if the invocation ends the schedule it is dropped on its
    /// next deadline. Every [`PURGE_INTERVAL`] advances, finished entries with
    /// far deadlines are swept as well.
    pub fn advance(&mut self) -> Vec<DueRun> {
        let mut due_runs = Vec::new();
        let mut rearm = Vec::new();

        while self.heap.peek().is_some_and(|head| head.due <= self.current) {
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if entry.runnable.is_finished() {
                continue;
            }
            if let Some(period) = entry.period {
                rearm.push((entry.due.saturating_add(period), period, entry.runnable.clone()));
            }
            due_runs.push(DueRun {
                runnable: entry.runnable,
                tick: entry.due,
            });
        }

        for (due, period, runnable) in rearm {
            self.push(due, Some(period), runnable);
        }
        self.current += 1;
        self.since_purge += 1;
        if self.since_purge >= PURGE_INTERVAL {
            self.since_purge = 0;
            self.purge_finished();
        }
        due_runs
    }

    /// Drop cancelled and completed entries without waiting for their deadline.
    pub fn purge_finished(&mut self) -> usize {
        let before = self.heap.len();
        self.heap.retain(|entry| !entry.runnable.is_finished());
        before - self.heap.len()
    }

    /// Remove every entry, returning the runnables.
    pub fn drain(&mut self) -> Vec<Runnable> {
        self.heap.drain().map(|entry| entry.runnable).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for TickQueue {
    fn default() -> Self {
        Self::new()
    }
}
